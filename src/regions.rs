use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

/// Offset bookkeeping for one arena buffer.
///
/// Everything here is a byte offset relative to the buffer base; the
/// `Arena` owns the base pointer and does the address arithmetic. `live`
/// maps a region's start offset to the size it was registered under, one
/// entry per outstanding allocation. `free` groups released offsets by
/// that registered size, each bucket a LIFO stack.
pub(super) struct Regions {
    cursor: usize,
    live: BTreeMap<usize, usize>,
    free: BTreeMap<usize, Vec<usize>>,
}

impl Regions {
    #[must_use]
    pub(super) const fn new() -> Self {
        Self {
            cursor: 0,
            live: BTreeMap::new(),
            free: BTreeMap::new(),
        }
    }

    /// Takes a pooled region of class `size` or larger, best-fit first.
    ///
    /// Buckets are scanned smallest-sufficient-class upwards; inside a
    /// bucket the most recently freed offset whose absolute address
    /// satisfies `align` wins. The region is re-registered live under the
    /// *requested* `size`, not the bucket's class; reuse never splits or
    /// resizes the underlying byte extent.
    pub(super) fn take_pooled(&mut self, size: usize, align: usize, base: usize) -> Option<usize> {
        let (class, idx) = self.free.range(size..).find_map(|(&class, offsets)| {
            offsets
                .iter()
                .rposition(|&off| (base + off) % align == 0)
                .map(|idx| (class, idx))
        })?;

        let offsets = self.free.get_mut(&class)?;
        let offset = offsets.remove(idx);
        if offsets.is_empty() {
            self.free.remove(&class);
        }

        self.live.insert(offset, size);
        Some(offset)
    }

    /// Carves a fresh region from the untouched tail, or `None` if the
    /// aligned region would run past `capacity`.
    pub(super) fn carve_tail(
        &mut self,
        size: usize,
        align: usize,
        base: usize,
        capacity: usize,
    ) -> Option<usize> {
        let aligned = align_up(base.checked_add(self.cursor)?, align)?.checked_sub(base)?;
        let end = aligned.checked_add(size)?;
        if end > capacity {
            return None;
        }

        self.live.insert(aligned, size);
        self.cursor = end;
        Some(aligned)
    }

    /// Moves a live region into the free pool.
    ///
    /// Unknown offsets (never allocated, or already released) are ignored.
    pub(super) fn release(&mut self, offset: usize) {
        let Some(size) = self.live.remove(&offset) else {
            return;
        };
        self.free.entry(size).or_default().push(offset);
    }

    #[must_use]
    #[inline]
    pub(super) const fn tail_used(&self) -> usize {
        self.cursor
    }

    #[must_use]
    #[inline]
    pub(super) fn live_len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    #[inline]
    pub(super) fn pooled_len(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub(super) fn write_debug(
        &self,
        struct_name: &str,
        capacity: usize,
        fmtr: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmtr.debug_struct(struct_name)
            .field("capacity", &capacity)
            .field("tail_used", &self.cursor)
            .field("live_regions", &self.live.len())
            .field("pooled_regions", &self.pooled_len())
            .finish()
    }
}

pub(super) fn align_up(addr: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    let mask = align - 1;
    addr.checked_add(mask).map(|v| v & !mask)
}
