// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_std]
#![warn(
    missing_docs,
    clippy::empty_line_after_doc_comments,
    clippy::missing_safety_doc
)]
#![deny(unsafe_op_in_unsafe_fn)]

//! This crate contains a bounded-capacity arena allocator and a
//! singly-linked list container backed by it. See the [`Arena`] type for
//! the allocation model.
//!
#![doc = include_str!("../Readme.md")]
//!
//! [`Arena`]: ./struct.Arena.html

extern crate alloc;

#[cfg(test)]
extern crate std;

use crate::regions::Regions;
use allocator_api2::alloc::{
    AllocError, Allocator, Global, Layout, LayoutError, handle_alloc_error,
};
use core::{
    cell::RefCell,
    error::Error as ErrorTrait,
    ffi::c_void,
    fmt,
    marker::PhantomData,
    ptr::{self, NonNull},
};

pub mod forward_list;

mod regions;

/// Alignment of the backing buffer. Matches `max_align_t` on the usual
/// 64-bit targets, so the first tail carve for any fundamental type needs
/// no padding.
const BUFFER_ALIGN: usize = 16;

/// A fixed-capacity arena allocator, parameterised by the allocator that
/// supplies its backing buffer.
///
/// The arena reserves one contiguous buffer of `capacity` bytes at
/// construction and never grows it. Allocation requests are served in two
/// steps: released regions of a sufficient size class are reused first
/// (smallest sufficient class, most recently freed offset within it), and
/// only when no pooled region fits is a fresh region carved from the
/// untouched tail of the buffer. When both fail, the request errors with
/// [`Error::OutOfMemory`].
///
/// All bookkeeping is unsynchronized; the arena is `!Sync` and meant for
/// single-threaded use. Multiple containers on the same thread may share
/// one arena.
///
/// See the [module documentation](index.html) for more info.
pub struct Arena<A: Allocator = Global> {
    buf: NonNull<u8>,
    capacity: usize,
    regions: RefCell<Regions>,
    alloc: A,
    _boo: PhantomData<*mut c_void>,
}

impl Arena {
    /// Creates a new `Arena` with a backing buffer of `capacity` bytes
    /// allocated from the global allocator.
    ///
    /// # Panics
    ///
    /// Panics (via [`handle_alloc_error`]) if the global allocator cannot
    /// supply the buffer, or if `capacity` exceeds `isize::MAX`.
    ///
    /// # Example
    ///
    /// ```
    /// use quarry::Arena;
    ///
    /// let arena = Arena::with_capacity(1024);
    /// assert_eq!(arena.capacity(), 1024);
    /// ```
    #[must_use]
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Creates a new `Arena` with a backing buffer of `capacity` bytes,
    /// reporting failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocErr`] if the global allocator cannot supply
    /// the buffer, or [`Error::LayoutErr`] if `capacity` is not a
    /// representable allocation size.
    #[inline]
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::try_with_capacity_in(capacity, Global)
    }
}

impl<A: Allocator> Arena<A> {
    /// Creates a new `Arena` with a backing buffer of `capacity` bytes
    /// allocated from the provided `allocator`.
    ///
    /// # Panics
    ///
    /// Panics (via [`handle_alloc_error`]) if `allocator` cannot supply
    /// the buffer, or if `capacity` exceeds `isize::MAX`.
    #[must_use]
    pub fn with_capacity_in(capacity: usize, allocator: A) -> Self {
        Self::try_with_capacity_in(capacity, allocator).unwrap_or_else(|err| match err {
            Error::LayoutErr(_) => {
                panic!("arena capacity {capacity} is not a valid allocation size")
            }
            _ => {
                // Capacity made a valid layout, so the allocator refused it.
                let layout = unsafe { Layout::from_size_align_unchecked(capacity, BUFFER_ALIGN) };
                handle_alloc_error(layout)
            }
        })
    }

    /// Creates a new `Arena` with a backing buffer of `capacity` bytes
    /// allocated from the provided `allocator`, reporting failure instead
    /// of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocErr`] if `allocator` cannot supply the
    /// buffer, or [`Error::LayoutErr`] if `capacity` is not a
    /// representable allocation size.
    ///
    /// # Example
    ///
    /// ```
    /// use allocator_api2::alloc::Global;
    /// use quarry::Arena;
    ///
    /// let arena = Arena::try_with_capacity_in(4096, Global).unwrap();
    /// assert_eq!(arena.tail_remaining(), 4096);
    /// ```
    pub fn try_with_capacity_in(capacity: usize, allocator: A) -> Result<Self, Error> {
        let layout = Layout::from_size_align(capacity, BUFFER_ALIGN)?;
        let buf = allocator.allocate(layout)?.cast::<u8>();

        Ok(Self {
            buf,
            capacity,
            regions: RefCell::new(Regions::new()),
            alloc: allocator,
            _boo: PhantomData,
        })
    }

    /// Returns the total capacity of the backing buffer in bytes.
    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes ever carved from the untouched tail of
    /// the buffer.
    ///
    /// This only grows when a request cannot be served from the free
    /// pool, which makes it the right probe for checking that a workload
    /// is reusing released regions.
    ///
    /// # Example
    ///
    /// ```
    /// use allocator_api2::alloc::Layout;
    /// use quarry::Arena;
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let layout = Layout::from_size_align(64, 8).unwrap();
    ///
    /// let ptr = arena.alloc_raw(layout);
    /// assert_eq!(arena.tail_used(), 64);
    ///
    /// unsafe { arena.release_raw(ptr, layout) };
    /// let again = arena.alloc_raw(layout);
    ///
    /// // The released region was reused; the tail did not move.
    /// assert_eq!(again, ptr);
    /// assert_eq!(arena.tail_used(), 64);
    /// ```
    #[must_use]
    #[inline]
    pub fn tail_used(&self) -> usize {
        self.regions.borrow().tail_used()
    }

    /// Returns the number of never-touched bytes remaining at the tail of
    /// the buffer.
    #[must_use]
    #[inline]
    pub fn tail_remaining(&self) -> usize {
        self.capacity - self.tail_used()
    }

    /// Returns the number of currently outstanding allocations.
    #[must_use]
    #[inline]
    pub fn live_regions(&self) -> usize {
        self.regions.borrow().live_len()
    }

    /// Returns the number of released regions waiting in the free pool.
    #[must_use]
    #[inline]
    pub fn pooled_regions(&self) -> usize {
        self.regions.borrow().pooled_len()
    }

    /// Returns a reference to the underlying [`Allocator`] that supplied
    /// the backing buffer.
    #[must_use]
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns a new allocation matching `layout`.
    ///
    /// # Panics
    ///
    /// This method panics if neither the free pool nor the remaining tail
    /// space can satisfy the request. Use [`Arena::try_alloc_raw()`] to
    /// handle exhaustion instead.
    ///
    /// [`Arena::try_alloc_raw()`]: ./struct.Arena.html#method.try_alloc_raw
    #[track_caller]
    #[must_use]
    pub fn alloc_raw(&self, layout: Layout) -> NonNull<c_void> {
        #[cold]
        #[track_caller]
        #[inline(never)]
        fn exhausted(layout: &Layout) -> ! {
            panic!(
                "arena exhausted: cannot allocate {} bytes with alignment {}",
                layout.size(),
                layout.align()
            );
        }

        match self.try_alloc_raw(layout) {
            Ok(ptr) => ptr,
            Err(_) => exhausted(&layout),
        }
    }

    /// Returns a new allocation matching `layout`, reporting exhaustion
    /// instead of panicking.
    ///
    /// Released regions of a sufficient size class are considered first:
    /// the smallest class that can hold `layout.size()` wins, and within
    /// that class the most recently released region whose address
    /// satisfies `layout.align()`. A reused region keeps its original
    /// byte extent but is re-registered under the requested size. Only
    /// when nothing in the pool fits is a fresh, aligned region carved
    /// from the tail of the buffer.
    ///
    /// Zero-sized requests return an aligned dangling pointer and do not
    /// touch the arena's bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] when neither reuse nor the tail can
    /// satisfy the request. The arena is left unchanged; the failure is
    /// not retriable without releasing regions first.
    ///
    /// # Example
    ///
    /// ```
    /// use allocator_api2::alloc::Layout;
    /// use quarry::{Arena, Error};
    ///
    /// let arena = Arena::with_capacity(100);
    ///
    /// let layout = Layout::from_size_align(200, 1).unwrap();
    /// assert!(matches!(arena.try_alloc_raw(layout), Err(Error::OutOfMemory(_))));
    /// ```
    pub fn try_alloc_raw(&self, layout: Layout) -> Result<NonNull<c_void>, Error> {
        let (size, align) = (layout.size(), layout.align());
        if size == 0 {
            let dangling = ptr::without_provenance_mut::<c_void>(align);
            // align is non-zero, so the pointer is too.
            return Ok(unsafe { NonNull::new_unchecked(dangling) });
        }

        let base = self.buf.as_ptr() as usize;
        let mut regions = self.regions.borrow_mut();
        let offset = regions
            .take_pooled(size, align, base)
            .or_else(|| regions.carve_tail(size, align, base, self.capacity))
            .ok_or(Error::OutOfMemory(layout))?;

        Ok(unsafe { self.buf.add(offset).cast() })
    }

    /// Returns a previously allocated region to the arena's free pool.
    ///
    /// The region becomes available to later requests of its registered
    /// size or smaller. Pointers the arena does not recognise (addresses
    /// outside the buffer, regions already released, or zero-sized
    /// allocations) are ignored silently; releasing is idempotent.
    /// `layout` is accepted for symmetry with [`Arena::alloc_raw()`] and
    /// the [`Allocator`] contract, but the arena pools the region under
    /// the size it was registered with at allocation time.
    ///
    /// # Safety
    ///
    /// If `ptr` denotes a live region of this arena, it must not be read
    /// or written through after this call: the region may be handed out
    /// again by a later allocation.
    ///
    /// [`Arena::alloc_raw()`]: ./struct.Arena.html#method.alloc_raw
    pub unsafe fn release_raw(&self, ptr: NonNull<c_void>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        let addr = ptr.as_ptr() as usize;
        let base = self.buf.as_ptr() as usize;
        if addr < base || addr >= base + self.capacity {
            return;
        }

        self.regions.borrow_mut().release(addr - base);
    }
}

impl<A: Allocator> fmt::Debug for Arena<A> {
    #[inline]
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.regions
            .borrow()
            .write_debug("Arena", self.capacity, fmtr)
    }
}

/// Arenas are equal only to themselves: two separately constructed arenas
/// never compare equal, regardless of capacity or contents.
impl<A: Allocator> PartialEq for Arena<A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl<A: Allocator> Eq for Arena<A> {}

// SAFETY: the arena owns its buffer and bookkeeping outright; moving the
// whole arena to another thread is fine as long as `A` is Send. The
// `PhantomData<*mut c_void>` marker keeps it `!Sync`.
unsafe impl<A: Allocator + Send> Send for Arena<A> {}

unsafe impl<A: Allocator> Allocator for &'_ Arena<A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        match self.try_alloc_raw(layout) {
            Ok(ptr) => Ok(NonNull::slice_from_raw_parts(
                ptr.cast::<u8>(),
                layout.size(),
            )),
            Err(_) => Err(AllocError),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.release_raw(ptr.cast(), layout) };
    }
}

impl<A: Allocator> Drop for Arena<A> {
    #[inline]
    fn drop(&mut self) {
        // Same size/align pair that was validated at construction.
        let layout = unsafe { Layout::from_size_align_unchecked(self.capacity, BUFFER_ALIGN) };
        unsafe {
            self.alloc.deallocate(self.buf, layout);
        }
    }
}

/// Represents error types which may be returned while using an `Arena`.
#[derive(Debug)]
pub enum Error {
    /// A `Layout` could not be constructed for a requested capacity.
    LayoutErr(LayoutError),
    /// The underlying allocator could not supply the backing buffer.
    AllocErr(AllocError),
    /// The allocation request with the given `Layout` could not be
    /// satisfied by either the free pool or the remaining tail space.
    OutOfMemory(Layout),
}

impl From<LayoutError> for Error {
    #[inline]
    fn from(value: LayoutError) -> Self {
        Self::LayoutErr(value)
    }
}

impl From<AllocError> for Error {
    #[inline]
    fn from(value: AllocError) -> Self {
        Self::AllocErr(value)
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LayoutErr(ref e) => fmt::Display::fmt(e, fmtr),
            Self::AllocErr(ref e) => fmt::Display::fmt(e, fmtr),
            Self::OutOfMemory(layout) => write!(
                fmtr,
                "arena exhausted: cannot allocate {} bytes with alignment {}",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl ErrorTrait for Error {}

pub(crate) type InvariantLifetime<'a, T> = PhantomData<fn(&'a T) -> &'a T>;
