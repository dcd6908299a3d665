//! A singly-linked list of nodes allocated from an [`Arena`].
//!
//! [`ForwardList`] supports pushing and popping at the front of the list
//! in constant time, and a forward-only traversal over its elements. Every
//! node occupies one arena region of exactly `size_of::<Node<T>>()` bytes,
//! so popped node cells are reused verbatim by later pushes.
//!
//! [`Arena`]: ../struct.Arena.html

use crate::{Arena, Error, InvariantLifetime};
use allocator_api2::alloc::{Allocator, Global, Layout};
use core::{
    fmt,
    iter::FusedIterator,
    marker::PhantomData,
    ptr::{self, NonNull},
};

/// A singly-linked list type, backed by an [`Arena`].
///
/// The list holds a borrow of its arena for its whole lifetime, so it can
/// never outlive the memory its nodes live in. Elements are ordered
/// most-recently-pushed first.
///
/// See the [module documentation] for more info.
///
/// [`Arena`]: ../struct.Arena.html
/// [module documentation]: ./index.html
pub struct ForwardList<'a, T: 'a, A: Allocator = Global> {
    head: Option<NonNull<Node<T>>>,
    len: usize,
    arena: &'a Arena<A>,
    _boo: PhantomData<(T, InvariantLifetime<'a, Arena<A>>)>,
}

struct Node<T> {
    next: Option<NonNull<Node<T>>>,
    data: T,
}

impl<'a, T: 'a, A: Allocator> ForwardList<'a, T, A> {
    /// Create an empty `ForwardList` backed by the given `Arena`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::{Arena, forward_list::ForwardList};
    /// let arena = Arena::with_capacity(1024);
    ///
    /// let list = ForwardList::<i32>::new(&arena);
    /// assert!(list.is_empty());
    /// ```
    #[must_use]
    #[inline]
    pub const fn new(arena: &'a Arena<A>) -> Self {
        Self {
            head: None,
            len: 0,
            arena,
            _boo: PhantomData,
        }
    }

    /// Create a `ForwardList` holding the elements of `iter`.
    ///
    /// Each element is pushed to the front, so iteration over the list
    /// yields them in reverse of the order `iter` produced them.
    #[must_use]
    #[inline]
    pub fn from_iter_in<I: IntoIterator<Item = T>>(arena: &'a Arena<A>, iter: I) -> Self {
        let mut list = Self::new(arena);
        list.extend(iter);
        list
    }

    /// Returns the number of elements in the `ForwardList`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::{Arena, forward_list::ForwardList};
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let mut list = ForwardList::new(&arena);
    ///
    /// list.push_front(24);
    ///
    /// assert_eq!(list.len(), 1);
    /// ```
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no elements in the `ForwardList`.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a reference to the underlying `Arena` the nodes are
    /// allocated from.
    #[must_use]
    #[inline]
    pub fn arena(&self) -> &Arena<A> {
        self.arena
    }

    /// Pushes the given `value` to the front of the `ForwardList`.
    ///
    /// # Panics
    ///
    /// Panics if the arena cannot supply a node cell. Use
    /// [`ForwardList::try_push_front()`] to handle exhaustion instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::{Arena, forward_list::ForwardList};
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let mut list = ForwardList::new(&arena);
    ///
    /// list.push_front(10);
    /// list.push_front(20);
    ///
    /// assert_eq!(list.front(), Some(&20));
    /// ```
    ///
    /// [`ForwardList::try_push_front()`]: ./struct.ForwardList.html#method.try_push_front
    #[track_caller]
    #[inline]
    pub fn push_front(&mut self, value: T) {
        let node = self.arena.alloc_raw(Self::NODE_LAYOUT).cast::<Node<T>>();
        unsafe { self.link_front(node, value) };
    }

    /// Pushes the given `value` to the front of the `ForwardList`,
    /// reporting arena exhaustion instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the arena can satisfy the node
    /// allocation neither from its free pool nor from its tail. The list
    /// is unchanged and `value` is dropped.
    pub fn try_push_front(&mut self, value: T) -> Result<(), Error> {
        let node = self.arena.try_alloc_raw(Self::NODE_LAYOUT)?.cast::<Node<T>>();
        unsafe { self.link_front(node, value) };
        Ok(())
    }

    /// Removes the first element in the `ForwardList` and returns it.
    ///
    /// The removed node's cell is returned to the arena's free pool. If
    /// the list is empty, this method returns `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::{Arena, forward_list::ForwardList};
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let mut list = ForwardList::new(&arena);
    ///
    /// list.push_front(2);
    /// list.push_front(3);
    ///
    /// assert_eq!(list.pop_front(), Some(3));
    /// assert_eq!(list.pop_front(), Some(2));
    /// assert_eq!(list.pop_front(), None);
    /// ```
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        let node = self.head?;

        unsafe {
            self.head = node.as_ref().next;
            let value = ptr::read(&raw const node.as_ref().data);
            self.arena.release_raw(node.cast(), Self::NODE_LAYOUT);
            self.len -= 1;
            Some(value)
        }
    }

    /// Removes every element, releasing all node cells back to the arena.
    ///
    /// Calling this on an empty list is a no-op.
    #[inline]
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    /// Returns a reference to the first element, or `None` if the list is
    /// empty.
    #[must_use]
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.head.map(|node| unsafe { &node.as_ref().data })
    }

    /// Returns a mutable reference to the first element, or `None` if the
    /// list is empty.
    ///
    /// The element is modified in place; no node is reallocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::{Arena, forward_list::ForwardList};
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let mut list = ForwardList::new(&arena);
    /// list.push_front(25);
    ///
    /// if let Some(front) = list.front_mut() {
    ///     *front = 31;
    /// }
    ///
    /// assert_eq!(list.front(), Some(&31));
    /// ```
    #[must_use]
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.head.map(|mut node| unsafe { &mut node.as_mut().data })
    }

    /// Returns a forward-only iterator over the elements, front to back.
    ///
    /// The iterator is single-pass; to traverse again, call `iter()` on
    /// the list a second time.
    ///
    /// The references it yields borrow the list, so the list cannot be
    /// mutated while any of them is live. Popping a node returns its
    /// cell to the arena for immediate reuse, which is why this does not
    /// compile:
    ///
    /// ```compile_fail
    /// use quarry::{Arena, forward_list::ForwardList};
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let mut list = ForwardList::from_iter_in(&arena, [1, 2, 3]);
    ///
    /// let first = list.iter().next();
    /// list.pop_front();
    /// assert!(first.is_some());
    /// ```
    #[must_use]
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head,
            len: self.len,
            _boo: PhantomData,
        }
    }

    /// Returns a forward-only iterator yielding mutable references to the
    /// elements, front to back.
    #[must_use]
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            next: self.head,
            len: self.len,
            _boo: PhantomData,
        }
    }

    const NODE_LAYOUT: Layout = Layout::new::<Node<T>>();

    /// Writes `value` into the freshly allocated `node` and makes it the
    /// new head.
    ///
    /// # Safety
    ///
    /// `node` must point to an uninitialised cell of `NODE_LAYOUT` owned
    /// by this list's arena.
    unsafe fn link_front(&mut self, mut node: NonNull<Node<T>>, value: T) {
        unsafe {
            ptr::write(&raw mut node.as_mut().next, self.head);
            ptr::write(&raw mut node.as_mut().data, value);
        }

        self.head = Some(node);
        self.len = match self.len.checked_add(1) {
            Some(len) => len,
            None => panic!("list overflow"),
        };
    }
}

impl<'a, T: 'a, A: Allocator> Drop for ForwardList<'a, T, A> {
    #[inline]
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'a, T: fmt::Debug, A: Allocator> fmt::Debug for ForwardList<'a, T, A> {
    #[inline]
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmtr.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, A: Allocator> From<&'a Arena<A>> for ForwardList<'a, T, A> {
    #[inline]
    fn from(arena: &'a Arena<A>) -> Self {
        Self::new(arena)
    }
}

impl<'a, T: PartialEq, A: Allocator> PartialEq for ForwardList<'a, T, A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }

        self.iter()
            .zip(other.iter())
            .all(|(lhs, rhs)| PartialEq::eq(lhs, rhs))
    }
}

impl<'a, T: Eq, A: Allocator> Eq for ForwardList<'a, T, A> {}

impl<'a, T: PartialEq, A: Allocator> PartialEq<[T]> for ForwardList<'a, T, A> {
    #[inline]
    fn eq(&self, other: &[T]) -> bool {
        if self.len != other.len() {
            return false;
        }

        self.iter()
            .zip(other.iter())
            .all(|(lhs, rhs)| PartialEq::eq(lhs, rhs))
    }
}

impl<'a, 's, T: PartialEq, A: Allocator> PartialEq<&'s [T]> for ForwardList<'a, T, A> {
    #[inline]
    fn eq(&self, other: &&'s [T]) -> bool {
        PartialEq::eq(self, &other[..])
    }
}

impl<'a, T: PartialEq, A: Allocator, const N: usize> PartialEq<[T; N]> for ForwardList<'a, T, A> {
    #[inline]
    fn eq(&self, other: &[T; N]) -> bool {
        PartialEq::eq(self, &other[..])
    }
}

impl<'a, 's, T: PartialEq, A: Allocator, const N: usize> PartialEq<&'s [T; N]>
    for ForwardList<'a, T, A>
{
    #[inline]
    fn eq(&self, other: &&'s [T; N]) -> bool {
        PartialEq::eq(self, &other[..])
    }
}

impl<'s, 'a, T, A: Allocator> IntoIterator for &'s ForwardList<'a, T, A> {
    type IntoIter = Iter<'s, T>;
    type Item = &'s T;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'s, 'a, T, A: Allocator> IntoIterator for &'s mut ForwardList<'a, T, A> {
    type IntoIter = IterMut<'s, T>;
    type Item = &'s mut T;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<'a, T: 'a, A: Allocator> IntoIterator for ForwardList<'a, T, A> {
    type IntoIter = IntoIter<'a, T, A>;
    type Item = T;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter { list: self }
    }
}

impl<'a, T, A: Allocator> Extend<T> for ForwardList<'a, T, A> {
    /// Pushes each element of `iter` to the front, so the last element
    /// produced ends up at the head of the list.
    #[track_caller]
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_front(item);
        }
    }
}

/// A borrowed forward iterator over the elements of a [`ForwardList`].
///
/// See the [`ForwardList::iter()`] method for more information.
///
/// [`ForwardList`]: ./struct.ForwardList.html
/// [`ForwardList::iter()`]: ./struct.ForwardList.html#method.iter
pub struct Iter<'s, T> {
    next: Option<NonNull<Node<T>>>,
    len: usize,
    _boo: PhantomData<&'s Node<T>>,
}

impl<'s, T> Iterator for Iter<'s, T> {
    type Item = &'s T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        unsafe {
            let node = &*node.as_ptr();
            self.next = node.next;
            self.len -= 1;
            Some(&node.data)
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'s, T> ExactSizeIterator for Iter<'s, T> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }
}

impl<'s, T> FusedIterator for Iter<'s, T> {}

impl<'s, T> Clone for Iter<'s, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            next: self.next,
            len: self.len,
            _boo: PhantomData,
        }
    }
}

impl<'s, T: fmt::Debug> fmt::Debug for Iter<'s, T> {
    #[inline]
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmtr.debug_list().entries(self.clone()).finish()
    }
}

/// A borrowed forward iterator yielding mutable references into a
/// [`ForwardList`].
///
/// See the [`ForwardList::iter_mut()`] method for more information.
///
/// [`ForwardList`]: ./struct.ForwardList.html
/// [`ForwardList::iter_mut()`]: ./struct.ForwardList.html#method.iter_mut
pub struct IterMut<'s, T> {
    next: Option<NonNull<Node<T>>>,
    len: usize,
    _boo: PhantomData<&'s mut Node<T>>,
}

impl<'s, T> Iterator for IterMut<'s, T> {
    type Item = &'s mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let mut node = self.next?;
        unsafe {
            self.next = node.as_ref().next;
            self.len -= 1;
            Some(&mut node.as_mut().data)
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'s, T> ExactSizeIterator for IterMut<'s, T> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }
}

impl<'s, T> FusedIterator for IterMut<'s, T> {}

impl<'s, T: fmt::Debug> fmt::Debug for IterMut<'s, T> {
    #[inline]
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = Iter {
            next: self.next,
            len: self.len,
            _boo: PhantomData,
        };
        fmtr.debug_list().entries(view).finish()
    }
}

/// An owning iterator over the elements of a [`ForwardList`].
///
/// Each call to `next()` pops the front of the list, releasing the node
/// cell back to the arena as it goes.
///
/// [`ForwardList`]: ./struct.ForwardList.html
pub struct IntoIter<'a, T: 'a, A: Allocator> {
    list: ForwardList<'a, T, A>,
}

impl<'a, T: 'a, A: Allocator> IntoIter<'a, T, A> {
    /// Returns the remaining elements as a `ForwardList`.
    #[must_use]
    #[inline]
    pub fn into_list(self) -> ForwardList<'a, T, A> {
        self.list
    }
}

impl<'a, T: 'a, A: Allocator> Iterator for IntoIter<'a, T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.list.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.list.len();
        (len, Some(len))
    }
}

impl<'a, T: 'a, A: Allocator> ExactSizeIterator for IntoIter<'a, T, A> {
    #[inline]
    fn len(&self) -> usize {
        self.list.len()
    }
}

impl<'a, T: 'a, A: Allocator> FusedIterator for IntoIter<'a, T, A> {}

impl<'a, T: 'a + fmt::Debug, A: Allocator> fmt::Debug for IntoIter<'a, T, A> {
    #[inline]
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.list, fmtr)
    }
}
