//! Overflow-safe allocation for gam-native.
//!
//! Every allocation in the crate is sized through the safety kernel before
//! memory is requested. The `safe_alloc*` family follows a sentinel
//! convention: `None` means the size computation overflowed or the allocator
//! refused, and callers turn that into [`GamError::OutOfMemory`] themselves.
//! Buffers are aligned to [`ALIGNED_SIZE`] bytes so the codec's word arrays
//! and gradient vectors can be consumed by vectorized loops.
//!
//! [`GamError::OutOfMemory`]: crate::core::error::GamError::OutOfMemory

use crate::core::constants::*;
use crate::core::error::{MemoryError, Result};
use crate::core::safety::{add_overflows, multiply_overflows};
use std::alloc::{alloc, alloc_zeroed, dealloc, Layout};
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

mod sealed {
    pub trait Sealed {}
}

/// Types for which the all-zero bit pattern is a valid value.
///
/// Only these may be handed out from zero-initialized memory without an
/// explicit write.
pub trait ZeroBits: Copy + sealed::Sealed {}

macro_rules! impl_zero_bits {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            impl ZeroBits for $t {}
        )*
    };
}

impl_zero_bits!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

/// Byte count for `count` items of `bytes_per_item`, or `None` on overflow.
///
/// Single-byte items skip the multiply entirely.
#[inline]
fn byte_count(count: usize, bytes_per_item: usize) -> Option<usize> {
    if 1 == bytes_per_item {
        Some(count)
    } else if multiply_overflows(count, bytes_per_item) {
        None
    } else {
        Some(count * bytes_per_item)
    }
}

/// Aligned allocation of `capacity` slots.
///
/// Uninitialized buffers report a length of zero and are written through
/// [`AlignedBuffer::as_mut_ptr`]; zeroed buffers are full on return.
#[repr(align(32))]
pub struct AlignedBuffer<T> {
    /// Pointer to aligned memory
    ptr: NonNull<T>,
    /// Number of elements currently stored
    len: usize,
    /// Allocated capacity in elements
    capacity: usize,
    /// Memory layout for deallocation
    layout: Layout,
    /// Type marker
    _marker: PhantomData<T>,
}

impl<T> AlignedBuffer<T> {
    fn allocate(capacity: usize, zeroed: bool) -> Option<Self> {
        let bytes = byte_count(capacity, size_of::<T>())?;
        if 0 == bytes {
            return Some(Self::empty());
        }
        if align_of::<T>() > ALIGNED_SIZE {
            return None;
        }

        let layout = Layout::from_size_align(bytes, ALIGNED_SIZE).ok()?;
        // SAFETY: layout has a non-zero size.
        let raw = unsafe {
            if zeroed {
                alloc_zeroed(layout)
            } else {
                alloc(layout)
            }
        };
        let ptr = NonNull::new(raw as *mut T)?;

        Some(AlignedBuffer {
            ptr,
            len: 0,
            capacity,
            layout,
            _marker: PhantomData,
        })
    }

    /// Allocate room for `capacity` elements without initializing them.
    ///
    /// Returns `None` if the byte size overflows or the allocator refuses.
    pub fn try_new(capacity: usize) -> Option<Self> {
        Self::allocate(capacity, false)
    }

    /// Create an empty buffer with no allocation.
    pub fn empty() -> Self {
        AlignedBuffer {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: 0,
            layout: Layout::new::<u8>(),
            _marker: PhantomData,
        }
    }

    /// Get the current length (number of elements stored).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the capacity (maximum number of elements).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get a raw pointer to the data.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Get a mutable raw pointer to the data.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Get a slice view of the buffer content.
    pub fn as_slice(&self) -> &[T] {
        if self.capacity == 0 {
            &[]
        } else {
            // SAFETY: the first `len` slots are initialized.
            unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
        }
    }

    /// Check if the buffer's memory is properly aligned.
    pub fn is_aligned(&self) -> bool {
        self.ptr.as_ptr() as usize % ALIGNED_SIZE == 0
    }
}

impl<T: ZeroBits> AlignedBuffer<T> {
    /// Allocate `count` zero-valued elements. The buffer is full on return.
    pub fn try_zeroed(count: usize) -> Option<Self> {
        let mut buffer = Self::allocate(count, true)?;
        buffer.len = buffer.capacity;
        Some(buffer)
    }
}

// SAFETY: the buffer uniquely owns its allocation.
unsafe impl<T: Send> Send for AlignedBuffer<T> {}
unsafe impl<T: Sync> Sync for AlignedBuffer<T> {}

impl<T> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.capacity > 0 {
            // SAFETY: allocated in `allocate` with exactly this layout. Slot
            // contents are never dropped.
            unsafe {
                dealloc(self.ptr.as_ptr() as *mut u8, self.layout);
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("alignment", &self.layout.align())
            .field("data", &self.as_slice())
            .finish()
    }
}

/// Allocate uninitialized room for `count` items of `T`.
///
/// Returns `None` instead of allocating when `count * size_of::<T>()`
/// overflows, and when the allocator refuses. Never panics.
pub fn safe_alloc<T>(count: usize) -> Option<AlignedBuffer<T>> {
    let buffer = AlignedBuffer::try_new(count);
    if buffer.is_none() {
        log::debug!(
            "refused allocation of {} items of {} bytes",
            count,
            size_of::<T>()
        );
    }
    buffer
}

/// Allocate `count` zero-valued items of `T`.
pub fn safe_alloc_zeroed<T: ZeroBits>(count: usize) -> Option<AlignedBuffer<T>> {
    let buffer = AlignedBuffer::try_zeroed(count);
    if buffer.is_none() {
        log::debug!(
            "refused zeroed allocation of {} items of {} bytes",
            count,
            size_of::<T>()
        );
    }
    buffer
}

/// Allocate a zeroed byte region of `count * bytes_per_item` bytes.
///
/// The stride is explicit rather than derived from a type, for layouts where
/// one allocation holds items of a size only known at runtime.
pub fn safe_alloc_with_stride(count: usize, bytes_per_item: usize) -> Option<AlignedBuffer<u8>> {
    match byte_count(count, bytes_per_item) {
        Some(bytes) => safe_alloc_zeroed::<u8>(bytes),
        None => {
            log::debug!(
                "refused strided allocation of {} items of {} bytes",
                count,
                bytes_per_item
            );
            None
        }
    }
}

/// A fixed header followed by a variable-length array in one allocation.
///
/// The array base is recorded as a byte offset from the start of the region
/// and every access goes through the typed accessors, so no pointer into the
/// region escapes except as a borrow of `self`.
pub struct TrailingArray<H: Copy, T: ZeroBits> {
    region: AlignedBuffer<u8>,
    offset: usize,
    length: usize,
    _marker: PhantomData<(H, T)>,
}

impl<H: Copy, T: ZeroBits> TrailingArray<H, T> {
    /// Byte offset of the trailing array from the start of the region.
    pub const fn trailing_offset() -> usize {
        align_up(size_of::<H>(), align_of::<T>())
    }

    /// Allocate `header` followed by `length` zero-valued items.
    ///
    /// Returns `None` when the total size overflows, when either type needs
    /// more than [`ALIGNED_SIZE`] alignment, or when the allocator refuses.
    pub fn try_new(header: H, length: usize) -> Option<Self> {
        if align_of::<H>() > ALIGNED_SIZE || align_of::<T>() > ALIGNED_SIZE {
            return None;
        }
        let offset = Self::trailing_offset();
        let array_bytes = byte_count(length, size_of::<T>())?;
        if add_overflows(offset, array_bytes) {
            log::debug!("refused trailing array of {} items: size overflows", length);
            return None;
        }
        // one stride of the whole region keeps the sizing in one place
        let mut region = safe_alloc_with_stride(1, offset + array_bytes)?;
        if 0 < region.capacity() {
            // SAFETY: the region is ALIGNED_SIZE aligned and at least
            // size_of::<H>() bytes long.
            unsafe { ptr::write(region.as_mut_ptr() as *mut H, header) };
        }
        Some(TrailingArray {
            region,
            offset,
            length,
            _marker: PhantomData,
        })
    }

    /// Like [`TrailingArray::try_new`] but reports failure as an error.
    pub fn new(header: H, length: usize) -> Result<Self> {
        Self::try_new(header, length).ok_or_else(|| {
            MemoryError::AllocationFailed {
                count: length,
                bytes_per_item: size_of::<T>(),
            }
            .into()
        })
    }

    /// Header stored at the start of the region.
    pub fn header(&self) -> H {
        if 0 == size_of::<H>() || 0 == self.region.capacity() {
            // SAFETY: a zero-sized value has no bytes to read.
            return unsafe { ptr::read(NonNull::<H>::dangling().as_ptr()) };
        }
        // SAFETY: written in `try_new`, alignment checked there.
        unsafe { ptr::read(self.region.as_ptr() as *const H) }
    }

    /// Number of trailing items.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        0 == self.length
    }

    /// Byte offset of the trailing items inside the region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Trailing items.
    pub fn items(&self) -> &[T] {
        if 0 == self.length || 0 == size_of::<T>() {
            return &[];
        }
        // SAFETY: the region holds offset + length * size_of::<T>() zeroed
        // bytes and the offset is aligned for T.
        unsafe {
            std::slice::from_raw_parts(
                self.region.as_ptr().add(self.offset) as *const T,
                self.length,
            )
        }
    }

    /// Mutable trailing items.
    pub fn items_mut(&mut self) -> &mut [T] {
        if 0 == self.length || 0 == size_of::<T>() {
            return &mut [];
        }
        // SAFETY: see `items`; `&mut self` guarantees exclusive access.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.region.as_mut_ptr().add(self.offset) as *mut T,
                self.length,
            )
        }
    }

    /// Total bytes held by the region.
    pub fn size_in_bytes(&self) -> usize {
        self.region.len()
    }
}

impl<H: Copy + std::fmt::Debug, T: ZeroBits + std::fmt::Debug> std::fmt::Debug
    for TrailingArray<H, T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrailingArray")
            .field("header", &self.header())
            .field("offset", &self.offset)
            .field("items", &self.items())
            .finish()
    }
}

/// Round `size` up to a multiple of the power-of-two `alignment`.
pub const fn align_up(size: usize, alignment: usize) -> usize {
    (size + alignment - 1) & !(alignment - 1)
}
