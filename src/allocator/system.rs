use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::allocator::Allocator;
use crate::{ErrorKind, Result};

/// グローバルアロケータ(`std::alloc`)をそのまま利用する`Allocator`の実装.
///
/// `allocate`の度にヒープ領域を確保し、`deallocate`で即座に解放する.
///
/// 状態を持たないので、インスタンスの生成や複製のコストはかからない.
pub struct SystemAllocator<T> {
    _value: PhantomData<fn() -> T>,
}
impl<T> SystemAllocator<T> {
    /// 新しい`SystemAllocator`インスタンスを生成する.
    pub fn new() -> Self {
        SystemAllocator {
            _value: PhantomData,
        }
    }
}
impl<T> Allocator for SystemAllocator<T> {
    type Value = T;
    type Rebind<U> = SystemAllocator<U>;

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>> {
        let layout = track!(Layout::array::<T>(n).map_err(crate::Error::from))?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        let ptr = unsafe { alloc::alloc(layout) } as *mut T;
        let ptr = track_assert_some!(
            NonNull::new(ptr),
            ErrorKind::OutOfMemory,
            "Cannot allocate {} bytes",
            layout.size()
        );
        Ok(ptr)
    }

    /// # Panics
    ///
    /// `n`要素分のレイアウトが表現不能な場合(i.e., `allocate(n)`が成功し得ない`n`が渡された場合)には、
    /// 現在のスレッドがパニックする.
    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) {
        let layout = Layout::array::<T>(n).expect("Broken `n`: it has already been allocated");
        if layout.size() != 0 {
            alloc::dealloc(ptr.as_ptr() as *mut u8, layout);
        }
    }

    fn rebind<U>(&self) -> SystemAllocator<U> {
        SystemAllocator::new()
    }
}
impl<T> Default for SystemAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> Clone for SystemAllocator<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}
impl<T> Copy for SystemAllocator<T> {}
impl<T> fmt::Debug for SystemAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SystemAllocator")
    }
}
