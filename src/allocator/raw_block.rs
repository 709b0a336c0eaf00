use std::alloc::{self, Layout};
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use crate::{ErrorKind, Result};

/// 要素型`T`用の、未初期化の連続したメモリ領域.
///
/// 確保したメモリは、インスタンスの破棄時に一度だけ解放される.
///
/// 領域内の要素の初期化状態は追跡しないので、要素の破棄は利用者側の責務となる.
pub(crate) struct RawBlock<T> {
    ptr: NonNull<T>,
    capacity: usize,
    layout: Option<Layout>,
}
unsafe impl<T: Send> Send for RawBlock<T> {}
impl<T> RawBlock<T> {
    /// まだヒープ領域を持たない`RawBlock`インスタンスを生成する.
    pub fn unallocated() -> Self {
        RawBlock {
            ptr: NonNull::dangling(),
            capacity: 0,
            layout: None,
        }
    }

    /// `capacity`要素分の領域を確保する.
    ///
    /// `T`のサイズが0ないし`capacity`が0の場合には、ヒープ領域は確保されない.
    pub fn new(capacity: usize) -> Result<Self> {
        let layout = track!(Layout::array::<T>(capacity).map_err(crate::Error::from))?;
        if layout.size() == 0 {
            return Ok(RawBlock {
                ptr: NonNull::dangling(),
                capacity,
                layout: None,
            });
        }

        let ptr = unsafe { alloc::alloc(layout) } as *mut T;
        let ptr = track_assert_some!(
            NonNull::new(ptr),
            ErrorKind::OutOfMemory,
            "Cannot allocate {} bytes (capacity={})",
            layout.size(),
            capacity
        );
        Ok(RawBlock {
            ptr,
            capacity,
            layout: Some(layout),
        })
    }

    /// 容量(要素数)を返す.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 先頭要素へのポインタを返す.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// `index`番目のスロットへのポインタを返す.
    ///
    /// # Safety
    ///
    /// `index`は容量以下である必要がある(容量と等しい場合は終端を指すポインタとなる).
    pub unsafe fn slot(&self, index: usize) -> NonNull<T> {
        debug_assert!(index <= self.capacity, "index={}, capacity={}", index, self.capacity);
        NonNull::new_unchecked(self.ptr.as_ptr().add(index))
    }

    /// `new_capacity`要素分の新しい領域を確保して、先頭`used`要素分の内容を移し替える.
    ///
    /// 古い領域は、新しい領域への複写が完了した後に解放される.
    /// 新しい領域の確保に失敗した場合には、`self`は変更されない.
    ///
    /// Rustのムーブはビット単位の複写なので、要素型に関わらず、
    /// 移し替えの際にコンストラクタやデストラクタに相当する処理は実行されない.
    ///
    /// # Panics
    ///
    /// `used`が`new_capacity`ないし現在の容量を超えている場合には、現在のスレッドがパニックする.
    pub fn relocate(&mut self, new_capacity: usize, used: usize) -> Result<()> {
        assert!(used <= self.capacity, "used={}, capacity={}", used, self.capacity);
        assert!(used <= new_capacity, "used={}, new_capacity={}", used, new_capacity);

        let new_block = track!(RawBlock::new(new_capacity))?;
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_block.ptr.as_ptr(), used);
        }
        let old_block = mem::replace(self, new_block);
        mem::drop(old_block);
        Ok(())
    }
}
impl<T> Drop for RawBlock<T> {
    fn drop(&mut self) {
        if let Some(layout) = self.layout.take() {
            unsafe {
                alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout);
            }
        }
    }
}
impl<T> fmt::Debug for RawBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn new_works() -> TestResult {
        let block = track!(RawBlock::<u64>::new(16))?;
        assert_eq!(block.capacity(), 16);
        assert_eq!(block.as_ptr() as usize % mem::align_of::<u64>(), 0);

        let block = RawBlock::<u64>::unallocated();
        assert_eq!(block.capacity(), 0);
        Ok(())
    }

    #[test]
    fn zero_sized_block_works() -> TestResult {
        let block = track!(RawBlock::<()>::new(1024))?;
        assert_eq!(block.capacity(), 1024);
        assert!(block.layout.is_none());

        let block = track!(RawBlock::<u32>::new(0))?;
        assert!(block.layout.is_none());
        Ok(())
    }

    #[test]
    fn relocate_works() -> TestResult {
        let mut block = track!(RawBlock::<u32>::new(4))?;
        for i in 0..4 {
            unsafe { block.slot(i).as_ptr().write(i as u32 * 10) };
        }

        track!(block.relocate(8, 4))?;
        assert_eq!(block.capacity(), 8);
        for i in 0..4 {
            assert_eq!(unsafe { block.slot(i).as_ptr().read() }, i as u32 * 10);
        }
        Ok(())
    }

    #[test]
    fn too_large_block_is_rejected() {
        let e = RawBlock::<u64>::new(usize::MAX).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::OutOfMemory));
    }
}
