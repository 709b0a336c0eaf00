use allocator_api2::alloc::{AllocError, Allocator as ByteAllocator, Layout};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use crate::allocator::{BlockAllocator, DEFAULT_INITIAL_CAPACITY};

/// `BlockAllocator`を`allocator_api2::alloc::Allocator`として利用するためのラッパー.
///
/// `allocator_api2`に対応したコレクション(e.g., `allocator_api2::vec::Vec`)は、
/// このラッパーを介して、ブロックアロケータから領域を得ることができる.
///
/// 要求されたバイト数は、要素型`T`の要素数に切り上げられた上で、内部のアロケータに渡される.
/// `T`よりも厳しいアライメントを要求するレイアウトや、`T`がサイズを持たない場合の
/// (サイズが0ではない)割当要求は`AllocError`となる.
///
/// # ブロックの伸長
///
/// ブロックの伸長時には、それ以前に割り当てた領域が全て移動する.
/// そのため、このラッパーは未返却の領域の数を数えておき、
/// 伸長が必要となる要求は、他に未返却の領域が存在しない場合にのみ受け付ける.
/// (`grow`の場合には、伸長対象の領域自体は除いて数える)
///
/// 「常に最新の領域のみを保持する」利用者(e.g., `Vec`)であれば、制限なく伸長が行える.
/// 複数の領域を同時に保持する利用者の場合には、ブロックの残り容量を超える要求は`AllocError`となる.
pub struct BlockAllocatorCell<T, const INITIAL: usize = DEFAULT_INITIAL_CAPACITY> {
    inner: RefCell<BlockAllocator<T, INITIAL>>,
    live_regions: Cell<usize>,
}
impl<T, const INITIAL: usize> BlockAllocatorCell<T, INITIAL> {
    /// デフォルト設定のアロケータをラップした、新しい`BlockAllocatorCell`インスタンスを生成する.
    pub fn new() -> Self {
        Self::from(BlockAllocator::new())
    }

    /// 内部のアロケータへの参照を返す.
    ///
    /// # Panics
    ///
    /// 割当処理の実行中に呼び出された場合には、現在のスレッドがパニックする.
    pub fn get_ref(&self) -> Ref<BlockAllocator<T, INITIAL>> {
        self.inner.borrow()
    }

    /// 未返却の領域の数を返す.
    pub fn live_regions(&self) -> usize {
        self.live_regions.get()
    }

    /// 内部のアロケータを返す.
    pub fn into_inner(self) -> BlockAllocator<T, INITIAL> {
        self.inner.into_inner()
    }

    fn slot_count(layout: &Layout) -> Result<usize, AllocError> {
        let slot_size = mem::size_of::<T>();
        if layout.align() > mem::align_of::<T>() || slot_size == 0 {
            return Err(AllocError);
        }
        Ok((layout.size() + slot_size - 1) / slot_size)
    }

    // `others`は、この割当の後も有効であり続ける必要がある既存の領域の数
    fn allocate_slots(&self, n: usize, others: usize) -> Result<NonNull<[u8]>, AllocError> {
        if others > 0 && self.inner.borrow().would_relocate(n) {
            return Err(AllocError);
        }
        let ptr = self.inner.borrow_mut().allocate(n).map_err(|_| AllocError)?;
        let len = n * mem::size_of::<T>();
        Ok(NonNull::slice_from_raw_parts(ptr.cast::<u8>(), len))
    }
}
unsafe impl<T, const INITIAL: usize> ByteAllocator for BlockAllocatorCell<T, INITIAL> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            let dangling = NonNull::new(layout.align() as *mut u8).ok_or(AllocError)?;
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        let n = Self::slot_count(&layout)?;
        let region = self.allocate_slots(n, self.live_regions.get())?;
        self.live_regions.set(self.live_regions.get() + 1);
        Ok(region)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        if let Ok(n) = Self::slot_count(&layout) {
            self.inner.borrow_mut().deallocate(ptr.cast(), n);
            self.live_regions.set(self.live_regions.get().saturating_sub(1));
        }
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(new_layout.size() >= old_layout.size());
        if old_layout.size() == 0 {
            return self.allocate(new_layout);
        }

        // 新しい領域の割当時にブロックが移動する可能性があるので、
        // 古い領域の位置はスロットのインデックスとして覚えておく
        let old_index = self
            .inner
            .borrow()
            .slot_index(ptr.cast())
            .ok_or(AllocError)?;
        let old_n = Self::slot_count(&old_layout)?;
        let n = Self::slot_count(&new_layout)?;
        let others = self.live_regions.get().saturating_sub(1);
        let new_ptr = self.allocate_slots(n, others)?;

        let mut inner = self.inner.borrow_mut();
        let old_ptr = inner.slot(old_index);
        ptr::copy_nonoverlapping(
            old_ptr.as_ptr() as *const u8,
            new_ptr.as_ptr() as *mut u8,
            old_layout.size(),
        );
        // 古い領域を新しい領域で置き換えるだけなので、未返却の領域数は変わらない
        inner.deallocate(old_ptr, old_n);
        Ok(new_ptr)
    }

    unsafe fn grow_zeroed(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        let new_ptr = self.grow(ptr, old_layout, new_layout)?;
        let start = new_ptr.as_ptr() as *mut u8;
        ptr::write_bytes(
            start.add(old_layout.size()),
            0,
            new_layout.size() - old_layout.size(),
        );
        Ok(new_ptr)
    }

    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(new_layout.size() <= old_layout.size());
        if new_layout.align() > old_layout.align() {
            return Err(AllocError);
        }
        // 領域は移動させず、利用可能な長さだけを縮める
        Ok(NonNull::slice_from_raw_parts(ptr, new_layout.size()))
    }
}
impl<T, const INITIAL: usize> From<BlockAllocator<T, INITIAL>> for BlockAllocatorCell<T, INITIAL> {
    fn from(f: BlockAllocator<T, INITIAL>) -> Self {
        BlockAllocatorCell {
            inner: RefCell::new(f),
            live_regions: Cell::new(0),
        }
    }
}
impl<T, const INITIAL: usize> Default for BlockAllocatorCell<T, INITIAL> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T, const INITIAL: usize> fmt::Debug for BlockAllocatorCell<T, INITIAL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BlockAllocatorCell")
            .field("inner", &self.inner)
            .field("live_regions", &self.live_regions.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use allocator_api2::vec::Vec;

    use super::*;

    #[test]
    fn vec_works() {
        let mut vec: Vec<u64, _> = Vec::new_in(BlockAllocatorCell::<u64, 4>::new());
        for i in 0..100 {
            vec.push(i);
        }
        assert_eq!(vec.len(), 100);
        assert!(vec.iter().copied().eq(0..100));

        let allocator = vec.allocator().get_ref();
        assert!(allocator.metrics().growths() > 0);
        assert!(allocator.capacity() >= 100);
        assert_eq!(allocator.capacity() % 4, 0);
        assert!((allocator.capacity() / 4).is_power_of_two());
    }

    #[test]
    fn grow_copies_from_relocated_block() {
        let cell = BlockAllocatorCell::<u32, 4>::new();
        let layout = Layout::array::<u32>(4).expect("Never fails");
        let first = cell.allocate(layout).expect("Never fails").cast::<u32>();
        for i in 0..4 {
            unsafe { first.as_ptr().add(i).write(i as u32 + 1) };
        }
        assert_eq!(cell.get_ref().capacity(), 4);

        // 次の割当でブロックが移動する
        let new_layout = Layout::array::<u32>(8).expect("Never fails");
        let second =
            unsafe { cell.grow(first.cast(), layout, new_layout) }.expect("Never fails");
        assert_eq!(cell.get_ref().capacity(), 16);
        assert_eq!(second.len(), 32);

        let second = second.cast::<u32>();
        for i in 0..4 {
            assert_eq!(unsafe { second.as_ptr().add(i).read() }, i as u32 + 1);
        }
    }

    #[test]
    fn shared_cell_never_relocates_live_regions() {
        let cell = BlockAllocatorCell::<u64, 4>::new();
        let mut a: Vec<u64, _> = Vec::new_in(&cell);
        a.try_reserve_exact(4).expect("Never fails");
        for i in 0..4 {
            a.push(i);
        }
        assert_eq!(cell.live_regions(), 1);

        // `a`の領域が生きている間は、ブロックの伸長を伴う割当は拒否される
        let mut b: Vec<u64, _> = Vec::new_in(&cell);
        assert!(b.try_reserve_exact(8).is_err());
        assert_eq!(cell.get_ref().capacity(), 4);
        assert!(cell.get_ref().slot_index(NonNull::new(a.as_mut_ptr()).expect("Never fails")).is_some());
        assert!(a.iter().copied().eq(0..4));

        drop(a);
        assert_eq!(cell.live_regions(), 0);
        b.try_reserve_exact(8).expect("Never fails");
        for i in 0..8 {
            b.push(i);
        }
        assert!(b.iter().copied().eq(0..8));
        assert_eq!(cell.live_regions(), 1);
    }

    #[test]
    fn grow_is_refused_while_other_regions_are_live() {
        let cell = BlockAllocatorCell::<u32, 4>::new();
        let mut a: Vec<u32, _> = Vec::new_in(&cell);
        let mut b: Vec<u32, _> = Vec::new_in(&cell);
        a.try_reserve_exact(2).expect("Never fails");
        b.try_reserve_exact(2).expect("Never fails");
        a.extend_from_slice(&[1, 2]);
        b.extend_from_slice(&[3, 4]);
        assert_eq!(cell.live_regions(), 2);

        assert!(b.try_reserve_exact(10).is_err());
        assert_eq!(cell.get_ref().capacity(), 4);
        assert_eq!(&a[..], &[1, 2]);
        assert_eq!(&b[..], &[3, 4]);

        drop(a);
        b.try_reserve_exact(10).expect("Never fails");
        b.push(5);
        assert_eq!(&b[..], &[3, 4, 5]);
        assert!(cell.get_ref().capacity() >= 16);
    }

    #[test]
    fn unsupported_layouts_are_rejected() {
        let cell = BlockAllocatorCell::<u8>::new();
        assert!(cell.allocate(Layout::new::<u64>()).is_err());

        let cell = BlockAllocatorCell::<()>::new();
        assert!(cell.allocate(Layout::new::<u8>()).is_err());
        assert!(cell.allocate(Layout::new::<()>()).is_ok());
    }

    #[test]
    fn odd_sized_requests_are_rounded_up() {
        let cell = BlockAllocatorCell::<u32, 16>::new();
        let layout = Layout::from_size_align(5, 1).expect("Never fails");
        let region = cell.allocate(layout).expect("Never fails");
        assert_eq!(region.len(), 8);
        assert_eq!(cell.get_ref().reserved(), 2);
    }
}
