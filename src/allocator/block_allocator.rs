use std::cmp;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use slog::Logger;

use crate::allocator::{Allocator, BlockAllocatorBuilder, RawBlock};
use crate::metrics::BlockAllocatorMetrics;
use crate::{ErrorKind, Result};

/// `BlockAllocator`の初期容量のデフォルト値(要素数).
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// 単一の連続したブロックから領域を切り出すバンプアロケータ.
///
/// # 割当戦略
///
/// 割当要求が発行される度に、ブロック内の「次の空きスロット」を指すカーソルを進め、
/// 進める前のカーソル位置を返す.
///
/// 残り容量が足りない場合には、要求が収まるまでブロックの容量を倍々に増やす.
/// 伸長時には、使用済みのスロット群の内容を新しいブロックに移し替えた上で、古いブロックを解放する.
/// そのため、伸長が発生すると、それ以前に返したポインタは全て無効となる.
///
/// `deallocate`は何も行わない. 返却された領域が再利用されることはなく、
/// ブロックはアロケータの破棄時に一括で解放される.
///
/// ブロックは最初の割当要求時に確保される. それまでの容量は`INITIAL`となる.
/// なお`INITIAL`に`0`が指定された場合には、`1`として扱われる.
///
/// # 要素の所有
///
/// `allocate`で返した領域内の要素は、呼び出し元が構築・破棄を行う.
///
/// 一方で`emplace`によって格納された要素はアロケータが所有し、
/// アロケータの破棄時に、インデックスの昇順で破棄される.
///
/// # 注意
///
/// 一つのインスタンスを、複数のコンテナで共有してはいけない.
/// (伸長によって、他のコンテナが保持しているポインタが無効になってしまうため)
pub struct BlockAllocator<T, const INITIAL: usize = DEFAULT_INITIAL_CAPACITY> {
    block: RawBlock<T>,
    reserved: usize,
    emplaced: Vec<usize>,
    logger: Logger,
    metrics: BlockAllocatorMetrics,
}
impl<T, const INITIAL: usize> BlockAllocator<T, INITIAL> {
    /// デフォルト設定で新しい`BlockAllocator`インスタンスを生成する.
    ///
    /// 設定を変更したい場合には`BlockAllocatorBuilder`を使用すること.
    pub fn new() -> Self {
        BlockAllocatorBuilder::new().finish()
    }

    pub(crate) fn with_parts(logger: Logger, metrics: BlockAllocatorMetrics) -> Self {
        metrics
            .capacity_elements
            .set(Self::initial_capacity() as f64);
        BlockAllocator {
            block: RawBlock::unallocated(),
            reserved: 0,
            emplaced: Vec::new(),
            logger,
            metrics,
        }
    }

    /// `n`要素分の領域を割り当てて、その先頭を指すポインタを返す.
    ///
    /// 返される領域は、既に割り当て済みの領域とは重ならない.
    ///
    /// 残り容量が`n`に満たない場合には、ブロックの伸長が行われる.
    /// その場合、以前に返したポインタは全て無効になる.
    ///
    /// # Errors
    ///
    /// ブロックの確保ないし伸長に失敗した場合には、種類が`ErrorKind::OutOfMemory`のエラーが返される.
    /// その場合でも、アロケータの状態は変更されない.
    pub fn allocate(&mut self, n: usize) -> Result<NonNull<T>> {
        if let Err(e) = self.reserve(n) {
            self.metrics.oom_failures.increment();
            warn!(self.logger, "Cannot allocate elements: {}", e;
                  "requested" => n, "reserved" => self.reserved, "capacity" => self.capacity());
            return Err(track!(e));
        }

        let ptr = unsafe { self.block.slot(self.reserved) };
        self.reserved += n;
        self.metrics.allocations.increment();
        self.metrics.allocated_elements.add_u64(n as u64);
        Ok(ptr)
    }

    /// 領域を返却する.
    ///
    /// 実際には何も行わない. 返却された領域は、アロケータが破棄されるまで再利用されない.
    pub fn deallocate(&mut self, _ptr: NonNull<T>, _n: usize) {
        self.metrics.deallocations.increment();
    }

    /// 一要素分の領域を割り当てて、そこに`value`を格納する.
    ///
    /// 結果として、格納先のスロットのインデックスが返される.
    ///
    /// 格納された要素はアロケータが所有し、アロケータの破棄時に(インデックスの昇順で)破棄される.
    /// ブロックの伸長が発生しても、要素の値は保持される.
    ///
    /// # Errors
    ///
    /// ブロックの伸長に失敗した場合には、種類が`ErrorKind::OutOfMemory`のエラーが返される.
    pub fn emplace(&mut self, value: T) -> Result<usize> {
        let ptr = track!(self.allocate(1))?;
        unsafe {
            ptr.as_ptr().write(value);
        }
        let index = self.reserved - 1;
        self.emplaced.push(index);
        self.metrics.emplaced_elements.increment();
        Ok(index)
    }

    /// `emplace`で格納された要素への参照を返す.
    ///
    /// `index`のスロットに、`emplace`で格納された要素が存在しない場合には`None`が返される.
    pub fn get(&self, index: usize) -> Option<&T> {
        if self.emplaced.binary_search(&index).is_ok() {
            Some(unsafe { &*self.block.slot(index).as_ptr() })
        } else {
            None
        }
    }

    /// `emplace`で格納された要素への可変参照を返す.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.emplaced.binary_search(&index).is_ok() {
            Some(unsafe { &mut *self.block.slot(index).as_ptr() })
        } else {
            None
        }
    }

    /// 新しい要素型`U`向けの、同じ設定(初期容量、logger、メトリクス)を引き継いだアロケータを生成する.
    ///
    /// 生成されたアロケータは、自身のブロックを持ち、まだ何も割り当てていない状態となる.
    /// メトリクスのカウンタ群は共有されるが、容量のゲージは個別に持つ.
    pub fn rebind<U>(&self) -> BlockAllocator<U, INITIAL> {
        BlockAllocator::with_parts(self.logger.clone(), self.metrics.rebind())
    }

    /// ブロックの容量(要素数)を返す.
    pub fn capacity(&self) -> usize {
        if self.has_block() {
            self.block.capacity()
        } else {
            Self::initial_capacity()
        }
    }

    /// 割当済みの要素数を返す.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// 伸長なしで割り当て可能な要素数を返す.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.reserved
    }

    /// `emplace`によって格納された要素の数を返す.
    pub fn emplaced(&self) -> usize {
        self.emplaced.len()
    }

    /// ブロックが確保済みかどうかを返す.
    pub fn has_block(&self) -> bool {
        self.block.capacity() != 0
    }

    /// アロケータ用のメトリクスを返す.
    pub fn metrics(&self) -> &BlockAllocatorMetrics {
        &self.metrics
    }

    /// `ptr`が指すスロットのインデックスを返す.
    ///
    /// `ptr`が現在のブロック内の割当済み領域(ないしその終端)を指していない場合には`None`が返される.
    pub(crate) fn slot_index(&self, ptr: NonNull<T>) -> Option<usize> {
        let size = mem::size_of::<T>();
        if size == 0 || !self.has_block() {
            return None;
        }
        let base = self.block.as_ptr() as usize;
        let offset = (ptr.as_ptr() as usize).checked_sub(base)?;
        if offset % size != 0 || offset / size > self.reserved {
            return None;
        }
        Some(offset / size)
    }

    /// `index`番目のスロットへのポインタを返す.
    ///
    /// # Safety
    ///
    /// `index`は`reserved()`以下である必要がある.
    pub(crate) unsafe fn slot(&self, index: usize) -> NonNull<T> {
        debug_assert!(index <= self.reserved);
        self.block.slot(index)
    }

    /// `n`要素分の割当によって、既存のブロックが移動するかどうかを返す.
    pub(crate) fn would_relocate(&self, n: usize) -> bool {
        self.has_block() && n > self.remaining()
    }

    fn initial_capacity() -> usize {
        cmp::max(INITIAL, 1)
    }

    // 新たに`n`要素分が割り当て可能となるように、必要に応じてブロックの確保ないし伸長を行う.
    fn reserve(&mut self, n: usize) -> Result<()> {
        let required = track_assert_some!(
            self.reserved.checked_add(n),
            ErrorKind::OutOfMemory,
            "Too many elements: reserved={}, requested={}",
            self.reserved,
            n
        );

        let old_capacity = self.capacity();
        let mut new_capacity = old_capacity;
        let mut growths = 0;
        while new_capacity < required {
            new_capacity = track_assert_some!(
                new_capacity.checked_mul(2),
                ErrorKind::OutOfMemory,
                "Capacity overflow: capacity={}, required={}",
                new_capacity,
                required
            );
            growths += 1;
        }

        if !self.has_block() {
            self.block = track!(RawBlock::new(new_capacity))?;
            debug!(self.logger, "Block allocated"; "capacity" => new_capacity);
        } else if growths > 0 {
            track!(self.block.relocate(new_capacity, self.reserved))?;
            self.metrics
                .relocated_bytes
                .add_u64((self.reserved * mem::size_of::<T>()) as u64);
            debug!(self.logger, "Block grown";
                   "old_capacity" => old_capacity,
                   "new_capacity" => new_capacity,
                   "relocated" => self.reserved);
        }
        if growths > 0 {
            self.metrics.growths.add_u64(growths);
            self.metrics.capacity_elements.set(new_capacity as f64);
        }
        Ok(())
    }
}
impl<T, const INITIAL: usize> Allocator for BlockAllocator<T, INITIAL> {
    type Value = T;
    type Rebind<U> = BlockAllocator<U, INITIAL>;

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>> {
        track!(BlockAllocator::allocate(self, n))
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) {
        BlockAllocator::deallocate(self, ptr, n)
    }

    fn rebind<U>(&self) -> BlockAllocator<U, INITIAL> {
        BlockAllocator::rebind(self)
    }
}
impl<T, const INITIAL: usize> Default for BlockAllocator<T, INITIAL> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T, const INITIAL: usize> Drop for BlockAllocator<T, INITIAL> {
    fn drop(&mut self) {
        for &index in &self.emplaced {
            unsafe {
                ptr::drop_in_place(self.block.slot(index).as_ptr());
            }
        }
        // ブロック自体は、この後の`RawBlock`の破棄時に解放される
    }
}
impl<T, const INITIAL: usize> fmt::Debug for BlockAllocator<T, INITIAL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BlockAllocator")
            .field("capacity", &self.capacity())
            .field("reserved", &self.reserved)
            .field("emplaced", &self.emplaced.len())
            .field("has_block", &self.has_block())
            .finish()
    }
}
