//! 固定容量のシーケンスコンテナ.
//!
//! コンテナは、要素の構築・破棄を自身で行い、
//! そのための領域だけを注入されたアロケータから得る.
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::slice;

use crate::allocator::{Allocator, SystemAllocator};
use crate::{ErrorKind, Result};

/// 最大長が`N`に固定されたシーケンスコンテナ.
///
/// 最初の要素追加時に、`N`要素分の領域をアロケータに一度だけ要求する.
/// 以降はアロケータを呼び出さずに、確保済みの領域内で要素の構築を行う.
/// (再割当や縮小は一切行われない)
///
/// 要素の削除操作は提供しておらず、全ての要素はコンテナの破棄時に、
/// インデックスの昇順で破棄される. その後、領域がアロケータに返却される.
///
/// # Examples
///
/// ```
/// use blockalloc::ErrorKind;
/// use blockalloc::allocator::BlockAllocator;
/// use blockalloc::container::FixedCapacityVec;
///
/// let mut vec = FixedCapacityVec::<i32, 3, BlockAllocator<i32>>::new();
/// for i in 0..3 {
///     vec.push(i).unwrap();
/// }
/// assert_eq!(vec.len(), 3);
/// assert_eq!(vec.get(1).ok(), Some(&1));
///
/// assert_eq!(vec.push(3).err().map(|e| *e.kind()), Some(ErrorKind::CapacityExceeded));
/// assert_eq!(vec.get(3).err().map(|e| *e.kind()), Some(ErrorKind::OutOfBounds));
/// ```
pub struct FixedCapacityVec<T, const N: usize, A = SystemAllocator<T>>
where
    A: Allocator<Value = T>,
{
    storage: Option<NonNull<T>>,
    len: usize,
    allocator: A,
    _owns: PhantomData<T>,
}
impl<T, const N: usize, A> FixedCapacityVec<T, N, A>
where
    A: Allocator<Value = T> + Default,
{
    /// デフォルトのアロケータを使用する、新しい`FixedCapacityVec`インスタンスを生成する.
    pub fn new() -> Self {
        Self::with_allocator(A::default())
    }
}
impl<T, const N: usize, A> FixedCapacityVec<T, N, A>
where
    A: Allocator<Value = T>,
{
    /// 指定のアロケータを使用する、新しい`FixedCapacityVec`インスタンスを生成する.
    ///
    /// この時点では、まだアロケータは呼び出されない.
    pub fn with_allocator(allocator: A) -> Self {
        FixedCapacityVec {
            storage: None,
            len: 0,
            allocator,
            _owns: PhantomData,
        }
    }

    /// 末尾に要素を追加する.
    ///
    /// 最初の呼び出し時には、`N`要素分の領域がアロケータから確保される.
    ///
    /// # Errors
    ///
    /// 既に`N`個の要素が格納されている場合には、種類が`ErrorKind::CapacityExceeded`のエラーが返される.
    /// その場合、コンテナの状態は変更されない.
    ///
    /// 領域の確保に失敗した場合には、種類が`ErrorKind::OutOfMemory`のエラーが返される.
    pub fn push(&mut self, value: T) -> Result<()> {
        track_assert!(
            self.len < N,
            ErrorKind::CapacityExceeded,
            "Container is full: capacity={}",
            N
        );
        let storage = if let Some(storage) = self.storage {
            storage
        } else {
            let storage = track!(self.allocator.allocate(N))?;
            self.storage = Some(storage);
            storage
        };
        unsafe {
            storage.as_ptr().add(self.len).write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// `index`番目の要素への参照を返す.
    ///
    /// # Errors
    ///
    /// `index`が`len()`以上の場合には、種類が`ErrorKind::OutOfBounds`のエラーが返される.
    pub fn get(&self, index: usize) -> Result<&T> {
        track_assert!(
            index < self.len,
            ErrorKind::OutOfBounds,
            "index={}, len={}",
            index,
            self.len
        );
        Ok(&self.as_slice()[index])
    }

    /// `index`番目の要素への可変参照を返す.
    ///
    /// # Errors
    ///
    /// `index`が`len()`以上の場合には、種類が`ErrorKind::OutOfBounds`のエラーが返される.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        track_assert!(
            index < self.len,
            ErrorKind::OutOfBounds,
            "index={}, len={}",
            index,
            self.len
        );
        Ok(&mut self.as_mut_slice()[index])
    }

    /// 格納されている要素の数を返す.
    pub fn len(&self) -> usize {
        self.len
    }

    /// 要素が一つも格納されていないかどうかを返す.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 最大長(`N`)を返す.
    pub fn capacity(&self) -> usize {
        N
    }

    /// アロケータから領域を確保済みかどうかを返す.
    ///
    /// 一度確保された領域は、コンテナの破棄時まで保持される.
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// 要素群をスライスとして返す.
    pub fn as_slice(&self) -> &[T] {
        match self.storage {
            Some(storage) => unsafe { slice::from_raw_parts(storage.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// 要素群を可変スライスとして返す.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.storage {
            Some(storage) => unsafe { slice::from_raw_parts_mut(storage.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// 要素群を先頭から順に走査するイテレータを返す.
    pub fn iter(&self) -> slice::Iter<T> {
        self.as_slice().iter()
    }

    /// コンテナが使用しているアロケータへの参照を返す.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}
impl<T, const N: usize, A> Drop for FixedCapacityVec<T, N, A>
where
    A: Allocator<Value = T>,
{
    fn drop(&mut self) {
        if let Some(storage) = self.storage.take() {
            unsafe {
                ptr::drop_in_place(slice::from_raw_parts_mut(storage.as_ptr(), self.len));
                self.allocator.deallocate(storage, N);
            }
        }
    }
}
impl<T, const N: usize, A> Default for FixedCapacityVec<T, N, A>
where
    A: Allocator<Value = T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}
impl<'a, T, const N: usize, A> IntoIterator for &'a FixedCapacityVec<T, N, A>
where
    A: Allocator<Value = T>,
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
impl<T, const N: usize, A> fmt::Debug for FixedCapacityVec<T, N, A>
where
    T: fmt::Debug,
    A: Allocator<Value = T>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use trackable::result::TestResult;

    use super::*;
    use crate::allocator::BlockAllocator;

    #[test]
    fn it_works() -> TestResult {
        let mut vec = FixedCapacityVec::<i32, 10>::new();
        assert!(vec.is_empty());
        assert!(!vec.has_storage());

        for i in 0..10 {
            track!(vec.push(i))?;
            assert_eq!(vec.len(), i as usize + 1);
        }
        assert!(vec.has_storage());
        for i in 0..10 {
            assert_eq!(*track!(vec.get(i))?, i as i32);
        }
        assert!(vec.iter().copied().eq(0..10));
        Ok(())
    }

    #[test]
    fn block_allocator_backed_container_works() -> TestResult {
        let mut vec = FixedCapacityVec::<i32, 10, BlockAllocator<i32, 10>>::new();
        for i in 0..10 {
            track!(vec.push(i))?;
        }
        assert_eq!(vec.len(), 10);
        for i in 0..10 {
            assert_eq!(vec.get(i).ok(), Some(&(i as i32)));
        }

        let e = vec.push(10).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::CapacityExceeded));
        assert_eq!(vec.len(), 10);
        assert_eq!(vec.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        // 領域の要求は、最初の追加時の一度だけ
        let m = vec.allocator().metrics();
        assert_eq!(m.allocations(), 1);
        assert_eq!(m.allocated_elements(), 10);
        assert_eq!(m.growths(), 0);
        Ok(())
    }

    #[test]
    fn single_request_covers_whole_capacity() -> TestResult {
        // 初期容量が足りない場合には、最初の要求時にのみ伸長が発生する
        let mut vec = FixedCapacityVec::<u8, 20, BlockAllocator<u8, 4>>::new();
        for i in 0..20 {
            track!(vec.push(i))?;
        }
        let allocator = vec.allocator();
        assert_eq!(allocator.capacity(), 32);
        assert_eq!(allocator.reserved(), 20);
        assert_eq!(allocator.metrics().allocations(), 1);
        Ok(())
    }

    #[test]
    fn out_of_bounds_access_is_rejected() -> TestResult {
        let mut vec = FixedCapacityVec::<String, 4>::new();
        let e = vec.get(0).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::OutOfBounds));

        track!(vec.push("foo".to_owned()))?;
        let e = vec.get(1).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::OutOfBounds));
        let e = vec.get_mut(usize::MAX).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::OutOfBounds));

        track!(vec.get_mut(0))?.push_str("bar");
        assert_eq!(track!(vec.get(0))?, "foobar");
        assert_eq!(vec.len(), 1);
        Ok(())
    }

    #[test]
    fn zero_capacity_container_never_allocates() {
        let mut vec = FixedCapacityVec::<i32, 0, BlockAllocator<i32>>::new();
        let e = vec.push(1).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::CapacityExceeded));
        assert!(!vec.has_storage());
        assert!(!vec.allocator().has_block());
    }

    #[test]
    fn elements_are_dropped_in_ascending_order() -> TestResult {
        let dropped = Rc::new(RefCell::new(Vec::new()));
        {
            let mut vec = FixedCapacityVec::<DropRecorder, 8, BlockAllocator<DropRecorder>>::new();
            for i in 0..5 {
                track!(vec.push(DropRecorder(i, Rc::clone(&dropped))))?;
            }
            assert!(dropped.borrow().is_empty());
        }
        assert_eq!(*dropped.borrow(), vec![0, 1, 2, 3, 4]);

        dropped.borrow_mut().clear();
        {
            let mut vec = FixedCapacityVec::<DropRecorder, 2>::new();
            track!(vec.push(DropRecorder(0, Rc::clone(&dropped))))?;
            track!(vec.push(DropRecorder(1, Rc::clone(&dropped))))?;

            // 満杯の場合には、渡された値だけが破棄される
            assert!(vec.push(DropRecorder(2, Rc::clone(&dropped))).is_err());
            assert_eq!(*dropped.borrow(), vec![2]);
        }
        assert_eq!(*dropped.borrow(), vec![2, 0, 1]);
        Ok(())
    }

    #[test]
    fn fresh_instance_starts_empty() -> TestResult {
        {
            let mut vec = FixedCapacityVec::<u64, 3, BlockAllocator<u64>>::new();
            track!(vec.push(1))?;
        }
        let vec = FixedCapacityVec::<u64, 3, BlockAllocator<u64>>::new();
        assert_eq!(vec.len(), 0);
        assert!(!vec.has_storage());
        assert_eq!(vec.iter().count(), 0);
        Ok(())
    }

    #[test]
    fn debug_works() -> TestResult {
        let mut vec = FixedCapacityVec::<i32, 3>::new();
        track!(vec.push(1))?;
        track!(vec.push(2))?;
        assert_eq!(format!("{:?}", vec), "[1, 2]");

        let mut total = 0;
        for v in &vec {
            total += v;
        }
        assert_eq!(total, 3);
        Ok(())
    }

    #[derive(Debug)]
    struct DropRecorder(usize, Rc<RefCell<Vec<usize>>>);
    impl Drop for DropRecorder {
        fn drop(&mut self) {
            self.1.borrow_mut().push(self.0);
        }
    }
}
