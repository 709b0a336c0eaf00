//! アロケータを指定可能な順序付きマップ.
//!
//! 要素は、キーの昇順に並んだ単一の配列(`allocator_api2::vec::Vec`)に格納される.
//! そのため、背後のアロケータに対して同時に保持する領域は常に一つだけであり、
//! `BlockAllocatorCell`とも組み合わせて利用可能.
//!
//! # 注意
//!
//! ノード単位で領域を確保する木構造(e.g., `std::collections::BTreeMap`)とは異なり、
//! ノード型向けに`Allocator::rebind`したアロケータを使用することはない.
//! 安定版のRustでは`BTreeMap`にアロケータを指定できず、また`BlockAllocator`は伸長時に
//! 全ての領域を移動させるため、複数のノードを同時に保持する構造とは組み合わせられない.
use allocator_api2::alloc::{Allocator, Global};
use allocator_api2::vec::Vec;
use std::fmt;
use std::mem;
use std::slice;

/// キーの昇順に要素を保持するマップ.
///
/// 挿入・検索は二分探索で行われる.
/// 挿入時には後続の要素群が移動するので、挿入のコストは要素数に比例する.
///
/// # Examples
///
/// ```
/// use blockalloc::allocator::BlockAllocatorCell;
/// use blockalloc::map::OrderedMap;
///
/// let mut map = OrderedMap::new_in(BlockAllocatorCell::<(i32, &str)>::new());
/// map.insert(2, "two");
/// map.insert(1, "one");
/// map.insert(3, "three");
///
/// assert_eq!(map.get(&2), Some(&"two"));
/// assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [1, 2, 3]);
/// ```
pub struct OrderedMap<K, V, A: Allocator = Global> {
    entries: Vec<(K, V), A>,
}
impl<K: Ord, V> OrderedMap<K, V> {
    /// グローバルアロケータを使用する、空の`OrderedMap`インスタンスを生成する.
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}
impl<K: Ord, V, A: Allocator> OrderedMap<K, V, A> {
    /// 指定のアロケータを使用する、空の`OrderedMap`インスタンスを生成する.
    ///
    /// 最初の挿入までアロケータは呼び出されない.
    pub fn new_in(allocator: A) -> Self {
        OrderedMap {
            entries: Vec::new_in(allocator),
        }
    }

    /// 要素を挿入する.
    ///
    /// キーが既に存在する場合には、値を置き換えて古い値を返す.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.search(&key) {
            Ok(i) => Some(mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                self.entries.insert(i, (key, value));
                None
            }
        }
    }

    /// キーに対応する値への参照を返す.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.search(key).ok().map(|i| &self.entries[i].1)
    }

    /// キーに対応する値への可変参照を返す.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.search(key) {
            Ok(i) => Some(&mut self.entries[i].1),
            Err(_) => None,
        }
    }

    /// キーに対応する値への可変参照を返す.
    ///
    /// キーが存在しない場合には、`f`で生成した値を挿入してから返す.
    pub fn get_or_insert_with<F>(&mut self, key: K, f: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let i = match self.search(&key) {
            Ok(i) => i,
            Err(i) => {
                self.entries.insert(i, (key, f()));
                i
            }
        };
        &mut self.entries[i].1
    }

    /// キーが存在するかどうかを返す.
    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    /// 要素数を返す.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 要素が一つも存在しないかどうかを返す.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// キーの昇順に要素を走査するイテレータを返す.
    pub fn iter(&self) -> Iter<K, V> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// マップが使用しているアロケータへの参照を返す.
    pub fn allocator(&self) -> &A {
        self.entries.allocator()
    }

    fn search(&self, key: &K) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }
}
impl<K: Ord, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
impl<'a, K: Ord, V, A: Allocator> IntoIterator for &'a OrderedMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
impl<K, V, A> fmt::Debug for OrderedMap<K, V, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// `OrderedMap`の要素をキーの昇順に走査するイテレータ.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    inner: slice::Iter<'a, (K, V)>,
}
impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}
impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}
