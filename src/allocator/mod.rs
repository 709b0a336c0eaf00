//! アロケータのインターフェース定義と実装群.
//!
//! アロケータは、要素型`T`の未初期化領域の確保と返却のみを担当する.
//!
//! 領域内での要素の構築・破棄は、(一部の例外を除いて)アロケータの利用者側の責務である.
use std::ptr::NonNull;

pub use self::block_allocator::{BlockAllocator, DEFAULT_INITIAL_CAPACITY};
pub use self::builder::BlockAllocatorBuilder;
pub use self::cell::BlockAllocatorCell;
pub use self::system::SystemAllocator;

pub(crate) use self::raw_block::RawBlock;

use crate::Result;

mod block_allocator;
mod builder;
mod cell;
mod raw_block;
mod system;

/// 汎用コンテナが利用するアロケータを表すトレイト.
///
/// 実装は、特定の要素型([`Value`])向けに特殊化されている.
/// 別の要素型向けの、同じ方針のアロケータが必要な場合には[`rebind`]を使用する.
///
/// [`Value`]: #associatedtype.Value
/// [`rebind`]: #tymethod.rebind
pub trait Allocator {
    /// このアロケータが領域を提供する要素の型.
    type Value;

    /// 要素型を`U`に差し替えた、同じ種類のアロケータ.
    type Rebind<U>: Allocator<Value = U>;

    /// `n`要素分の未初期化領域を確保し、その先頭を指すポインタを返す.
    ///
    /// 返された領域の内容は未定義であり、要素の構築は呼び出し元が行う必要がある.
    ///
    /// # Errors
    ///
    /// 必要なメモリが確保できなかった場合には、種類が`ErrorKind::OutOfMemory`のエラーが返される.
    fn allocate(&mut self, n: usize) -> Result<NonNull<Self::Value>>;

    /// `allocate`で確保した領域を返却する.
    ///
    /// 実際にメモリが解放されるかどうか(およびそのタイミング)は実装次第.
    ///
    /// # Safety
    ///
    /// - `ptr`は、このアロケータの`allocate(n)`が返したポインタである
    /// - 領域内の要素は、既に全て破棄済み(ないし未構築)である
    /// - 返却後に`ptr`を介して領域にアクセスしない
    unsafe fn deallocate(&mut self, ptr: NonNull<Self::Value>, n: usize);

    /// 要素型`U`向けの、同じ設定を引き継いだアロケータを生成する.
    ///
    /// 生成されたアロケータは、元のアロケータとは独立した領域を管理する.
    fn rebind<U>(&self) -> Self::Rebind<U>;
}
