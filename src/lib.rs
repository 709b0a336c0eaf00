//! Block Allocator.
//!
//! `blockalloc`は、ブロック単位で伸長するバンプアロケータと、
//! 注入されたアロケータからメモリを得る固定容量のシーケンスコンテナを提供するcrate.
//!
//! # 特徴
//!
//! - [BlockAllocator]は、単一の連続したブロックを所有し、容量が不足した場合には倍々に伸長する
//!   - 割当はカーソルを進めるだけ(バンプポインタ方式)で、解放(`deallocate`)は何も行わない
//!   - ブロックはアロケータの破棄時に一括で解放される
//! - [FixedCapacityVec]は、最大長がコンパイル時に固定されたシーケンスコンテナ
//!   - 最初の要素追加時に、最大長分の領域をアロケータに一度だけ要求する
//!   - 以降はアロケータを呼び出さず、確保済みの領域内で要素の構築・破棄を行う
//! - [Allocator]トレイトを介して、標準のアロケータ([SystemAllocator])と
//!   [BlockAllocator]を差し替え可能
//! - [BlockAllocatorCell]を通して、`allocator_api2`に対応したコレクション(e.g., [OrderedMap])の
//!   背後にもブロックアロケータを置くことができる
//!
//! # モジュールの依存関係
//!
//! ```text
//! container => allocator
//! map => allocator(allocator_api2)
//! ```
//!
//! # 注意
//!
//! アロケータはスレッド間で共有されることを想定していない.
//! また、ブロックの伸長時には、それ以前に返したポインタが全て無効になる.
//!
//! [BlockAllocator]: ./allocator/struct.BlockAllocator.html
//! [BlockAllocatorCell]: ./allocator/struct.BlockAllocatorCell.html
//! [SystemAllocator]: ./allocator/struct.SystemAllocator.html
//! [Allocator]: ./allocator/trait.Allocator.html
//! [FixedCapacityVec]: ./container/struct.FixedCapacityVec.html
//! [OrderedMap]: ./map/struct.OrderedMap.html
#![warn(missing_docs)]
extern crate allocator_api2;
extern crate prometrics;
#[macro_use]
extern crate trackable;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};

pub mod allocator;
pub mod container;
pub mod map;
pub mod metrics;

mod error;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
