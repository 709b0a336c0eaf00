use std::alloc::LayoutError;

use trackable::error::ErrorKindExt;

/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);
impl From<LayoutError> for Error {
    fn from(e: LayoutError) -> Self {
        // 要素数から算出したレイアウトが表現不能 = 要求サイズがアドレス空間を超えている
        ErrorKind::OutOfMemory.cause(e).into()
    }
}

/// 発生し得るエラーの種別.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// ブロックの確保ないし拡張に必要なメモリが得られなかった.
    ///
    /// 要求サイズの計算がオーバーフローした場合にも、このエラーが返される.
    ///
    /// アロケータ内で再試行が行われることはない.
    ///
    /// # 典型的な対応策
    ///
    /// - 呼び出し元で処理を中断する
    OutOfMemory,

    /// 固定容量のコンテナが既に満杯である.
    ///
    /// このエラーが返された場合でも、コンテナの状態は変更されていない.
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側で要素の追加を諦める
    CapacityExceeded,

    /// 範囲外のインデックスが指定された.
    ///
    /// このエラーが返された場合でも、コンテナの状態は変更されていない.
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正してインデックスを正しくする
    OutOfBounds,
}
impl trackable::error::ErrorKind for ErrorKind {}
