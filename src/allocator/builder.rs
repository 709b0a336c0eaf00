use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};

use crate::allocator::BlockAllocator;
use crate::metrics::BlockAllocatorMetrics;

/// `BlockAllocator`のビルダ.
///
/// ブロックの初期容量は、型パラメータ(`INITIAL`)として`finish`時に指定する.
#[derive(Debug, Clone)]
pub struct BlockAllocatorBuilder {
    pub(crate) metrics: MetricBuilder,
    pub(crate) logger: Logger,
}
impl BlockAllocatorBuilder {
    /// デフォルト設定で`BlockAllocatorBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        BlockAllocatorBuilder {
            metrics: MetricBuilder::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// アロケータ用の logger を登録する.
    ///
    /// デフォルトでは、ログは破棄される.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// 初期容量が`INITIAL`要素の`BlockAllocator`を生成する.
    ///
    /// ブロック自体は、最初の割当要求時に確保される.
    pub fn finish<T, const INITIAL: usize>(&self) -> BlockAllocator<T, INITIAL> {
        let metrics = BlockAllocatorMetrics::new(&self.metrics);
        BlockAllocator::with_parts(self.logger.clone(), metrics)
    }
}
impl Default for BlockAllocatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
