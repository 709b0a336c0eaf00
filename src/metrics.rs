//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};

/// `BlockAllocator`のメトリクス.
///
/// `rebind`で生成されたアロケータは、元のアロケータとカウンタ群を共有する.
/// ただし`capacity_elements`だけは、アロケータ毎に個別のゲージとなる.
#[derive(Debug, Clone)]
pub struct BlockAllocatorMetrics {
    builder: MetricBuilder,
    pub(crate) capacity_elements: Gauge,
    pub(crate) allocations: Counter,
    pub(crate) allocated_elements: Counter,
    pub(crate) deallocations: Counter,
    pub(crate) emplaced_elements: Counter,
    pub(crate) growths: Counter,
    pub(crate) relocated_bytes: Counter,
    pub(crate) oom_failures: Counter,
}
impl BlockAllocatorMetrics {
    /// 現在のブロックの容量(要素数).
    ///
    /// ブロックが未確保の場合には、確保予定の容量が設定されている.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_capacity_elements <GAUGE>
    /// ```
    pub fn capacity_elements(&self) -> u64 {
        self.capacity_elements.value() as u64
    }

    /// `allocate`の呼び出し回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_allocations_total <COUNTER>
    /// ```
    pub fn allocations(&self) -> u64 {
        self.allocations.value() as u64
    }

    /// これまでに割り当てた要素数の合計.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_allocated_elements_total <COUNTER>
    /// ```
    pub fn allocated_elements(&self) -> u64 {
        self.allocated_elements.value() as u64
    }

    /// `deallocate`の呼び出し回数.
    ///
    /// 解放された領域が再利用されることはないので、この値は使用量には影響しない.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_deallocations_total <COUNTER>
    /// ```
    pub fn deallocations(&self) -> u64 {
        self.deallocations.value() as u64
    }

    /// アロケータ自身が構築した(i.e., 破棄時にドロップする)要素の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_emplaced_elements_total <COUNTER>
    /// ```
    pub fn emplaced_elements(&self) -> u64 {
        self.emplaced_elements.value() as u64
    }

    /// ブロックの伸長(倍化)回数.
    ///
    /// 一回の`allocate`で複数回の倍化が行われた場合には、その回数分だけ加算される.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_growths_total <COUNTER>
    /// ```
    pub fn growths(&self) -> u64 {
        self.growths.value() as u64
    }

    /// 伸長時に新しいブロックへ再配置されたバイト数の合計.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_relocated_bytes_total <COUNTER>
    /// ```
    pub fn relocated_bytes(&self) -> u64 {
        self.relocated_bytes.value() as u64
    }

    /// メモリ不足によって失敗した割当の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// blockalloc_block_allocator_oom_failures_total <COUNTER>
    /// ```
    pub fn oom_failures(&self) -> u64 {
        self.oom_failures.value() as u64
    }

    pub(crate) fn new(builder: &MetricBuilder) -> Self {
        let mut builder = builder.clone();
        builder.namespace("blockalloc").subsystem("block_allocator");
        BlockAllocatorMetrics {
            capacity_elements: Self::capacity_gauge(&builder),
            allocations: builder
                .counter("allocations_total")
                .help("Number of allocate calls")
                .finish()
                .expect("Never fails"),
            allocated_elements: builder
                .counter("allocated_elements_total")
                .help("Number of allocated elements")
                .finish()
                .expect("Never fails"),
            deallocations: builder
                .counter("deallocations_total")
                .help("Number of deallocate calls")
                .finish()
                .expect("Never fails"),
            emplaced_elements: builder
                .counter("emplaced_elements_total")
                .help("Number of elements constructed by the allocator")
                .finish()
                .expect("Never fails"),
            growths: builder
                .counter("growths_total")
                .help("Number of block doublings")
                .finish()
                .expect("Never fails"),
            relocated_bytes: builder
                .counter("relocated_bytes_total")
                .help("Number of bytes copied into a grown block")
                .finish()
                .expect("Never fails"),
            oom_failures: builder
                .counter("oom_failures_total")
                .help("Number of allocation failures caused by memory exhaustion")
                .finish()
                .expect("Never fails"),
            builder,
        }
    }

    // カウンタ群は共有し、容量のゲージのみ新しく作り直す
    pub(crate) fn rebind(&self) -> Self {
        let mut this = self.clone();
        this.capacity_elements = Self::capacity_gauge(&self.builder);
        this
    }

    fn capacity_gauge(builder: &MetricBuilder) -> Gauge {
        builder
            .gauge("capacity_elements")
            .help("Capacity of the current block in elements")
            .finish()
            .expect("Never fails")
    }
}
