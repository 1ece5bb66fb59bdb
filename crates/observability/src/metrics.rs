//! 流水线指标收集模块
//!
//! 基于 SyncMeta 与跟踪结果收集同步/跟踪流水线的运行指标。

use contracts::{SyncMeta, TrackStatus};
use metrics::{counter, gauge, histogram};
use ringbuf::{traits::*, HeapRb};

/// 从 SyncMeta 记录指标
///
/// 每次产生 SyncedImageBatch 时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sync_metrics;
///
/// if let Some(batch) = synchronizer.add_message(stream, ts, image) {
///     record_sync_metrics(&batch.meta, batch.batch_id);
///     // ...
/// }
/// ```
pub fn record_sync_metrics(meta: &SyncMeta, batch_id: u64) {
    // 批计数器
    counter!("fusion_sync_batches_total").increment(1);

    // 批 ID (用于检测跳批)
    gauge!("fusion_sync_last_batch_id").set(batch_id as f64);

    // 丢帧计数
    if meta.dropped_count > 0 {
        counter!("fusion_sync_images_dropped_total").increment(meta.dropped_count as u64);
    }
    gauge!("fusion_sync_images_dropped_current").set(meta.dropped_count as f64);

    // 批内时间抖动 (纳秒 -> 毫秒)
    for jitter in &meta.jitter_ns {
        histogram!("fusion_sync_jitter_ms").record(*jitter as f64 / 1e6);
    }
}

/// 记录图像接收
pub fn record_image_received(stream: usize) {
    counter!(
        "fusion_images_received_total",
        "stream" => stream.to_string()
    )
    .increment(1);
}

/// 记录惯性采样接收
pub fn record_imu_received() {
    counter!("fusion_imu_received_total").increment(1);
}

/// 记录跟踪步结果
pub fn record_track_result(status: TrackStatus, execution_ms: f64) {
    let label = match status {
        TrackStatus::Ok => "ok",
        TrackStatus::Lost => "lost",
    };
    counter!("fusion_track_steps_total", "status" => label).increment(1);
    histogram!("fusion_track_execution_ms").record(execution_ms);
}

/// 记录异步操作完成
pub fn record_operation_resolved(operation: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fusion_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 流水线指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug)]
pub struct PipelineMetricsAggregator {
    /// 总批数
    pub total_batches: u64,

    /// 丢帧总数
    pub total_dropped: u64,

    /// 跟踪丢失次数
    pub total_lost: u64,

    /// 跟踪步耗时统计 (毫秒, 滑动窗口)
    pub execution_stats: RollingStats,

    /// 批内抖动统计 (毫秒, 滑动窗口)
    pub jitter_stats: RollingStats,
}

impl PipelineMetricsAggregator {
    /// 创建新的聚合器，`window` 为滑动窗口容量
    pub fn new(window: usize) -> Self {
        Self {
            total_batches: 0,
            total_dropped: 0,
            total_lost: 0,
            execution_stats: RollingStats::new(window),
            jitter_stats: RollingStats::new(window),
        }
    }

    /// 更新同步批统计
    pub fn update_batch(&mut self, meta: &SyncMeta) {
        self.total_batches += 1;
        self.total_dropped += meta.dropped_count as u64;
        for jitter in &meta.jitter_ns {
            self.jitter_stats.push(*jitter as f64 / 1e6);
        }
    }

    /// 更新跟踪步统计
    pub fn update_track(&mut self, status: TrackStatus, execution_ms: f64) {
        if status == TrackStatus::Lost {
            self.total_lost += 1;
        }
        self.execution_stats.push(execution_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_batches: self.total_batches,
            total_dropped: self.total_dropped,
            total_lost: self.total_lost,
            drop_rate: if self.total_batches > 0 {
                self.total_dropped as f64 / self.total_batches as f64 * 100.0
            } else {
                0.0
            },
            execution_ms: StatsSummary::from(&self.execution_stats),
            jitter_ms: StatsSummary::from(&self.jitter_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        let window = self.execution_stats.capacity();
        *self = Self::new(window);
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub total_batches: u64,
    pub total_dropped: u64,
    pub total_lost: u64,
    pub drop_rate: f64,
    pub execution_ms: StatsSummary,
    pub jitter_ms: StatsSummary,
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Metrics Summary ===")?;
        writeln!(f, "Total batches: {}", self.total_batches)?;
        writeln!(
            f,
            "Dropped images: {} ({:.2}%)",
            self.total_dropped, self.drop_rate
        )?;
        writeln!(f, "Tracking losses: {}", self.total_lost)?;
        writeln!(f, "Track execution (ms): {}", self.execution_ms)?;
        writeln!(f, "Batch jitter (ms): {}", self.jitter_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl From<&RollingStats> for StatsSummary {
    fn from(stats: &RollingStats) -> Self {
        Self {
            count: stats.len(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3} (n={})",
                self.min, self.max, self.mean, self.count
            )
        }
    }
}

/// 固定容量滑动窗口统计
///
/// 窗口满后最旧样本被淘汰，max/mean 始终针对当前窗口计算。
pub struct RollingStats {
    window: HeapRb<f64>,
}

impl std::fmt::Debug for RollingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingStats")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl RollingStats {
    /// 创建容量为 `capacity` 的窗口
    pub fn new(capacity: usize) -> Self {
        Self {
            window: HeapRb::new(capacity.max(1)),
        }
    }

    /// 添加新值，窗口满时淘汰最旧值
    pub fn push(&mut self, value: f64) {
        if self.window.is_full() {
            let _ = self.window.try_pop();
        }
        let _ = self.window.try_push(value);
    }

    /// 当前窗口样本数量
    pub fn len(&self) -> usize {
        self.window.occupied_len()
    }

    /// 窗口是否为空
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// 窗口容量
    pub fn capacity(&self) -> usize {
        self.window.capacity().get()
    }

    /// 窗口内均值
    pub fn mean(&self) -> f64 {
        let n = self.len();
        if n == 0 {
            0.0
        } else {
            self.window.iter().sum::<f64>() / n as f64
        }
    }

    /// 窗口内最大值
    pub fn max(&self) -> f64 {
        self.window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// 窗口内最小值
    pub fn min(&self) -> f64 {
        self.window.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_stats_window() {
        let mut stats = RollingStats::new(3);

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        assert_eq!(stats.len(), 3);
        assert!((stats.mean() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 3.0).abs() < 1e-10);

        // 窗口滑动：1.0 被淘汰
        stats.push(10.0);
        assert_eq!(stats.len(), 3);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert!((stats.max() - 10.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = PipelineMetricsAggregator::new(16);

        let meta = SyncMeta {
            dropped_count: 2,
            jitter_ns: vec![1_000_000, 3_000_000],
        };
        aggregator.update_batch(&meta);
        aggregator.update_track(TrackStatus::Lost, 12.5);

        assert_eq!(aggregator.total_batches, 1);
        assert_eq!(aggregator.total_dropped, 2);
        assert_eq!(aggregator.total_lost, 1);
        assert_eq!(aggregator.jitter_stats.len(), 2);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = PipelineMetricsAggregator::new(16);
        aggregator.update_batch(&SyncMeta {
            dropped_count: 1,
            jitter_ns: vec![2_000_000],
        });
        aggregator.update_track(TrackStatus::Ok, 8.0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total batches: 1"));
        assert!(output.contains("Dropped images: 1"));
    }
}
