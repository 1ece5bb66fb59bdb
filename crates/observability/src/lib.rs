//! # Observability
//!
//! 融合流水线的可观测性：Tracing 初始化 + Prometheus 指标导出。
//!
//! ## 指标面
//!
//! - 同步批次：接收/丢弃计数、批内抖动直方图
//! - 跟踪步骤：状态计数、执行耗时
//! - 异步操作（存图/重定位）：完成状态
//! - [`RollingStats`]：固定容量滑动窗口（track 耗时等数值统计）
//!
//! ## 使用示例
//!
//! ```ignore
//! // 嵌入式场景：日志已由上层初始化，仅暴露指标端口
//! observability::init_metrics_only(9000)?;
//!
//! if let Some(batch) = synchronizer.add_message(stream, ts, image) {
//!     observability::record_sync_metrics(&batch.meta, batch.batch_id);
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_image_received, record_imu_received, record_operation_resolved, record_sync_metrics,
    record_track_result, PipelineMetricsAggregator, PipelineSummary, RollingStats, StatsSummary,
};

/// 默认日志过滤指令：流水线各 crate 走 info，其余依赖降噪
pub const DEFAULT_DIRECTIVES: &str = "info,sync_engine=info,node=info,tokio=warn";

/// 可观测性配置
///
/// 与 `sensor-fusion` CLI 暴露的面一致：日志格式、可选的指标端口、
/// 默认过滤指令（`RUST_LOG` 优先）。
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口（None = 不导出指标）
    pub metrics_port: Option<u16>,
    /// 无 `RUST_LOG` 时使用的过滤指令
    pub default_directives: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_directives: DEFAULT_DIRECTIVES.to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志（服务部署）
    #[default]
    Json,
    /// 人类可读格式（本地调试）
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 以默认配置初始化（JSON 日志 + 9000 端口指标）
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directives));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::info!(
        service = "sensor-fusion",
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅暴露 Prometheus 指标端口
///
/// 用于 Tracing 已由调用方初始化的场景（如 CLI 自带的日志配置）。
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}
