/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::donation::BatchResult;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug 或 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 评论捐赠分析");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📊 最大并发数: {}", config.max_workers);
    info!(
        "⏱️ 单条时限: {}ms / 批次时限: {}ms",
        config.item_timeout_ms, config.batch_timeout_ms
    );
    info!("💱 基准币种: {}", config.base_currency);
    info!("{}", "=".repeat(60));
}

/// 记录评论加载信息
pub fn log_comments_loaded(total: usize, batch_size: usize, max_workers: usize) {
    info!("✓ 找到 {} 条待处理的评论", total);
    info!("📋 将以每批 {} 条、{} 个 worker 的方式处理", batch_size, max_workers);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次完成信息
pub fn log_batch_complete(batch: &BatchResult, total_batches: usize) {
    let first = batch.items.first().map_or(0, |i| i.position + 1);
    let last = batch.items.last().map_or(0, |i| i.position + 1);
    info!(
        "📦 第 {}/{} 批完成 (评论 {}-{}): 成功 {}，超时 {}，失败 {}，耗时 {:.2}s{}",
        batch.batch_index + 1,
        total_batches,
        first,
        last,
        batch.succeeded(),
        batch.timed_out(),
        batch.errored(),
        batch.elapsed.as_secs_f64(),
        if batch.deadline_exceeded { " ⏱️ 批次超时" } else { "" }
    );
}

/// 记录累计进度
pub fn log_progress(processed: usize, elapsed: Duration) {
    info!(
        "已处理 {} 条评论... ({:.1} 条/秒)",
        processed,
        processing_rate(processed, elapsed)
    );
}

/// 记录处理结束信息
pub fn log_processing_finished(processed: usize, elapsed: Duration) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 共处理 {} 条评论，耗时 {:.1} 秒",
        processed,
        elapsed.as_secs_f64()
    );
    info!(
        "平均处理速度: {:.1} 条/秒",
        processing_rate(processed, elapsed)
    );
    info!("{}", "─".repeat(60));
}

/// 每秒处理条数
pub fn processing_rate(processed: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        processed as f64 / secs
    } else {
        0.0
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
