//! 日志初始化与批处理的横幅输出

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则默认 `info`（详细模式下为 `debug`）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `total`: 请求总数
/// - `max_concurrent`: 最大并发单元数
/// - `model_name`: 使用的模型
pub fn log_startup(total: usize, max_concurrent: usize, model_name: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目生成流水线");
    info!("📋 请求总数: {}", total);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("🤖 模型: {}", model_name);
    info!("{}", "=".repeat(60));
}

/// 记录套题开始处理
pub fn log_set_start(set_id: &str, codes: &[u8]) {
    info!("\n{}", "─".repeat(60));
    info!("📦 开始处理套题 {} (题型: {:?})", set_id, codes);
    info!("{}", "─".repeat(60));
}

/// 批处理结束时的汇总；`sets_failed` 为整体校验未通过的套题数
pub fn print_final_stats(success: usize, failed: usize, sets_failed: usize, results_dir: &str) {
    let total = success + failed;
    info!("\n{}", "=".repeat(60));
    info!(
        "📊 处理结束 ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 成功 {} / 共 {}", success, total);
    info!("❌ 失败 {}", failed);
    if sets_failed > 0 {
        info!("⚠️ 套题校验未通过: {}", sets_failed);
    }
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", results_dir);
}

/// 按字符数截断，用于日志
pub fn truncate_text(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
