//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{ExamSession, SubmissionResult};
use crate::services::format_clock;
use crate::workflow::ExamCtx;

/// 初始化 tracing 输出
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认 info
///
/// # 参数
/// - `verbose`: 是否输出 debug 级别日志
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `ctx`: 考试会话上下文
/// - `config`: 当前生效的配置
pub fn log_startup(ctx: &ExamCtx, config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 结业考试 {}", ctx);
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📡 API: {}", config.api_base_url);
    info!("{}", "=".repeat(60));
}

/// 记录试卷加载信息
///
/// # 参数
/// - `exam`: 已校验的试卷，debug 级别下逐题输出截断后的题干
pub fn log_exam_loaded(exam: &ExamSession) {
    info!(
        "✓ 试卷 {}: {} 题 | 限时 {} | 及格线 {} | 第 {} 次尝试",
        exam.exam_id,
        exam.question_count(),
        format_clock(exam.time_limit_secs()),
        exam.passing_score,
        exam.current_attempt
    );
    for (i, question) in exam.questions.iter().enumerate() {
        debug!("  {}. [{}] {}", i + 1, question.id, truncate_text(&question.prompt, 40));
    }
}

/// 打印最终结果
///
/// # 参数
/// - `ctx`: 考试会话上下文
/// - `result`: 后端返回的判分结果
pub fn print_final_result(ctx: &ExamCtx, result: &SubmissionResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 考试结束 {}", ctx);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    if result.passed {
        info!("✅ {}", result);
    } else {
        info!("❌ {}", result);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数（按字符而非字节计）
///
/// # 返回
/// 超长时返回前 `max_len` 个字符加 `...`，否则返回原文
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
