//! 试卷加载服务 - 业务能力层
//!
//! 只负责"把试卷拿回来"，暂时性错误按线性退避重试

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::ExamBackend;
use crate::config::Config;
use crate::error::{ApiError, SessionError};
use crate::models::ExamSession;
use crate::workflow::ExamCtx;

/// 加载失败
#[derive(Debug, Error)]
pub enum LoadFailure {
    /// 后端错误（已按策略重试）
    #[error("{0}")]
    Api(ApiError),
    /// 后端返回的试卷不可用
    #[error("{0}")]
    Invalid(SessionError),
}

impl LoadFailure {
    /// 调用方能否手动重新加载
    pub fn is_retryable(&self) -> bool {
        match self {
            LoadFailure::Api(e) => e.is_retryable(),
            LoadFailure::Invalid(_) => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            LoadFailure::Api(e) => e.user_message(),
            LoadFailure::Invalid(_) => "试卷数据异常，请联系管理员。".to_string(),
        }
    }
}

/// 试卷加载服务
///
/// 职责：
/// - 调用后端拉取试卷
/// - 5xx / 超时 / 网络错误最多额外重试 `max_retries` 次
/// - 4xx 立即返回
pub struct ExamLoader<B> {
    backend: Arc<B>,
    max_retries: u32,
    base_delay: Duration,
}

impl<B: ExamBackend> ExamLoader<B> {
    pub fn new(backend: Arc<B>, config: &Config) -> Self {
        Self {
            backend,
            max_retries: config.load_max_retries,
            base_delay: config.retry_base_delay(),
        }
    }

    /// 加载并校验试卷
    pub async fn load(&self, ctx: &ExamCtx) -> Result<ExamSession, LoadFailure> {
        let exam = self.fetch_with_retry(ctx).await.map_err(LoadFailure::Api)?;
        let exam = exam.validate().map_err(LoadFailure::Invalid)?;

        info!(
            "{} ✓ 试卷加载完成: {} 题, {} 分钟, 第 {} 次尝试 (剩余 {} 次)",
            ctx,
            exam.question_count(),
            exam.time_limit,
            exam.current_attempt,
            exam.remaining_attempts
        );
        Ok(exam)
    }

    async fn fetch_with_retry(&self, ctx: &ExamCtx) -> Result<ExamSession, ApiError> {
        let total_attempts = self.max_retries + 1;
        let mut attempt = 1;

        loop {
            match self.backend.fetch_exam(ctx).await {
                Ok(exam) => return Ok(exam),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= total_attempts => {
                    warn!("{} ❌ 加载试卷失败，已尝试 {} 次: {}", ctx, attempt, e);
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.base_delay * attempt;
                    warn!(
                        "{} 加载试卷失败 (尝试 {}/{}): {}，{:?} 后重试...",
                        ctx, attempt, total_attempts, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
