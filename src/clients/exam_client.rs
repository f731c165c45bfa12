//! 考试 API 客户端
//!
//! 封装所有与考试后端相关的调用逻辑

use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::infrastructure::{ApiExecutor, ApiResponse};
use crate::models::{ExamEnvelope, ExamSession, ResultEnvelope, SubmissionResult};
use crate::workflow::ExamCtx;

const VALIDATE_FINAL_PATH: &str = "courses/exams/validate/final";

/// 提交请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub course_id: String,
    pub answers: BTreeMap<String, String>,
}

/// 考试后端能力
///
/// 会话层只依赖这个 trait，测试时替换成假后端
pub trait ExamBackend: Send + Sync + 'static {
    /// 拉取结业考试（单次，不重试）
    fn fetch_exam(&self, ctx: &ExamCtx)
        -> impl Future<Output = Result<ExamSession, ApiError>> + Send;

    /// 提交答案并取回判分结果
    fn submit_answers(
        &self,
        ctx: &ExamCtx,
        payload: &SubmissionPayload,
    ) -> impl Future<Output = Result<SubmissionResult, ApiError>> + Send;
}

/// 考试 API 客户端
pub struct ExamClient {
    executor: ApiExecutor,
}

impl ExamClient {
    /// 创建新的考试客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            executor: ApiExecutor::new(config)?,
        })
    }

    fn final_exam_path(course_id: &str) -> String {
        format!("courses/exams/final/{}", course_id)
    }
}

impl ExamBackend for ExamClient {
    async fn fetch_exam(&self, ctx: &ExamCtx) -> Result<ExamSession, ApiError> {
        let path = Self::final_exam_path(&ctx.course_id);
        let response = self.executor.get_json(&path, ctx.token.as_str()).await?;

        if let Some(err) = classify_status(&path, &response) {
            return Err(err);
        }

        let envelope: ExamEnvelope = serde_json::from_value(response.body)
            .map_err(|e| ApiError::bad_response(&path, format!("JSON解析失败: {}", e)))?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                endpoint: path,
                status: Some(response.status),
                message: envelope.message.unwrap_or_default(),
            });
        }

        let exam = envelope
            .exam
            .ok_or_else(|| ApiError::bad_response(&path, "缺少 exam 字段"))?;

        debug!("{} 获取到试卷 {}，共 {} 题", ctx, exam.exam_id, exam.questions.len());
        Ok(exam)
    }

    async fn submit_answers(
        &self,
        ctx: &ExamCtx,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionResult, ApiError> {
        debug!("{} 提交 Payload: {} 道题", ctx, payload.answers.len());

        let response = self
            .executor
            .post_json(VALIDATE_FINAL_PATH, ctx.token.as_str(), payload)
            .await?;

        if let Some(err) = classify_status(VALIDATE_FINAL_PATH, &response) {
            return Err(err);
        }

        let envelope: ResultEnvelope = serde_json::from_value(response.body).map_err(|e| {
            ApiError::bad_response(VALIDATE_FINAL_PATH, format!("JSON解析失败: {}", e))
        })?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                endpoint: VALIDATE_FINAL_PATH.to_string(),
                status: Some(response.status),
                message: envelope.message.unwrap_or_default(),
            });
        }

        envelope
            .result
            .ok_or_else(|| ApiError::bad_response(VALIDATE_FINAL_PATH, "缺少 result 字段"))
    }
}

/// 根据 HTTP 状态码把响应归类为错误，2xx 返回 `None`
pub fn classify_status(endpoint: &str, response: &ApiResponse) -> Option<ApiError> {
    if response.is_success() {
        return None;
    }

    let message = response.message().unwrap_or_default().to_string();
    let err = match response.status {
        400 => ApiError::Ineligible { message },
        401 => ApiError::AuthExpired,
        404 => ApiError::NotFound { message },
        408 | 504 => ApiError::Timeout {
            endpoint: endpoint.to_string(),
        },
        status if status >= 500 => ApiError::Server {
            endpoint: endpoint.to_string(),
            status,
        },
        status => ApiError::Rejected {
            endpoint: endpoint.to_string(),
            status: Some(status),
            message,
        },
    };

    warn!("⚠️ {} 返回 {}: {}", endpoint, response.status, err);
    Some(err)
}
