use std::time::Duration;

use thiserror::Error;

use crate::workflow::SessionPhase;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 后端 API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 考试会话状态错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 后端 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 400：当前用户不满足参加考试的条件
    #[error("无资格参加考试: {message}")]
    Ineligible { message: String },
    /// HTTP 404：考试不存在
    #[error("考试不存在: {message}")]
    NotFound { message: String },
    /// HTTP 401：登录已过期
    #[error("登录状态已过期")]
    AuthExpired,
    /// 其他 4xx 或 `success: false`
    #[error("请求被拒绝 ({endpoint}): status={status:?}, message={message}")]
    Rejected {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
    /// HTTP 5xx
    #[error("服务端错误 ({endpoint}): status={status}")]
    Server { endpoint: String, status: u16 },
    /// 请求超时
    #[error("请求超时: {endpoint}")]
    Timeout { endpoint: String },
    /// 网络层失败（连接被拒、DNS 等）
    #[error("网络请求失败 ({endpoint}): {source}")]
    Network {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 响应内容不符合预期
    #[error("API返回内容无效 ({endpoint}): {message}")]
    BadResponse { endpoint: String, message: String },
    /// 自动重试次数用尽
    #[error("已尝试 {attempts} 次仍失败: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ApiError>,
    },
}

/// 错误发生后界面应执行的跳转
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// 延迟后返回课程页
    BackToCourse { after: Duration },
    /// 跳转到登录
    Relogin,
}

impl ApiError {
    /// 是否属于暂时性错误（5xx / 超时 / 网络）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Server { .. }
                | ApiError::Timeout { .. }
                | ApiError::Network { .. }
                | ApiError::RetriesExhausted { .. }
        )
    }

    /// 展示给用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Ineligible { message } if !message.is_empty() => message.clone(),
            ApiError::Ineligible { .. } => "你暂时无法参加该考试，请先完成课程内容。".to_string(),
            ApiError::NotFound { .. } => "未找到该课程的结业考试。".to_string(),
            ApiError::AuthExpired => "登录已过期，请重新登录。".to_string(),
            ApiError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Rejected { .. } | ApiError::BadResponse { .. } => {
                "服务器返回了无法处理的结果，请稍后再试。".to_string()
            }
            ApiError::Server { .. } | ApiError::RetriesExhausted { .. } => {
                "服务器暂时不可用，请稍后重试。".to_string()
            }
            ApiError::Timeout { .. } | ApiError::Network { .. } => {
                "网络连接异常，请检查网络后重试。".to_string()
            }
        }
    }

    /// 只有资格 / 不存在 / 登录错误会触发自动跳转
    pub fn navigation(&self, redirect_delay: Duration) -> Option<Navigation> {
        match self {
            ApiError::Ineligible { .. } | ApiError::NotFound { .. } => {
                Some(Navigation::BackToCourse {
                    after: redirect_delay,
                })
            }
            ApiError::AuthExpired => Some(Navigation::Relogin),
            _ => None,
        }
    }
}

/// 考试会话状态错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("考试尚未开始")]
    NotStarted,
    #[error("考试已经开始")]
    AlreadyStarted,
    #[error("考试已结束")]
    AlreadyCompleted,
    #[error("题目 {question_id} 不属于本场考试")]
    UnknownQuestion { question_id: String },
    #[error("题目 {question_id} 没有第 {index} 个选项 (共 {len} 个)")]
    OptionOutOfRange {
        question_id: String,
        index: usize,
        len: usize,
    },
    #[error("题号 {index} 超出范围 [0, {max_index}]")]
    IndexOutOfRange { index: usize, max_index: usize },
    #[error("考试时间已到，不能再修改答案")]
    TimeExpired,
    #[error("当前状态 {phase:?} 不允许作答")]
    NotAcceptingAnswers { phase: SessionPhase },
    #[error("没有等待确认的提交")]
    NothingToConfirm,
    #[error("试卷数据无效: {reason}")]
    InvalidExam { reason: String },
    #[error("会话已关闭")]
    Closed,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {key} 无效: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("初始化 HTTP 客户端失败: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },
}

// ========== 便捷构造函数 ==========

impl ApiError {
    /// 根据 reqwest 错误区分超时与其他网络错误
    pub fn from_transport(endpoint: impl Into<String>, err: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if err.is_timeout() {
            ApiError::Timeout { endpoint }
        } else {
            ApiError::Network {
                endpoint,
                source: Box::new(err),
            }
        }
    }

    pub fn bad_response(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::BadResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
