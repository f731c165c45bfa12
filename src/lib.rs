//! # Exam Session
//!
//! 结业考试会话客户端：加载试卷、倒计时、作答、提交（手动或超时自动）
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 连接池），只暴露能力
//! - `ApiExecutor` - 唯一的 reqwest::Client owner，提供 get_json / post_json
//!
//! ### ② 客户端与业务能力层（Clients / Services）
//! - `clients/` - `ExamBackend` trait 与 `ExamClient` 实现
//! - `ExamLoader` - 拉取试卷，暂时性错误线性退避重试
//! - `CountdownTimer` - 倒计时，归零只报告一次
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一场考试"的状态机
//! - `ExamCtx` - 上下文封装（course_id + 显式凭证）
//! - `ExamFlow` - 事件 → Effect，保证最多提交一次
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session_runner` - 单 task 事件循环，执行副作用
//! - `orchestrator/app` - 终端交互
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ExamBackend, ExamClient, SubmissionPayload};
pub use config::Config;
pub use error::{ApiError, AppError, AppResult, SessionError};
pub use models::{AnswerRecord, ExamSession, Question, SubmissionResult};
pub use orchestrator::{spawn_session, App, Command, SessionHandle, SessionOutcome, SessionUpdate};
pub use workflow::{AuthToken, Effect, Event, ExamCtx, ExamFlow, SessionPhase, SubmitMode};
