//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `session_runner` - 会话执行器
//! - 加载试卷（含重试）
//! - 持有唯一的 ExamFlow，串行处理 tick / 命令 / 提交结果
//! - 把提交请求放到后台任务，结果回流成事件
//! - 通过 SessionUpdate 通知界面
//!
//! ### `app` - 终端考试应用
//! - 解析标准输入为 Command
//! - 渲染 SessionUpdate
//! - 输出最终结果
//!
//! ## 层次关系
//!
//! ```text
//! app (终端输入输出)
//!     ↓
//! session_runner (事件循环 + 副作用)
//!     ↓
//! workflow::ExamFlow (纯状态机)
//!     ↓
//! services (能力层：loader / countdown)
//!     ↓
//! clients → infrastructure (ApiExecutor)
//! ```

pub mod app;
pub mod session_runner;

pub use app::App;
pub use session_runner::{spawn_session, Command, SessionHandle, SessionOutcome, SessionUpdate};
