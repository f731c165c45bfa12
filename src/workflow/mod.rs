pub mod exam_ctx;
pub mod exam_flow;

pub use exam_ctx::{AuthToken, ExamCtx};
pub use exam_flow::{Effect, Event, ExamFlow, ExamProgress, Navigate, SessionPhase, SubmitMode};
