pub mod exam_client;

pub use exam_client::{classify_status, ExamBackend, ExamClient, SubmissionPayload};
