pub mod answer;
pub mod question;

pub use answer::{option_letter, AnswerRecord, SelectedAnswer};
pub use question::{ExamEnvelope, ExamSession, Question, ResultEnvelope, SubmissionResult};
