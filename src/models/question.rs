use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// 单道考题，加载后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(alias = "_id", alias = "questionId")]
    pub id: String,
    #[serde(alias = "question", alias = "questionText")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(rename = "type", default = "default_question_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_question_type() -> String {
    "multiple-choice".to_string()
}

impl Question {
    /// 获取第 `index` 个选项文本
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }
}

/// 一次考试尝试的只读数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    #[serde(alias = "_id")]
    pub exam_id: String,
    /// 时间限制（分钟）
    pub time_limit: u32,
    #[serde(default)]
    pub passing_score: u32,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(default = "first_attempt")]
    pub current_attempt: u32,
    #[serde(default)]
    pub remaining_attempts: u32,
    pub questions: Vec<Question>,
}

fn first_attempt() -> u32 {
    1
}

impl ExamSession {
    /// 倒计时初始秒数
    pub fn time_limit_secs(&self) -> u64 {
        u64::from(self.time_limit) * 60
    }

    /// 题目总数，以题目列表为准
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// 校验加载到的试卷
    ///
    /// `totalQuestions` 与题目列表不一致时以列表为准并修正
    pub fn validate(mut self) -> Result<Self, SessionError> {
        if self.questions.is_empty() {
            return Err(SessionError::InvalidExam {
                reason: "题目列表为空".to_string(),
            });
        }
        if self.time_limit == 0 {
            return Err(SessionError::InvalidExam {
                reason: "时间限制必须大于 0".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(SessionError::InvalidExam {
                    reason: format!("题目 ID 重复: {}", question.id),
                });
            }
            if question.options.len() < 2 {
                return Err(SessionError::InvalidExam {
                    reason: format!("题目 {} 的选项少于 2 个", question.id),
                });
            }
        }

        if self.total_questions != self.questions.len() {
            tracing::warn!(
                "试卷 {} 声明 {} 道题，实际收到 {} 道，以实际为准",
                self.exam_id,
                self.total_questions,
                self.questions.len()
            );
            self.total_questions = self.questions.len();
        }

        Ok(self)
    }
}

/// 判分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub passed: bool,
    pub score: f64,
    #[serde(default)]
    pub correct_answers: u32,
}

impl std::fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | 得分: {:.1} | 答对: {} 题",
            if self.passed { "通过" } else { "未通过" },
            self.score,
            self.correct_answers
        )
    }
}

/// `GET /courses/exams/final/{courseId}` 的响应体
#[derive(Debug, Deserialize)]
pub struct ExamEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub exam: Option<ExamSession>,
}

/// `POST /courses/exams/validate/final` 的响应体
#[derive(Debug, Deserialize)]
pub struct ResultEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub result: Option<SubmissionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "exam": {
                "examId": "exam-1",
                "timeLimit": 30,
                "passingScore": 70,
                "totalQuestions": 2,
                "currentAttempt": 1,
                "remainingAttempts": 2,
                "questions": [
                    { "_id": "q1", "question": "2 + 2 = ?", "options": ["3", "4"], "type": "mcq" },
                    { "questionId": "q2", "questionText": "Rust 的包管理器?", "options": ["cargo", "pip"],
                      "description": "单选" }
                ]
            }
        })
    }

    #[test]
    fn test_parse_exam_envelope_with_aliases() {
        let envelope: ExamEnvelope = serde_json::from_value(sample_json()).unwrap();
        assert!(envelope.success);

        let exam = envelope.exam.unwrap().validate().unwrap();
        assert_eq!(exam.time_limit_secs(), 1800);
        assert_eq!(exam.questions[0].id, "q1");
        assert_eq!(exam.questions[1].prompt, "Rust 的包管理器?");
        assert_eq!(exam.questions[1].kind, "multiple-choice");
        assert_eq!(exam.questions[1].description.as_deref(), Some("单选"));
    }

    #[test]
    fn test_validate_fixes_total_questions() {
        let mut value = sample_json();
        value["exam"]["totalQuestions"] = serde_json::json!(5);
        let envelope: ExamEnvelope = serde_json::from_value(value).unwrap();

        let exam = envelope.exam.unwrap().validate().unwrap();
        assert_eq!(exam.total_questions, 2);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut value = sample_json();
        value["exam"]["questions"][1]["questionId"] = serde_json::json!("q1");
        let envelope: ExamEnvelope = serde_json::from_value(value).unwrap();

        let err = envelope.exam.unwrap().validate().unwrap_err();
        assert!(matches!(err, SessionError::InvalidExam { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_time_limit() {
        let mut value = sample_json();
        value["exam"]["timeLimit"] = serde_json::json!(0);
        let envelope: ExamEnvelope = serde_json::from_value(value).unwrap();

        assert!(envelope.exam.unwrap().validate().is_err());
    }
}
