//! 作答记录
//!
//! 只记录"哪道题选了什么"，不关心计时和提交

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::question::Question;

/// 单道题的选择
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedAnswer {
    /// 选项原文（提交给后端的值）
    pub option_text: String,
    /// 规范化后的选项字母 A/B/C/D...
    pub option_letter: char,
}

/// 把选项下标转换成字母，超过 26 个选项时返回 `None`
pub fn option_letter(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i))
}

/// 作答记录：题目 ID → 选择
///
/// 答案可以修改但不能撤销
#[derive(Debug, Clone, Default)]
pub struct AnswerRecord {
    entries: BTreeMap<String, SelectedAnswer>,
}

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入（或覆盖）一道题的答案，返回被覆盖的旧答案
    pub fn select_answer(
        &mut self,
        question_id: impl Into<String>,
        option_text: impl Into<String>,
        option_letter: char,
    ) -> Option<SelectedAnswer> {
        self.entries.insert(
            question_id.into(),
            SelectedAnswer {
                option_text: option_text.into(),
                option_letter: option_letter.to_ascii_uppercase(),
            },
        )
    }

    pub fn answered_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_complete(&self, total_questions: usize) -> bool {
        self.answered_count() == total_questions
    }

    /// 第一道未作答题目的下标
    pub fn first_unanswered(&self, ordered_questions: &[Question]) -> Option<usize> {
        ordered_questions
            .iter()
            .position(|q| !self.entries.contains_key(&q.id))
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&SelectedAnswer> {
        self.entries.get(question_id)
    }

    /// 提交用的 `{questionId: optionText}`，未作答的题目不出现
    pub fn to_payload_answers(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(id, answer)| (id.clone(), answer.option_text.clone()))
            .collect()
    }
}
