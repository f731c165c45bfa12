//! 考试会话上下文
//!
//! 封装"我在考哪门课、用谁的身份"这一信息

use std::fmt::{self, Display};

/// 登录凭证，Debug 输出时隐藏内容
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// 考试会话上下文
#[derive(Debug, Clone)]
pub struct ExamCtx {
    /// 课程ID
    pub course_id: String,
    /// 显式传入的登录凭证
    pub token: AuthToken,
}

impl ExamCtx {
    pub fn new(course_id: impl Into<String>, token: AuthToken) -> Self {
        Self {
            course_id: course_id.into(),
            token,
        }
    }
}

impl Display for ExamCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[课程 {}]", self.course_id)
    }
}
