//! 考试会话流程 - 流程层
//!
//! 核心职责：定义"一场考试"的状态机
//!
//! ```text
//! NotStarted ──Start──▶ InProgress ──ManualSubmit(未答完)──▶ AwaitingConfirmation
//!                          │  ▲                                 │        │
//!                          │  └──────────CancelSubmit───────────┘        │
//!        ManualSubmit(答完) / Tick 归零                        ConfirmSubmit / Tick 归零
//!                          ▼                                             ▼
//!                     Submitting ◀───────────────────────────────────────┘
//!                      │      │
//!        SubmitResult(Err)  SubmitResult(Ok)
//!         (回到 InProgress)     ▼
//!                           Completed
//! ```
//!
//! 所有事件在同一个队列里串行处理，先到的事件决定走向，
//! 后到的"提交"自然落在 `Submitting` 状态上变成空操作。

use tracing::{debug, info, warn};

use crate::clients::SubmissionPayload;
use crate::error::{ApiError, SessionError};
use crate::models::{option_letter, AnswerRecord, ExamSession, Question, SubmissionResult};
use crate::services::countdown::{CountdownTimer, TickOutcome};

/// 提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// 用户点击提交
    Manual,
    /// 倒计时归零
    Auto,
}

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    /// 未答完时手动提交，等待用户确认
    AwaitingConfirmation,
    Submitting(SubmitMode),
    Completed,
}

/// 题目导航
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigate {
    Next,
    Previous,
    GoTo(usize),
    FirstUnanswered,
}

/// 输入事件
#[derive(Debug)]
pub enum Event {
    Start,
    Tick,
    Select {
        question_id: String,
        option_index: usize,
    },
    Navigate(Navigate),
    ManualSubmit,
    ConfirmSubmit,
    CancelSubmit,
    SubmitResult(Result<SubmissionResult, ApiError>),
}

/// 事件处理后的输出，由调用方执行或展示
#[derive(Debug)]
pub enum Effect {
    Started {
        remaining_secs: u64,
    },
    Ticked {
        remaining_secs: u64,
    },
    /// 剩余时间跌破提醒阈值（每场只出现一次）
    LowTime {
        remaining_secs: u64,
    },
    Moved {
        index: usize,
    },
    Answered {
        question_id: String,
        option_letter: char,
        answered: usize,
        total: usize,
    },
    ConfirmationRequired {
        answered: usize,
        total: usize,
    },
    /// 取消确认，继续作答
    Resumed,
    /// 需要把 payload 发给后端
    Submit {
        mode: SubmitMode,
        payload: SubmissionPayload,
    },
    AlreadySubmitting,
    SubmitFailed {
        mode: SubmitMode,
        error: ApiError,
        /// 时间已到时计时器无法再次触发，只能手动重试
        time_expired: bool,
    },
    Completed(SubmissionResult),
    Ignored,
}

/// 进度快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    pub phase: SessionPhase,
    pub answered: usize,
    pub total: usize,
    pub remaining_secs: u64,
    pub current_index: usize,
}

/// 考试会话流程
///
/// - 独占 AnswerRecord 与 CountdownTimer
/// - 不做任何 IO，只把事件翻译成 Effect
pub struct ExamFlow {
    course_id: String,
    exam: ExamSession,
    answers: AnswerRecord,
    timer: CountdownTimer,
    phase: SessionPhase,
    cursor: usize,
    low_time_secs: u64,
    low_time_warned: bool,
}

impl ExamFlow {
    /// 创建新的考试流程
    pub fn new(course_id: impl Into<String>, exam: ExamSession, low_time_secs: u64) -> Self {
        let timer = CountdownTimer::new(exam.time_limit_secs());
        Self {
            course_id: course_id.into(),
            exam,
            answers: AnswerRecord::new(),
            timer,
            phase: SessionPhase::NotStarted,
            cursor: 0,
            low_time_secs,
            low_time_warned: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn exam(&self) -> &ExamSession {
        &self.exam
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.exam.questions.get(self.cursor)
    }

    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            phase: self.phase,
            answered: self.answers.answered_count(),
            total: self.total(),
            remaining_secs: self.timer.remaining_secs(),
            current_index: self.cursor,
        }
    }

    fn total(&self) -> usize {
        self.exam.question_count()
    }

    /// 处理一个事件
    pub fn handle(&mut self, event: Event) -> Result<Effect, SessionError> {
        match event {
            Event::Start => self.on_start(),
            Event::Tick => Ok(self.on_tick()),
            Event::Select {
                question_id,
                option_index,
            } => self.on_select(&question_id, option_index),
            Event::Navigate(nav) => self.on_navigate(nav),
            Event::ManualSubmit => self.on_manual_submit(),
            Event::ConfirmSubmit => self.on_confirm(),
            Event::CancelSubmit => self.on_cancel(),
            Event::SubmitResult(result) => Ok(self.on_submit_result(result)),
        }
    }

    fn on_start(&mut self) -> Result<Effect, SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.timer.start();
        self.phase = SessionPhase::InProgress;
        info!(
            "[课程 {}] ⏱ 考试开始，限时 {} 分钟",
            self.course_id, self.exam.time_limit
        );
        Ok(Effect::Started {
            remaining_secs: self.timer.remaining_secs(),
        })
    }

    fn on_tick(&mut self) -> Effect {
        if matches!(self.phase, SessionPhase::NotStarted | SessionPhase::Completed) {
            return Effect::Ignored;
        }

        match self.timer.tick() {
            TickOutcome::Ignored => Effect::Ignored,
            TickOutcome::Remaining(remaining_secs) => {
                if !self.low_time_warned
                    && self.low_time_secs > 0
                    && remaining_secs <= self.low_time_secs
                {
                    self.low_time_warned = true;
                    warn!(
                        "[课程 {}] ⚠️ 剩余时间不足 {} 秒",
                        self.course_id, remaining_secs
                    );
                    Effect::LowTime { remaining_secs }
                } else {
                    Effect::Ticked { remaining_secs }
                }
            }
            TickOutcome::Expired => match self.phase {
                SessionPhase::InProgress | SessionPhase::AwaitingConfirmation => {
                    warn!(
                        "[课程 {}] ⏰ 考试时间到，自动提交 {}/{} 题",
                        self.course_id,
                        self.answers.answered_count(),
                        self.total()
                    );
                    self.begin_submission(SubmitMode::Auto)
                }
                _ => {
                    info!("[课程 {}] 时间到，但提交已在进行中", self.course_id);
                    Effect::Ignored
                }
            },
        }
    }

    fn on_select(&mut self, question_id: &str, option_index: usize) -> Result<Effect, SessionError> {
        match self.phase {
            SessionPhase::InProgress => {}
            SessionPhase::NotStarted => return Err(SessionError::NotStarted),
            SessionPhase::Completed => return Err(SessionError::AlreadyCompleted),
            phase => return Err(SessionError::NotAcceptingAnswers { phase }),
        }
        if self.timer.is_expired() {
            return Err(SessionError::TimeExpired);
        }

        let question = self
            .exam
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion {
                question_id: question_id.to_string(),
            })?;
        let out_of_range = || SessionError::OptionOutOfRange {
            question_id: question_id.to_string(),
            index: option_index,
            len: question.options.len(),
        };
        let text = question.option(option_index).ok_or_else(out_of_range)?;
        let letter = option_letter(option_index).ok_or_else(out_of_range)?;

        if let Some(previous) = self.answers.select_answer(question_id, text, letter) {
            debug!(
                "[课程 {}] 题目 {} 改选 {} → {}",
                self.course_id, question_id, previous.option_letter, letter
            );
        }

        Ok(Effect::Answered {
            question_id: question_id.to_string(),
            option_letter: letter,
            answered: self.answers.answered_count(),
            total: self.total(),
        })
    }

    fn on_navigate(&mut self, nav: Navigate) -> Result<Effect, SessionError> {
        match self.phase {
            SessionPhase::NotStarted => return Err(SessionError::NotStarted),
            SessionPhase::Completed => return Err(SessionError::AlreadyCompleted),
            _ => {}
        }

        let max_index = self.total().saturating_sub(1);
        self.cursor = match nav {
            Navigate::Next => (self.cursor + 1).min(max_index),
            Navigate::Previous => self.cursor.saturating_sub(1),
            Navigate::GoTo(index) if index <= max_index => index,
            Navigate::GoTo(index) => {
                return Err(SessionError::IndexOutOfRange { index, max_index });
            }
            Navigate::FirstUnanswered => self
                .answers
                .first_unanswered(&self.exam.questions)
                .unwrap_or(self.cursor),
        };

        Ok(Effect::Moved { index: self.cursor })
    }

    fn on_manual_submit(&mut self) -> Result<Effect, SessionError> {
        match self.phase {
            SessionPhase::NotStarted => Err(SessionError::NotStarted),
            SessionPhase::Completed => Err(SessionError::AlreadyCompleted),
            SessionPhase::Submitting(_) => {
                info!("[课程 {}] 正在提交中，忽略重复提交", self.course_id);
                Ok(Effect::AlreadySubmitting)
            }
            SessionPhase::AwaitingConfirmation => Ok(self.confirmation_required()),
            SessionPhase::InProgress => {
                if self.timer.is_expired() || self.answers.is_complete(self.total()) {
                    Ok(self.begin_submission(SubmitMode::Manual))
                } else {
                    self.phase = SessionPhase::AwaitingConfirmation;
                    Ok(self.confirmation_required())
                }
            }
        }
    }

    fn on_confirm(&mut self) -> Result<Effect, SessionError> {
        match self.phase {
            SessionPhase::AwaitingConfirmation => Ok(self.begin_submission(SubmitMode::Manual)),
            SessionPhase::Submitting(_) => Ok(Effect::AlreadySubmitting),
            SessionPhase::Completed => Err(SessionError::AlreadyCompleted),
            _ => Err(SessionError::NothingToConfirm),
        }
    }

    fn on_cancel(&mut self) -> Result<Effect, SessionError> {
        match self.phase {
            SessionPhase::AwaitingConfirmation => {
                self.phase = SessionPhase::InProgress;
                Ok(Effect::Resumed)
            }
            _ => Err(SessionError::NothingToConfirm),
        }
    }

    fn on_submit_result(&mut self, result: Result<SubmissionResult, ApiError>) -> Effect {
        let SessionPhase::Submitting(mode) = self.phase else {
            warn!("[课程 {}] 收到过期的提交结果，忽略", self.course_id);
            return Effect::Ignored;
        };

        match result {
            Ok(result) => {
                self.timer.halt();
                self.phase = SessionPhase::Completed;
                info!("[课程 {}] ✓ 提交成功: {}", self.course_id, result);
                Effect::Completed(result)
            }
            Err(error) => {
                // 答案与计时器保持不变，等待用户重试
                self.phase = SessionPhase::InProgress;
                warn!("[课程 {}] ⚠️ 提交失败 ({:?}): {}", self.course_id, mode, error);
                Effect::SubmitFailed {
                    mode,
                    error,
                    time_expired: self.timer.is_expired(),
                }
            }
        }
    }

    fn confirmation_required(&self) -> Effect {
        Effect::ConfirmationRequired {
            answered: self.answers.answered_count(),
            total: self.total(),
        }
    }

    fn begin_submission(&mut self, mode: SubmitMode) -> Effect {
        self.phase = SessionPhase::Submitting(mode);
        let payload = SubmissionPayload {
            course_id: self.course_id.clone(),
            answers: self.answers.to_payload_answers(),
        };
        info!(
            "[课程 {}] 📤 提交答案 ({:?})，已答 {}/{} 题",
            self.course_id,
            mode,
            payload.answers.len(),
            self.total()
        );
        Effect::Submit { mode, payload }
    }
}
