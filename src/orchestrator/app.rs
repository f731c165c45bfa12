//! 终端考试应用 - 编排层
//!
//! 把标准输入翻译成 Command，把 SessionUpdate 渲染到终端

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::ExamClient;
use crate::config::Config;
use crate::error::Navigation;
use crate::models::{option_letter, ExamSession, Question};
use crate::orchestrator::session_runner::{spawn_session, Command, SessionOutcome, SessionUpdate};
use crate::services::format_clock;
use crate::utils::logging::{log_exam_loaded, log_startup, print_final_result};
use crate::workflow::{Effect, ExamCtx, ExamProgress, Navigate, SessionPhase, SubmitMode};

const HELP: &str = "命令: start | A-Z 作答 | next | prev | goto <题号> | unanswered | submit | yes | no | status | quit";

/// 用户输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Help,
}

/// 解析一行输入
///
/// 单个字母视为对当前题目作答，其余为命令
///
/// # 参数
/// - `line`: 标准输入的一行
/// - `current`: 当前显示的题目，考试开始前为 `None`
///
/// # 返回
/// 解析出的输入；无法识别时返回提示文本
pub fn parse_input(line: &str, current: Option<&Question>) -> Result<Input, String> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();

    let command = match head.as_str() {
        "" | "help" | "h" => return Ok(Input::Help),
        "status" => Command::Status,
        "start" => Command::Start,
        "next" => Command::Navigate(Navigate::Next),
        "prev" => Command::Navigate(Navigate::Previous),
        "unanswered" => Command::Navigate(Navigate::FirstUnanswered),
        "goto" => {
            let number: usize = parts
                .next()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| "用法: goto <题号>".to_string())?;
            Command::Navigate(Navigate::GoTo(number - 1))
        }
        "submit" => Command::Submit,
        "yes" => Command::Confirm,
        "no" => Command::Cancel,
        "quit" | "exit" => Command::Abort,
        letter if letter.len() == 1 && letter.as_bytes()[0].is_ascii_lowercase() => {
            let question = current.ok_or_else(|| "考试尚未开始".to_string())?;
            let option_index = usize::from(letter.as_bytes()[0] - b'a');
            Command::Select {
                question_id: question.id.clone(),
                option_index,
            }
        }
        other => return Err(format!("未知命令: {}", other)),
    };

    Ok(Input::Command(command))
}

/// 终端侧的只读视图
#[derive(Default)]
struct ExamView {
    exam: Option<ExamSession>,
    cursor: usize,
    selected: BTreeMap<String, char>,
    remaining_secs: u64,
}

impl ExamView {
    fn current_question(&self) -> Option<&Question> {
        self.exam.as_ref().and_then(|e| e.questions.get(self.cursor))
    }

    fn print_question(&self) {
        let (Some(exam), Some(question)) = (&self.exam, self.current_question()) else {
            return;
        };
        println!();
        println!("第 {}/{} 题  [剩余 {}]", self.cursor + 1, exam.question_count(), format_clock(self.remaining_secs));
        println!("{}", question.prompt);
        if let Some(desc) = &question.description {
            println!("  ({})", desc);
        }
        let chosen = self.selected.get(&question.id).copied();
        for (i, option) in question.options.iter().enumerate() {
            let letter = option_letter(i).unwrap_or('?');
            let mark = if chosen == Some(letter) { "●" } else { "○" };
            println!("  {} {}. {}", mark, letter, option);
        }
    }
}

fn print_progress(progress: &ExamProgress) {
    let phase = match progress.phase {
        SessionPhase::NotStarted => "未开始",
        SessionPhase::InProgress => "作答中",
        SessionPhase::AwaitingConfirmation => "等待确认",
        SessionPhase::Submitting(_) => "提交中",
        SessionPhase::Completed => "已完成",
    };
    println!(
        "{} | 已答 {}/{} 题 | 剩余 {} | 当前第 {} 题",
        phase,
        progress.answered,
        progress.total,
        format_clock(progress.remaining_secs),
        progress.current_index + 1
    );
}

/// 应用主结构
pub struct App {
    config: Config,
    ctx: ExamCtx,
    client: Arc<ExamClient>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, ctx: ExamCtx) -> Result<Self> {
        let client = Arc::new(ExamClient::new(&config)?);
        log_startup(&ctx, &config);
        Ok(Self { config, ctx, client })
    }

    /// 运行一场考试，直到提交完成、加载失败或用户退出
    pub async fn run(&self) -> Result<()> {
        let mut handle = spawn_session(self.client.clone(), self.ctx.clone(), &self.config);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut view = ExamView::default();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                update = handle.next_update() => match update {
                    Some(update) => self.render(&mut view, update).await,
                    None => break,
                },
                line = lines.next_line(), if stdin_open => {
                    let command = match line? {
                        Some(line) => match parse_input(&line, view.current_question()) {
                            Ok(Input::Command(command)) => command,
                            Ok(Input::Help) => {
                                println!("{}", HELP);
                                continue;
                            }
                            Err(msg) => {
                                println!("{}", msg);
                                continue;
                            }
                        },
                        None => {
                            stdin_open = false;
                            Command::Abort
                        }
                    };
                    if handle.send(command).is_err() {
                        break;
                    }
                }
            }
        }

        match handle.join().await {
            SessionOutcome::Completed(result) => print_final_result(&self.ctx, &result),
            SessionOutcome::LoadFailed(e) => warn!("{} 未能进入考试: {}", self.ctx, e),
            SessionOutcome::Aborted => info!("{} 已退出考试，本次作答未提交", self.ctx),
        }
        Ok(())
    }

    async fn render(&self, view: &mut ExamView, update: SessionUpdate) {
        match update {
            SessionUpdate::Loaded(exam) => {
                log_exam_loaded(&exam);
                println!(
                    "\n{} | 共 {} 题 | 限时 {} 分钟 | 剩余尝试 {} 次",
                    exam.exam_id,
                    exam.question_count(),
                    exam.time_limit,
                    exam.remaining_attempts
                );
                println!("输入 start 开始考试，开始后计时不可暂停。");
                view.remaining_secs = exam.time_limit_secs();
                view.exam = Some(exam);
            }
            SessionUpdate::LoadFailed {
                message,
                retryable,
                navigation,
            } => {
                println!("❌ {}", message);
                match navigation {
                    Some(Navigation::BackToCourse { after }) => {
                        sleep(after).await;
                        println!("↩ 返回课程页面");
                    }
                    Some(Navigation::Relogin) => println!("↩ 请重新登录"),
                    None if retryable => println!("请稍后重新运行以再次加载试卷"),
                    None => {}
                }
            }
            SessionUpdate::Progress(progress) => print_progress(&progress),
            SessionUpdate::Rejected(e) => println!("⚠️ {}", e),
            SessionUpdate::Flow(effect) => self.render_effect(view, effect),
        }
    }

    fn render_effect(&self, view: &mut ExamView, effect: Effect) {
        match effect {
            Effect::Started { remaining_secs } => {
                view.remaining_secs = remaining_secs;
                println!("⏱ 考试开始！{}", HELP);
                view.print_question();
            }
            Effect::Ticked { remaining_secs } => {
                view.remaining_secs = remaining_secs;
                if remaining_secs % 60 == 0 {
                    println!("⏱ 剩余 {}", format_clock(remaining_secs));
                }
            }
            Effect::LowTime { remaining_secs } => {
                view.remaining_secs = remaining_secs;
                println!("⚠️ 剩余时间不足 {}，请尽快提交", format_clock(remaining_secs));
            }
            Effect::Moved { index } => {
                view.cursor = index;
                view.print_question();
            }
            Effect::Answered {
                question_id,
                option_letter,
                answered,
                total,
            } => {
                view.selected.insert(question_id, option_letter);
                println!("✓ 已选 {} ({}/{})", option_letter, answered, total);
            }
            Effect::ConfirmationRequired { answered, total } => {
                println!("还有 {} 题未作答（已答 {}/{}），确认提交？yes / no", total - answered, answered, total);
            }
            Effect::Resumed => println!("继续作答"),
            Effect::Submit { mode, payload } => match mode {
                SubmitMode::Manual => println!("📤 正在提交 {} 道题的答案...", payload.answers.len()),
                SubmitMode::Auto => println!(
                    "⏰ 时间到，自动提交 {} 道题的答案...",
                    payload.answers.len()
                ),
            },
            Effect::AlreadySubmitting => println!("正在提交中，请稍候"),
            Effect::SubmitFailed {
                error,
                time_expired,
                ..
            } => {
                println!("❌ 提交失败: {}", error.user_message());
                if time_expired {
                    println!("考试时间已到，答案已保留，请输入 submit 重新提交");
                } else {
                    println!("答案已保留，可继续作答或输入 submit 重试");
                }
            }
            Effect::Completed(result) => {
                println!("\n🎓 {}", result);
            }
            Effect::Ignored => {}
        }
    }
}
