//! 会话执行器 - 编排层
//!
//! ## 职责
//!
//! 1. **加载**：通过 ExamLoader 拉取试卷（含重试）
//! 2. **事件循环**：把秒级 tick、用户命令、提交结果串行送进 ExamFlow
//! 3. **执行副作用**：把 `Effect::Submit` 交给后台任务，结果作为事件回流
//! 4. **通知**：把每个 Effect 转成 SessionUpdate 推给界面
//!
//! 会话只在这个 task 里被修改，tick 与手动提交的先后由队列顺序决定。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, error, info};

use crate::clients::ExamBackend;
use crate::config::Config;
use crate::error::{ApiError, Navigation, SessionError};
use crate::models::{ExamSession, SubmissionResult};
use crate::services::{ExamLoader, LoadFailure};
use crate::workflow::{Effect, Event, ExamCtx, ExamFlow, ExamProgress, Navigate, SessionPhase};

/// 界面发给会话的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Select {
        question_id: String,
        option_index: usize,
    },
    Navigate(Navigate),
    Submit,
    Confirm,
    Cancel,
    /// 查询进度快照
    Status,
    /// 离开页面，直接销毁会话
    Abort,
}

/// 会话推给界面的通知
#[derive(Debug)]
pub enum SessionUpdate {
    Loaded(ExamSession),
    LoadFailed {
        message: String,
        retryable: bool,
        navigation: Option<Navigation>,
    },
    Flow(Effect),
    Progress(ExamProgress),
    Rejected(SessionError),
}

/// 会话最终结果
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(SubmissionResult),
    LoadFailed(LoadFailure),
    Aborted,
}

/// 会话句柄
///
/// 丢弃句柄等同于离开页面：命令通道关闭后会话自行结束
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    updates: mpsc::UnboundedReceiver<SessionUpdate>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// 下一条通知，会话结束后返回 `None`
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    /// 离开页面：中止并等待会话结束
    pub async fn abort(self) -> SessionOutcome {
        let _ = self.commands.send(Command::Abort);
        self.join().await
    }

    /// 释放命令通道并等待会话结束
    ///
    /// 已发送的命令仍会依次处理；之后未开始或等待重试的会话直接中止，
    /// 已发出的提交请求会等到结果返回
    pub async fn join(self) -> SessionOutcome {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("会话任务异常退出: {}", e);
                SessionOutcome::Aborted
            }
        }
    }
}

/// 启动一场考试会话
pub fn spawn_session<B: ExamBackend>(backend: Arc<B>, ctx: ExamCtx, config: &Config) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let config = config.clone();

    let task = tokio::spawn(run_session(backend, ctx, config, command_rx, update_tx));

    SessionHandle {
        commands: command_tx,
        updates: update_rx,
        task,
    }
}

/// 事件循环里一次唤醒的来源
enum Incoming {
    Tick,
    Command(Option<Command>),
    SubmitResult(Result<SubmissionResult, ApiError>),
}

async fn run_session<B: ExamBackend>(
    backend: Arc<B>,
    ctx: ExamCtx,
    config: Config,
    mut commands: mpsc::UnboundedReceiver<Command>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
) -> SessionOutcome {
    let loader = ExamLoader::new(backend.clone(), &config);
    // 加载期间收到的命令，加载完成后按顺序处理
    let mut queued = VecDeque::new();

    let loaded = {
        let load = loader.load(&ctx);
        tokio::pin!(load);
        loop {
            tokio::select! {
                result = &mut load => break result,
                command = commands.recv() => match command {
                    None | Some(Command::Abort) => {
                        info!("{} 试卷加载中离开，会话已中止", ctx);
                        return SessionOutcome::Aborted;
                    }
                    Some(command) => queued.push_back(command),
                },
            }
        }
    };

    let exam = match loaded {
        Ok(exam) => exam,
        Err(e) => {
            error!("{} ❌ 试卷加载失败: {}", ctx, e);
            let navigation = match &e {
                LoadFailure::Api(api) => api.navigation(config.redirect_delay()),
                LoadFailure::Invalid(_) => None,
            };
            let _ = updates.send(SessionUpdate::LoadFailed {
                message: e.user_message(),
                retryable: e.is_retryable(),
                navigation,
            });
            return SessionOutcome::LoadFailed(e);
        }
    };

    let _ = updates.send(SessionUpdate::Loaded(exam.clone()));
    let mut flow = ExamFlow::new(ctx.course_id.clone(), exam, config.low_time_warning_secs);

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<Result<SubmissionResult, ApiError>>();
    let mut ticker: Option<Interval> = None;
    let mut commands_open = true;

    loop {
        let incoming = match queued.pop_front() {
            Some(command) => Incoming::Command(Some(command)),
            None => tokio::select! {
                _ = next_tick(&mut ticker) => Incoming::Tick,
                command = commands.recv(), if commands_open => Incoming::Command(command),
                Some(result) = result_rx.recv() => Incoming::SubmitResult(result),
            },
        };

        let event = match incoming {
            Incoming::Tick => Event::Tick,
            Incoming::SubmitResult(result) => Event::SubmitResult(result),
            Incoming::Command(Some(Command::Status)) => {
                let _ = updates.send(SessionUpdate::Progress(flow.progress()));
                continue;
            }
            // 句柄已释放：只等待已发出的提交请求
            Incoming::Command(None) if matches!(flow.phase(), SessionPhase::Submitting(_)) => {
                debug!("{} 句柄已释放，等待提交结果", ctx);
                commands_open = false;
                continue;
            }
            Incoming::Command(command) => match command.and_then(command_to_event) {
                Some(event) => event,
                None => {
                    info!("{} 会话已中止，已答 {} 题", ctx, flow.answers().answered_count());
                    return SessionOutcome::Aborted;
                }
            },
        };

        match flow.handle(event) {
            Ok(Effect::Submit { mode, payload }) => {
                let backend = backend.clone();
                let ctx = ctx.clone();
                let result_tx = result_tx.clone();
                let request = payload.clone();
                tokio::spawn(async move {
                    let result = backend.submit_answers(&ctx, &request).await;
                    let _ = result_tx.send(result);
                });
                let _ = updates.send(SessionUpdate::Flow(Effect::Submit { mode, payload }));
            }
            Ok(Effect::Completed(result)) => {
                let _ = updates.send(SessionUpdate::Flow(Effect::Completed(result.clone())));
                return SessionOutcome::Completed(result);
            }
            Ok(Effect::Ignored) => {}
            Ok(effect) => {
                let _ = updates.send(SessionUpdate::Flow(effect));
            }
            Err(e) => {
                debug!("{} 命令被拒绝: {}", ctx, e);
                let _ = updates.send(SessionUpdate::Rejected(e));
            }
        }

        // 句柄已释放且提交失败，没有人能再重试
        if !commands_open && !matches!(flow.phase(), SessionPhase::Submitting(_)) {
            info!("{} 句柄已释放，提交未完成，会话结束", ctx);
            return SessionOutcome::Aborted;
        }

        // 计时器只在 Running 时需要 tick
        if flow.timer().is_running() {
            if ticker.is_none() {
                let period = Duration::from_secs(1);
                ticker = Some(interval_at(Instant::now() + period, period));
            }
        } else {
            ticker = None;
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// `Status` / `Abort` 不经过状态机，返回 `None`
fn command_to_event(command: Command) -> Option<Event> {
    let event = match command {
        Command::Start => Event::Start,
        Command::Select {
            question_id,
            option_index,
        } => Event::Select {
            question_id,
            option_index,
        },
        Command::Navigate(nav) => Event::Navigate(nav),
        Command::Submit => Event::ManualSubmit,
        Command::Confirm => Event::ConfirmSubmit,
        Command::Cancel => Event::CancelSubmit,
        Command::Status | Command::Abort => return None,
    };
    Some(event)
}
