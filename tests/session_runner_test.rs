use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use exam_session::error::Navigation;
use exam_session::workflow::Navigate;
use exam_session::{
    spawn_session, ApiError, AuthToken, Command, Config, Effect, ExamBackend, ExamCtx,
    ExamSession, Question, SessionHandle, SessionOutcome, SessionPhase, SessionUpdate,
    SubmissionPayload, SubmissionResult, SubmitMode,
};

/// 按脚本返回结果的假后端，记录所有提交
struct FakeBackend {
    exams: Mutex<VecDeque<Result<ExamSession, ApiError>>>,
    results: Mutex<VecDeque<Result<SubmissionResult, ApiError>>>,
    submissions: Mutex<Vec<SubmissionPayload>>,
    fetches: Mutex<u32>,
    submit_delay: Duration,
}

impl FakeBackend {
    fn new(
        exams: Vec<Result<ExamSession, ApiError>>,
        results: Vec<Result<SubmissionResult, ApiError>>,
    ) -> Self {
        Self {
            exams: Mutex::new(exams.into()),
            results: Mutex::new(results.into()),
            submissions: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            submit_delay: Duration::ZERO,
        }
    }

    fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    fn submissions(&self) -> Vec<SubmissionPayload> {
        self.submissions.lock().unwrap().clone()
    }

    fn fetches(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }
}

impl ExamBackend for FakeBackend {
    async fn fetch_exam(&self, _ctx: &ExamCtx) -> Result<ExamSession, ApiError> {
        *self.fetches.lock().unwrap() += 1;
        self.exams.lock().unwrap().pop_front().expect("没有更多试卷脚本")
    }

    async fn submit_answers(
        &self,
        _ctx: &ExamCtx,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionResult, ApiError> {
        self.submissions.lock().unwrap().push(payload.clone());
        tokio::time::sleep(self.submit_delay).await;
        self.results.lock().unwrap().pop_front().expect("没有更多提交脚本")
    }
}

fn exam(n: usize, minutes: u32) -> ExamSession {
    ExamSession {
        exam_id: "final-1".into(),
        time_limit: minutes,
        passing_score: 70,
        total_questions: n,
        current_attempt: 1,
        remaining_attempts: 2,
        questions: (1..=n)
            .map(|i| Question {
                id: format!("Q{}", i),
                prompt: format!("题目 {}", i),
                options: vec![format!("answer{}", i), "错误1".into(), "错误2".into(), "错误3".into()],
                kind: "mcq".into(),
                description: None,
            })
            .collect(),
    }
}

fn result(passed: bool) -> SubmissionResult {
    SubmissionResult {
        passed,
        score: if passed { 100.0 } else { 33.3 },
        correct_answers: if passed { 3 } else { 1 },
    }
}

fn ctx() -> ExamCtx {
    ExamCtx::new("course-42", AuthToken::new("token"))
}

fn select(id: &str) -> Command {
    Command::Select {
        question_id: id.to_string(),
        option_index: 0,
    }
}

async fn wait_for(handle: &mut SessionHandle, pred: impl Fn(&SessionUpdate) -> bool) -> SessionUpdate {
    loop {
        let update = handle.next_update().await.expect("会话提前结束");
        if pred(&update) {
            return update;
        }
    }
}

async fn collect_until_closed(handle: &mut SessionHandle) -> Vec<SessionUpdate> {
    let mut updates = Vec::new();
    while let Some(update) = handle.next_update().await {
        updates.push(update);
    }
    updates
}

#[tokio::test(start_paused = true)]
async fn test_timer_expiry_auto_submits_partial_answers() {
    let backend = Arc::new(FakeBackend::new(vec![Ok(exam(3, 1))], vec![Ok(result(false))]));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    handle.send(Command::Start).unwrap();
    handle.send(select("Q1")).unwrap();

    let updates = collect_until_closed(&mut handle).await;
    assert!(updates
        .iter()
        .any(|u| matches!(u, SessionUpdate::Flow(Effect::Submit { mode: SubmitMode::Auto, .. }))));

    match handle.join().await {
        SessionOutcome::Completed(r) => assert!(!r.passed),
        other => panic!("应当完成提交: {:?}", other),
    }

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].course_id, "course-42");
    assert_eq!(submissions[0].answers.len(), 1);
    assert_eq!(submissions[0].answers["Q1"], "answer1");
}

#[tokio::test(start_paused = true)]
async fn test_repeated_manual_submit_posts_once() {
    let backend = Arc::new(
        FakeBackend::new(vec![Ok(exam(2, 30))], vec![Ok(result(true))])
            .with_submit_delay(Duration::from_secs(5)),
    );
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    for command in [Command::Start, select("Q1"), select("Q2"), Command::Submit, Command::Submit, Command::Submit] {
        handle.send(command).unwrap();
    }

    let updates = collect_until_closed(&mut handle).await;
    let already = updates
        .iter()
        .filter(|u| matches!(u, SessionUpdate::Flow(Effect::AlreadySubmitting)))
        .count();
    assert_eq!(already, 2);

    assert!(matches!(handle.join().await, SessionOutcome::Completed(ref r) if r.passed));
    assert_eq!(backend.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_cancel_then_confirm() {
    let backend = Arc::new(FakeBackend::new(vec![Ok(exam(3, 30))], vec![Ok(result(false))]));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    for command in [Command::Start, select("Q1"), select("Q2"), Command::Submit] {
        handle.send(command).unwrap();
    }

    let update = wait_for(&mut handle, |u| {
        matches!(u, SessionUpdate::Flow(Effect::ConfirmationRequired { .. }))
    })
    .await;
    assert!(matches!(
        update,
        SessionUpdate::Flow(Effect::ConfirmationRequired { answered: 2, total: 3 })
    ));

    handle.send(Command::Cancel).unwrap();
    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Flow(Effect::Resumed))).await;
    assert!(backend.submissions().is_empty());

    handle.send(Command::Submit).unwrap();
    handle.send(Command::Confirm).unwrap();

    assert!(matches!(handle.join().await, SessionOutcome::Completed(_)));
    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].answers.len(), 2);
    assert!(!submissions[0].answers.contains_key("Q3"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_submit_keeps_answers_and_retry_succeeds() {
    let backend = Arc::new(FakeBackend::new(
        vec![Ok(exam(1, 30))],
        vec![
            Err(ApiError::Server {
                endpoint: "courses/exams/validate/final".into(),
                status: 503,
            }),
            Ok(result(true)),
        ],
    ));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    for command in [Command::Start, select("Q1"), Command::Submit] {
        handle.send(command).unwrap();
    }

    let update = wait_for(&mut handle, |u| matches!(u, SessionUpdate::Flow(Effect::SubmitFailed { .. }))).await;
    let SessionUpdate::Flow(Effect::SubmitFailed { error, time_expired, .. }) = update else {
        unreachable!();
    };
    assert!(error.is_retryable());
    assert!(!time_expired);

    handle.send(Command::Navigate(Navigate::GoTo(0))).unwrap();
    handle.send(Command::Submit).unwrap();

    assert!(matches!(handle.join().await, SessionOutcome::Completed(_)));
    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0], submissions[1]);
}

#[tokio::test(start_paused = true)]
async fn test_load_recovers_from_two_bad_gateways() {
    let bad_gateway = || ApiError::Server {
        endpoint: "courses/exams/final/course-42".into(),
        status: 502,
    };
    let backend = Arc::new(FakeBackend::new(
        vec![Err(bad_gateway()), Err(bad_gateway()), Ok(exam(3, 30))],
        vec![],
    ));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    let first = handle.next_update().await.unwrap();
    assert!(matches!(first, SessionUpdate::Loaded(ref e) if e.question_count() == 3));
    assert_eq!(backend.fetches(), 3);

    assert!(matches!(handle.abort().await, SessionOutcome::Aborted));
    assert!(backend.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abort_during_load_backoff_stops_retrying() {
    let bad_gateway = || ApiError::Server {
        endpoint: "courses/exams/final/course-42".into(),
        status: 502,
    };
    let backend = Arc::new(FakeBackend::new(
        vec![Err(bad_gateway()), Err(bad_gateway()), Err(bad_gateway())],
        vec![],
    ));
    let handle = spawn_session(backend.clone(), ctx(), &Config::default());

    // 第二次拉取在 2s 时失败，随后进入 4s 退避
    let started = tokio::time::Instant::now();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(matches!(handle.abort().await, SessionOutcome::Aborted));
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(backend.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_join_ends_unstarted_session() {
    let backend = Arc::new(FakeBackend::new(vec![Ok(exam(3, 30))], vec![]));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;

    let outcome = tokio::time::timeout(Duration::from_secs(3600), handle.join()).await;
    assert!(matches!(outcome, Ok(SessionOutcome::Aborted)));
    assert!(backend.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_join_ends_session_after_failed_auto_submit() {
    let backend = Arc::new(FakeBackend::new(
        vec![Ok(exam(2, 1))],
        vec![Err(ApiError::Timeout {
            endpoint: "courses/exams/validate/final".into(),
        })],
    ));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    handle.send(Command::Start).unwrap();
    handle.send(select("Q1")).unwrap();
    wait_for(&mut handle, |u| {
        matches!(u, SessionUpdate::Flow(Effect::SubmitFailed { time_expired: true, .. }))
    })
    .await;

    let outcome = tokio::time::timeout(Duration::from_secs(3600), handle.join()).await;
    assert!(matches!(outcome, Ok(SessionOutcome::Aborted)));
    assert_eq!(backend.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_join_waits_for_in_flight_submission() {
    let backend = Arc::new(
        FakeBackend::new(vec![Ok(exam(1, 30))], vec![Ok(result(true))])
            .with_submit_delay(Duration::from_secs(5)),
    );
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    for command in [Command::Start, select("Q1"), Command::Submit] {
        handle.send(command).unwrap();
    }

    assert!(matches!(handle.join().await, SessionOutcome::Completed(ref r) if r.passed));
    assert_eq!(backend.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auth_expired_is_terminal() {
    let backend = Arc::new(FakeBackend::new(vec![Err(ApiError::AuthExpired)], vec![]));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    match handle.next_update().await.unwrap() {
        SessionUpdate::LoadFailed {
            retryable,
            navigation,
            ..
        } => {
            assert!(!retryable);
            assert_eq!(navigation, Some(Navigation::Relogin));
        }
        other => panic!("应当加载失败: {:?}", other),
    }

    assert!(matches!(handle.join().await, SessionOutcome::LoadFailed(_)));
    assert_eq!(backend.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_progress_snapshot() {
    let backend = Arc::new(FakeBackend::new(vec![Ok(exam(3, 30))], vec![]));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    for command in [Command::Start, select("Q1"), Command::Navigate(Navigate::Next), Command::Status] {
        handle.send(command).unwrap();
    }

    let update = wait_for(&mut handle, |u| matches!(u, SessionUpdate::Progress(_))).await;
    let SessionUpdate::Progress(progress) = update else {
        unreachable!();
    };
    assert_eq!(progress.phase, SessionPhase::InProgress);
    assert_eq!(progress.answered, 1);
    assert_eq!(progress.total, 3);
    assert_eq!(progress.current_index, 1);
    assert!(progress.remaining_secs <= 1800);

    assert!(matches!(handle.abort().await, SessionOutcome::Aborted));
}

#[tokio::test(start_paused = true)]
async fn test_abort_discards_session_without_submitting() {
    let backend = Arc::new(FakeBackend::new(vec![Ok(exam(3, 30))], vec![]));
    let mut handle = spawn_session(backend.clone(), ctx(), &Config::default());

    wait_for(&mut handle, |u| matches!(u, SessionUpdate::Loaded(_))).await;
    handle.send(Command::Start).unwrap();
    handle.send(select("Q1")).unwrap();

    assert!(matches!(handle.abort().await, SessionOutcome::Aborted));
    assert!(backend.submissions().is_empty());
}
