use anyhow::{Context, Result};
use exam_session::utils::logging;
use exam_session::{App, AuthToken, Config, ExamCtx};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let course_id = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("EXAM_COURSE_ID").ok())
        .context("用法: exam-session <course_id>（或设置 EXAM_COURSE_ID）")?;
    let token = std::env::var("EXAM_AUTH_TOKEN").context("缺少登录凭证 EXAM_AUTH_TOKEN")?;

    let ctx = ExamCtx::new(course_id, AuthToken::new(token));

    // 初始化并运行应用
    App::initialize(config, ctx)?.run().await?;

    Ok(())
}
