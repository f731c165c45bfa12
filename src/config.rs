use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 非文件来源的配置在错误信息中的标签
const INLINE_SOURCE: &str = "<inline>";

/// 程序配置
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 根地址（不含结尾的 `/`）
    pub api_base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 加载试卷时的额外重试次数
    pub load_max_retries: u32,
    /// 线性退避的基础间隔（秒），第 n 次重试等待 n × base
    pub retry_base_delay_secs: u64,
    /// 不可参加 / 不存在时跳回课程页前的等待（秒）
    pub redirect_delay_secs: u64,
    /// 剩余时间低于该值时提醒一次（秒），0 表示不提醒
    pub low_time_warning_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 12,
            load_max_retries: 2,
            retry_base_delay_secs: 2,
            redirect_delay_secs: 3,
            low_time_warning_secs: 60,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("EXAM_API_BASE_URL").unwrap_or(default.api_base_url),
            request_timeout_secs: std::env::var("EXAM_REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            load_max_retries: std::env::var("EXAM_LOAD_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.load_max_retries),
            retry_base_delay_secs: std::env::var("EXAM_RETRY_BASE_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_base_delay_secs),
            redirect_delay_secs: std::env::var("EXAM_REDIRECT_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.redirect_delay_secs),
            low_time_warning_secs: std::env::var("EXAM_LOW_TIME_WARNING_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.low_time_warning_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 从 TOML 文本解析配置，缺省字段使用默认值
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::TomlParseFailed {
            path: INLINE_SOURCE.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 优先读取 `EXAM_CONFIG` 指向的文件，否则使用环境变量
    pub fn load() -> AppResult<Self> {
        match std::env::var("EXAM_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path)),
            Err(_) => {
                let config = Self::from_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "api_base_url".to_string(),
                reason: "不能为空".to_string(),
            }
            .into());
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs".to_string(),
                reason: "必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_base_delay_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_secs(self.redirect_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml_str(
            r#"
            api_base_url = "https://lms.example.com/api"
            load_max_retries = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://lms.example.com/api");
        assert_eq!(config.load_max_retries, 4);
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.retry_base_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_toml_str("request_timeout_secs = 0").unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_bad_toml_reports_parse_error() {
        let err = Config::from_toml_str("load_max_retries = \"many\"").unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::TomlParseFailed { ref path, .. }) if path == "<inline>"
        ));
        assert!(err.to_string().contains("(<inline>)"));
    }
}
