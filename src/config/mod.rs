use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use log::LevelFilter;
use crate::core::error::DownloadError;
use crate::core::retry::RetryPolicy;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 默认线程数（命令行未指定时使用）
    pub default_workers: usize,
    /// 读写缓冲块大小（字节）
    pub block_size: usize,
    /// User-Agent
    pub user_agent: String,
    /// 最多跟随的重定向次数
    pub max_redirects: u8,
    /// 每个分块最多尝试次数，1 表示失败不重试
    pub max_attempts: u32,
    /// 第一次重试前的等待时间（毫秒）
    pub retry_delay_ms: u64,
    /// 重试等待时间上限（毫秒）
    pub retry_max_delay_ms: u64,
    /// 日志级别: error / warn / info / debug / trace
    pub log_level: String,
    /// 日志文件路径，不设置则输出到 stderr
    pub log_file: Option<String>,
    /// 日志文件轮转阈值（字节）
    pub log_max_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_workers: 4,
            block_size: 8192,
            user_agent: concat!("partdown/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
            max_attempts: 3,
            retry_delay_ms: 500,
            retry_max_delay_ms: 10_000,
            log_level: "info".to_string(),
            log_file: None,
            log_max_size: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 加载配置文件，文件不存在时返回默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if !Path::new(path).exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DownloadError::Config(format!("配置文件格式错误 {}: {}", path, e)))
    }

    /// 保存带注释说明的配置文件
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    fn generate_tutorial_content() -> String {
        r#"# partdown 配置文件
# ====================
#
# TOML 格式。命令行参数优先于配置文件，配置文件优先于默认值。
#
# default_workers     未在命令行指定线程数时使用的线程数
# block_size          读写缓冲块大小（字节），建议 4096-65536
# user_agent          请求使用的 User-Agent
# max_redirects       最多跟随的重定向次数
# max_attempts        每个分块最多尝试次数，1 表示失败后不重试
# retry_delay_ms      第一次重试前的等待时间，之后按指数退避
# retry_max_delay_ms  单次重试等待时间上限
# log_level           error / warn / info / debug / trace，可被 RUST_LOG 覆盖
# log_file            日志文件路径，注释掉则输出到终端
# log_max_size        日志文件超过该大小（字节）后轮转为 .backup
#
# 示例：
#   partdown https://example.com/file.iso file.iso 8
#   partdown -c ./partdown.toml https://example.com/file.iso file.iso
"#
        .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.default_workers == 0 {
            return Err(DownloadError::Config("线程数必须大于0".to_string()));
        }
        if self.block_size == 0 {
            return Err(DownloadError::Config("缓冲块大小必须大于0".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(DownloadError::Config("尝试次数必须大于0".to_string()));
        }
        if self.retry_max_delay_ms < self.retry_delay_ms {
            return Err(DownloadError::Config("最大重试延迟不能小于重试延迟".to_string()));
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(DownloadError::Config(format!("未知的日志级别: {}", self.log_level)));
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(attempts) = args.attempts {
            self.max_attempts = attempts;
        }
        if let Some(block_size) = args.block_size {
            self.block_size = block_size;
        }
        if let Some(log_file) = &args.log_file {
            self.log_file = Some(log_file.clone());
        }
        if args.verbose {
            self.log_level = "debug".to_string();
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            ..RetryPolicy::default()
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 默认线程数: {}\n\
            - 缓冲块大小: {} 字节\n\
            - 最大尝试次数: {}\n\
            - 重试延迟: {} ms (上限 {} ms)\n\
            - 最大重定向: {}\n\
            - 日志: {} ({})",
            self.default_workers,
            self.block_size,
            self.max_attempts,
            self.retry_delay_ms,
            self.retry_max_delay_ms,
            self.max_redirects,
            self.log_file.as_deref().unwrap_or("stderr"),
            self.log_level,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_workers, 4);
        assert_eq!(config.block_size, 8192);
        assert_eq!(config.max_attempts, 3);
        assert!(config.log_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.retry_delay_ms = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/partdown.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.max_attempts = 7;
        config.log_file = Some("logs/partdown.log".to_string());
        config.save_with_tutorial(path).expect("保存配置失败");

        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# partdown 配置文件"));

        let loaded = Config::load(path).expect("加载配置失败");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "block_size = 4096\n").unwrap();

        let loaded = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.block_size, 4096);
        assert_eq!(loaded.default_workers, 4);
    }

    #[test]
    fn test_missing_config_is_default() {
        let loaded = Config::load("/definitely/not/here/partdown.toml").unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "block_size = \"big\"\n").unwrap();
        assert!(matches!(Config::load(path.to_str().unwrap()), Err(DownloadError::Config(_))));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config { max_attempts: 5, retry_delay_ms: 100, retry_max_delay_ms: 400, ..Config::default() };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_config_summary() {
        let summary = Config::default().get_summary();
        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("stderr"));
    }
}
