//! CLI: 命令行接口和参数解析模块
//!
//! ## 用法
//!
//! - 基本下载：`partdown <url> <output> [workers]`
//! - 指定配置：`partdown -c partdown.toml <url> <output>`
//! - 生成配置：`partdown --write-config`
//! - 输出 JSON 报告：`partdown --json <url> <output>`
//!
//! ## 默认配置文件位置
//!
//! - Windows: `%APPDATA%/partdown/partdown.toml`
//! - macOS: `~/Library/Application Support/partdown/partdown.toml`
//! - Linux: `~/.config/partdown/partdown.toml`

use clap::Parser;
use std::env;
use std::path::Path;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::core::job::DownloadJob;
use crate::utils::validator;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/partdown/partdown.toml", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/partdown/partdown.toml", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/partdown/partdown.toml", home)
    }
}

/// partdown 命令行参数
///
/// 示例用法：
///   partdown https://example.com/file.iso file.iso 8
///   partdown --attempts 1 https://example.com/file.iso file.iso
#[derive(Parser, Debug, Clone)]
#[command(
    name = "partdown",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("VERGEN_BUILD_DATE"), ")"),
    about = "按字节范围并行下载单个文件",
    long_about = "先用 HEAD 请求获取文件大小，再把文件切成若干连续的字节范围，\n每个范围一个任务并发下载到 <OUTPUT>.part<i>，全部结束后按顺序合并。\n\n示例：\n  partdown https://example.com/file.iso file.iso 8\n  partdown --write-config\n"
)]
pub struct Args {
    /// 要下载的URL
    #[arg(required_unless_present = "write_config")]
    pub url: Option<String>,

    /// 保存路径
    #[arg(required_unless_present = "write_config")]
    pub output: Option<String>,

    /// 并发线程数，默认取配置文件中的 default_workers
    pub workers: Option<usize>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path())]
    pub config: String,

    /// 把当前配置（含注释说明）写入配置文件后退出
    #[arg(long)]
    pub write_config: bool,

    /// 每个分块最多尝试次数，覆盖配置文件
    #[arg(long)]
    pub attempts: Option<u32>,

    /// 读写缓冲块大小（字节），覆盖配置文件
    #[arg(long)]
    pub block_size: Option<usize>,

    /// 日志文件路径，覆盖配置文件
    #[arg(long)]
    pub log_file: Option<String>,

    /// 输出调试日志
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// 不显示进度条
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// 结束后以 JSON 输出下载报告
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// 解析命令行参数并加载、合并、校验配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, Config), DownloadError> {
        let mut config = Config::load(&args.config)?;
        config.merge_from_args(&args);
        config.validate()?;
        Ok((args, config))
    }

    /// 实际使用的线程数：命令行优先，其次是配置文件
    pub fn worker_count(&self, config: &Config) -> usize {
        self.workers.unwrap_or(config.default_workers)
    }

    /// 根据参数创建下载任务
    pub fn to_job(&self, config: &Config) -> anyhow::Result<DownloadJob> {
        let url = self.url.as_deref().ok_or_else(|| anyhow::anyhow!("未提供URL"))?;
        let output = self.output.as_deref().ok_or_else(|| anyhow::anyhow!("未提供保存路径"))?;

        let workers = self.worker_count(config);
        validator::validate_worker_count(workers)?;
        validator::validate_output_path(output)?;
        if let Some(parent) = Path::new(output).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!("保存目录不存在: {}", parent.display());
            }
        }

        Ok(DownloadJob::new(url, output, workers)?)
    }
}
