use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// 下载过程中可能出现的所有错误
///
/// 分两类：
/// - 致命错误（`SizeUnavailable`、`DestinationCreateFailed` 等）会中止整个任务
/// - 分块错误（`ChunkDownloadFailed`、`StoreOpenFailed`、`MergeStoreMissing`）
///   只记录日志，不影响其它分块和合并步骤
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("无法获取文件大小: {0}")]
    SizeUnavailable(String),

    #[error("分块 {index} 下载失败: {reason}")]
    ChunkDownloadFailed { index: usize, reason: String },

    #[error("无法打开分块文件 {}: {source}", .path.display())]
    StoreOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("分块 {index} 的临时文件缺失或不可读: {}", .path.display())]
    MergeStoreMissing { index: usize, path: PathBuf },

    #[error("无法创建目标文件 {}: {source}", .path.display())]
    DestinationCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("服务器返回错误状态码: {0}")]
    HttpStatus(u16),

    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("线程数必须大于0, 实际为 {0}")]
    InvalidWorkerCount(usize),

    #[error("配置错误: {0}")]
    Config(String),
}

impl DownloadError {
    /// 是否值得重试（网络抖动、5xx）
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::NetworkError(_) => true,
            DownloadError::HttpStatus(code) => *code >= 500 || *code == 408 || *code == 429,
            _ => false,
        }
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
