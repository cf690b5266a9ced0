use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{DownloadError, DownloadResult};
use crate::utils::validator;

/// 一次下载任务的描述，创建后不可修改
#[derive(Debug, Clone)]
pub struct DownloadJob {
    id: Uuid,
    source: String,
    destination: PathBuf,
    workers: usize,
}

impl DownloadJob {
    /// 校验参数并创建任务
    pub fn new(source: impl Into<String>, destination: impl Into<PathBuf>, workers: usize) -> DownloadResult<Self> {
        let source = source.into();
        if !validator::is_valid_url(&source) {
            return Err(DownloadError::InvalidUrl(source));
        }
        if workers == 0 {
            return Err(DownloadError::InvalidWorkerCount(workers));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            source,
            destination: destination.into(),
            workers,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 第 `index` 个分块的临时文件路径：`<destination>.part<index>`
    pub fn store_path(&self, index: usize) -> PathBuf {
        let mut name = self.destination.clone().into_os_string();
        name.push(format!(".part{}", index));
        PathBuf::from(name)
    }
}

/// 闭区间字节范围 `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "invalid range {}-{}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// 发送给服务器的 Range 头，例如 `bytes=0-1023`
    ///
    /// 范围本身记作 `start-end`（见 `Display`），但请求头总是带上 `bytes=`
    /// 单位前缀，与 curl 对同一范围字符串实际发出的内容一致。
    pub fn header_value(&self) -> String {
        format!("bytes={}", self)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// 一个工作单元：分块编号、字节范围和它独占的临时文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHandle {
    pub index: usize,
    pub range: ByteRange,
    pub store: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkStatus {
    Success { bytes: u64 },
    Failure { reason: String },
}

/// 单个分块的下载结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOutcome {
    pub handle: ChunkHandle,
    pub attempts: u32,
    #[serde(flatten)]
    pub status: ChunkStatus,
}

impl ChunkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ChunkStatus::Success { .. })
    }
}
