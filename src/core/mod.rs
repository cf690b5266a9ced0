//! Core: 探测文件大小、规划分块、并发下载、按序合并

pub mod error;
pub mod events;
pub mod fetcher;
pub mod job;
pub mod merger;
pub mod orchestrator;
pub mod planner;
pub mod probe;
pub mod retry;
pub mod store;
pub mod transport;

// 只导出主流程和其它模块实际用到的类型
pub use error::{DownloadError, DownloadResult};
pub use events::JobEvent;
pub use fetcher::FetchOptions;
pub use job::{ByteRange, ChunkHandle, ChunkOutcome, ChunkStatus, DownloadJob};
pub use merger::MergeReport;
pub use orchestrator::{JobReport, Orchestrator};
pub use retry::RetryPolicy;
pub use transport::{AwcTransport, Transport};
