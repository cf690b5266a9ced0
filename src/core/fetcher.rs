use futures::StreamExt;
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::events::{EventSink, JobEvent};
use crate::core::job::{ChunkHandle, ChunkOutcome, ChunkStatus};
use crate::core::retry::RetryPolicy;
use crate::core::store::BlockWriter;
use crate::core::transport::Transport;

/// 分块下载参数
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub block_size: usize,
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            block_size: 8192,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            block_size: config.block_size,
            retry: config.retry_policy(),
        }
    }
}

/// 下载单个分块到它自己的临时文件
///
/// 失败不会向上传播，而是体现在返回的 [`ChunkOutcome`] 里。
/// 每次尝试都会重新截断临时文件；最终失败时已写入的部分保留在磁盘上。
pub async fn fetch<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    handle: ChunkHandle,
    options: &FetchOptions,
    events: &EventSink,
) -> ChunkOutcome {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match fetch_once(transport, url, &handle, options, events).await {
            Ok(bytes) => {
                info!("[fetch] 分块 {} ({}) 完成, {} 字节", handle.index, handle.range, bytes);
                events.emit(JobEvent::ChunkFinished { index: handle.index, success: true, attempts: attempt });
                return ChunkOutcome { handle, attempts: attempt, status: ChunkStatus::Success { bytes } };
            }
            Err(e) if options.retry.should_retry(&e, attempt) => {
                let delay = options.retry.delay_for(attempt);
                warn!(
                    "[fetch] 分块 {} 第 {} 次尝试失败: {}，{} ms 后重试",
                    handle.index, attempt, e, delay.as_millis()
                );
                events.emit(JobEvent::ChunkRetry { index: handle.index, attempt });
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                let e = match e {
                    e @ DownloadError::StoreOpenFailed { .. } => e,
                    other => DownloadError::ChunkDownloadFailed { index: handle.index, reason: other.to_string() },
                };
                error!("[fetch] {} (共尝试 {} 次)", e, attempt);
                events.emit(JobEvent::ChunkFinished { index: handle.index, success: false, attempts: attempt });
                return ChunkOutcome {
                    handle,
                    attempts: attempt,
                    status: ChunkStatus::Failure { reason: e.to_string() },
                };
            }
        }
    }
}

async fn fetch_once<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    handle: &ChunkHandle,
    options: &FetchOptions,
    events: &EventSink,
) -> DownloadResult<u64> {
    let mut writer = BlockWriter::create(&handle.store, options.block_size)?;
    debug!("[fetch] 分块 {} 请求 Range {} -> {}", handle.index, handle.range, writer.path().display());

    let response = transport.fetch_range(url, handle.range).await?;
    if response.status != 206 {
        warn!("[fetch] 分块 {} 服务器返回 {} 而不是 206，可能忽略了 Range", handle.index, response.status);
    }

    let mut body = response.body;
    while let Some(piece) = body.next().await {
        match piece {
            Ok(bytes) => {
                writer.write(&bytes)?;
                events.emit(JobEvent::ChunkProgress { index: handle.index, bytes: bytes.len() as u64 });
            }
            Err(e) => {
                // 已收到的数据照常落盘
                if let Err(flush_err) = writer.finish() {
                    warn!("[fetch] 分块 {} 写出残余数据失败: {}", handle.index, flush_err);
                }
                return Err(e);
            }
        }
    }

    writer.finish()
}
