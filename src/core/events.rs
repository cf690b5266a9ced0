use actix::prelude::*;

use crate::core::job::ByteRange;

/// 下载流程中发给界面层的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// 拿到了文件总大小
    Probed { total_size: u64 },
    /// 完成分块规划
    Planned { ranges: Vec<ByteRange> },
    /// 某个分块写入了一批字节
    ChunkProgress { index: usize, bytes: u64 },
    /// 某个分块失败后准备重试，之前计入的字节作废
    ChunkRetry { index: usize, attempt: u32 },
    /// 某个分块结束（无论成功失败）
    ChunkFinished { index: usize, success: bool, attempts: u32 },
    /// 合并完成
    Merged { bytes_written: u64, complete: bool },
}

impl Message for JobEvent {
    type Result = ();
}

/// 可选的事件接收者，没有接收者时事件直接丢弃
#[derive(Clone, Default)]
pub struct EventSink {
    recipient: Option<Recipient<JobEvent>>,
}

impl EventSink {
    pub fn new(recipient: Recipient<JobEvent>) -> Self {
        Self { recipient: Some(recipient) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: JobEvent) {
        if let Some(recipient) = &self.recipient {
            recipient.do_send(event);
        }
    }
}
