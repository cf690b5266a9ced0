use std::collections::HashMap;

use actix::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::JobEvent;
use super::format_size;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";

/// 结束进度显示，发送时保证之前的事件都已处理
pub struct Finish;
impl Message for Finish { type Result = (); }

/// 把下载事件渲染成终端进度条
pub struct ProgressActor {
    bar: ProgressBar,
    per_chunk: HashMap<usize, u64>,
}

impl ProgressActor {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet { ProgressBar::hidden() } else { ProgressBar::new(0) };
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar, per_chunk: HashMap::new() }
    }

    /// 已计入进度的字节数
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Actor for ProgressActor {
    type Context = Context<Self>;
}

impl Handler<JobEvent> for ProgressActor {
    type Result = ();
    fn handle(&mut self, msg: JobEvent, _ctx: &mut Self::Context) {
        match msg {
            JobEvent::Probed { total_size } => {
                self.bar.set_length(total_size);
                self.bar.println(format!("文件大小: {} 字节 ({})", total_size, format_size(total_size)));
            }
            JobEvent::Planned { ranges } => {
                self.bar.println(format!("分成 {} 个分块并行下载", ranges.len()));
                self.bar.set_message("下载中");
            }
            JobEvent::ChunkProgress { index, bytes } => {
                *self.per_chunk.entry(index).or_insert(0) += bytes;
                self.bar.inc(bytes);
            }
            JobEvent::ChunkRetry { index, attempt } => {
                // 重试会重新写整个分块，撤回已计入的进度
                let counted = self.per_chunk.remove(&index).unwrap_or(0);
                self.bar.set_position(self.bar.position().saturating_sub(counted));
                self.bar.println(format!("分块 {} 第 {} 次尝试失败，正在重试", index, attempt));
            }
            JobEvent::ChunkFinished { index, success, attempts } => {
                if !success {
                    self.bar.println(format!("分块 {} 下载失败（共尝试 {} 次）", index, attempts));
                }
            }
            JobEvent::Merged { bytes_written, complete } => {
                let msg = if complete {
                    format!("合并完成 {}", format_size(bytes_written))
                } else {
                    format!("合并完成 {}（不完整）", format_size(bytes_written))
                };
                self.bar.finish_with_message(msg);
            }
        }
    }
}

impl Handler<Finish> for ProgressActor {
    type Result = ();
    fn handle(&mut self, _msg: Finish, _ctx: &mut Self::Context) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
