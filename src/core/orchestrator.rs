use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use actix::Recipient;
use futures::future::join_all;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::DownloadResult;
use crate::core::events::{EventSink, JobEvent};
use crate::core::fetcher::{self, FetchOptions};
use crate::core::job::{ChunkHandle, ChunkOutcome, ChunkStatus, DownloadJob};
use crate::core::merger::{self, MergeReport};
use crate::core::planner;
use crate::core::probe;
use crate::core::transport::Transport;

/// 一次下载任务的最终报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub source: String,
    pub destination: PathBuf,
    pub total_size: u64,
    /// 截断后实际使用的线程数
    pub workers: usize,
    pub outcomes: Vec<ChunkOutcome>,
    pub merge: MergeReport,
    pub elapsed_ms: u64,
}

impl JobReport {
    pub fn is_complete(&self) -> bool {
        self.merge.complete
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// 驱动整个流程：探测 → 规划 → 并发下载 → 等待全部结束 → 合并
pub struct Orchestrator<T: Transport> {
    transport: Rc<T>,
    options: Rc<FetchOptions>,
    events: EventSink,
}

impl<T: Transport + 'static> Orchestrator<T> {
    pub fn new(transport: T, options: FetchOptions) -> Self {
        Self {
            transport: Rc::new(transport),
            options: Rc::new(options),
            events: EventSink::none(),
        }
    }

    /// 把流程事件转发给界面层
    pub fn with_events(mut self, recipient: Recipient<JobEvent>) -> Self {
        self.events = EventSink::new(recipient);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 执行下载任务
    ///
    /// 只有探测失败和目标文件写入失败会返回错误。分块失败不会中止任务，
    /// 合并照常进行，结果的完整性见 [`JobReport::is_complete`]。
    pub async fn run(&self, job: &DownloadJob) -> DownloadResult<JobReport> {
        let started = Instant::now();
        info!("[job {}] 开始下载 {} -> {}", job.id(), job.source(), job.destination().display());

        let total_size = probe::probe(&*self.transport, job.source()).await.map_err(|e| {
            error!("[job {}] {}", job.id(), e);
            e
        })?;
        info!("[job {}] 文件大小: {} 字节", job.id(), total_size);
        self.events.emit(JobEvent::Probed { total_size });

        let ranges = planner::plan(total_size, job.workers());
        if ranges.len() < job.workers() {
            warn!(
                "[job {}] 线程数 {} 大于文件字节数，实际使用 {} 个线程",
                job.id(),
                job.workers(),
                ranges.len()
            );
        }
        self.events.emit(JobEvent::Planned { ranges: ranges.clone() });

        let handles: Vec<ChunkHandle> = ranges
            .iter()
            .enumerate()
            .map(|(index, range)| ChunkHandle { index, range: *range, store: job.store_path(index) })
            .collect();

        // 每个范围一个任务，同时启动，全部结束后再合并
        let tasks: Vec<_> = handles
            .iter()
            .cloned()
            .map(|handle| {
                let transport = Rc::clone(&self.transport);
                let options = Rc::clone(&self.options);
                let events = self.events.clone();
                let url = job.source().to_string();
                actix_rt::spawn(async move { fetcher::fetch(&*transport, &url, handle, &options, &events).await })
            })
            .collect();

        let outcomes: Vec<ChunkOutcome> = join_all(tasks)
            .await
            .into_iter()
            .zip(handles.iter())
            .map(|(joined, handle)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("[job {}] 分块 {} 任务异常退出: {}", job.id(), handle.index, e);
                    ChunkOutcome {
                        handle: handle.clone(),
                        attempts: 0,
                        status: ChunkStatus::Failure { reason: format!("分块任务异常退出: {}", e) },
                    }
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed > 0 {
            warn!("[job {}] {} / {} 个分块下载失败，仍继续合并", job.id(), failed, outcomes.len());
        }

        let merge = merger::merge(job.destination(), &handles, self.options.block_size)?;
        self.events.emit(JobEvent::Merged { bytes_written: merge.bytes_written, complete: merge.complete });

        let report = JobReport {
            job_id: job.id(),
            source: job.source().to_string(),
            destination: job.destination().to_path_buf(),
            total_size,
            workers: handles.len(),
            outcomes,
            merge,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "[job {}] 结束, 耗时 {} ms, 完整: {}",
            job.id(),
            report.elapsed_ms,
            report.is_complete()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DownloadError;
    use crate::core::events::recorder::{EventRecorder, TakeEvents};
    use crate::core::job::ByteRange;
    use crate::core::retry::RetryPolicy;
    use crate::core::transport::mock::MockTransport;
    use actix::Actor;
    use std::path::Path;

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    fn options() -> FetchOptions {
        FetchOptions { block_size: 8, retry: RetryPolicy::single_attempt() }
    }

    fn leftover_parts(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".part"))
            .collect()
    }

    #[actix_rt::test]
    async fn test_round_trip_for_various_worker_counts() {
        let data = content(97);
        for workers in [1usize, 2, 5, 97] {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("file.bin");
            let job = DownloadJob::new("http://example.com/file.bin", &dest, workers).unwrap();
            let orchestrator = Orchestrator::new(MockTransport::new(data.clone()), options());

            let report = orchestrator.run(&job).await.unwrap();

            assert_eq!(std::fs::read(&dest).unwrap(), data, "workers = {}", workers);
            assert!(report.is_complete());
            assert_eq!(report.workers, workers);
            assert_eq!(orchestrator.transport().fetches.get(), workers);
            assert!(leftover_parts(dir.path()).is_empty());
        }
    }

    #[actix_rt::test]
    async fn test_single_failed_chunk_leaves_gap() {
        let data = content(100);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        let job = DownloadJob::new("http://example.com/file.bin", &dest, 4).unwrap();

        let mut transport = MockTransport::new(data.clone());
        transport.failing_starts.insert(25);
        let orchestrator = Orchestrator::new(transport, options());

        let report = orchestrator.run(&job).await.unwrap();

        let merged = std::fs::read(&dest).unwrap();
        assert_eq!(merged.len(), 75);
        assert_eq!(&merged[..25], &data[..25]);
        assert_eq!(&merged[25..], &data[50..]);

        assert!(!report.is_complete());
        assert_eq!(report.merge.missing_ranges, vec![ByteRange::new(25, 49)]);
        let failed: Vec<usize> = report.failed_chunks().map(|o| o.handle.index).collect();
        assert_eq!(failed, vec![1]);
        // 失败分块的空文件也被合并步骤消费掉
        assert!(leftover_parts(dir.path()).is_empty());
    }

    #[actix_rt::test]
    async fn test_probe_failure_starts_no_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        let job = DownloadJob::new("http://example.com/file.bin", &dest, 4).unwrap();

        let mut transport = MockTransport::new(content(10));
        transport.declared_length = None;
        let orchestrator = Orchestrator::new(transport, options());

        let err = orchestrator.run(&job).await.unwrap_err();

        assert!(matches!(err, DownloadError::SizeUnavailable(_)));
        assert_eq!(orchestrator.transport().fetches.get(), 0);
        assert!(!dest.exists());
    }

    #[actix_rt::test]
    async fn test_workers_clamped_to_total_size() {
        let data = content(3);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tiny.bin");
        let job = DownloadJob::new("http://example.com/tiny.bin", &dest, 16).unwrap();
        let orchestrator = Orchestrator::new(MockTransport::new(data.clone()), options());

        let report = orchestrator.run(&job).await.unwrap();

        assert_eq!(report.workers, 3);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[actix_rt::test]
    async fn test_events_are_emitted_in_stage_order() {
        let data = content(40);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        let job = DownloadJob::new("http://example.com/file.bin", &dest, 2).unwrap();

        let recorder = EventRecorder::default().start();
        let orchestrator = Orchestrator::new(MockTransport::new(data), options())
            .with_events(recorder.clone().recipient());
        orchestrator.run(&job).await.unwrap();

        let events = recorder.send(TakeEvents).await.unwrap();
        assert_eq!(events.first(), Some(&JobEvent::Probed { total_size: 40 }));
        assert!(matches!(events[1], JobEvent::Planned { ref ranges } if ranges.len() == 2));
        assert_eq!(events.last(), Some(&JobEvent::Merged { bytes_written: 40, complete: true }));

        let progressed: u64 = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::ChunkProgress { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .sum();
        assert_eq!(progressed, 40);
        let finished = events.iter().filter(|e| matches!(e, JobEvent::ChunkFinished { success: true, .. })).count();
        assert_eq!(finished, 2);
    }

    #[actix_rt::test]
    async fn test_report_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        let job = DownloadJob::new("http://example.com/file.bin", &dest, 2).unwrap();
        let orchestrator = Orchestrator::new(MockTransport::new(content(20)), options());

        let report = orchestrator.run(&job).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["total_size"], 20);
        assert_eq!(json["merge"]["complete"], true);
        assert_eq!(json["outcomes"][1]["status"], "success");
    }
}
