use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::job::{ByteRange, ChunkHandle};
use crate::core::store::copy_blocks;

/// 合并结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub bytes_written: u64,
    /// 所有分块都存在且长度正确
    pub complete: bool,
    /// 缺失或长度不符的分块范围
    pub missing_ranges: Vec<ByteRange>,
    /// 合并时被跳过的临时文件
    pub skipped_stores: Vec<PathBuf>,
}

/// 按分块编号顺序把所有临时文件拼接到 `destination`
///
/// 目标文件无法创建或写入时返回错误；单个临时文件缺失或不可读只记录
/// 日志并跳过，最终结果体现在 [`MergeReport`] 中。打开过的临时文件随即删除。
pub fn merge(destination: &Path, handles: &[ChunkHandle], block_size: usize) -> DownloadResult<MergeReport> {
    let file = File::create(destination)
        .map_err(|source| DownloadError::DestinationCreateFailed { path: destination.to_path_buf(), source })?;
    let mut output = BufWriter::with_capacity(block_size.max(1), file);

    let mut ordered: Vec<&ChunkHandle> = handles.iter().collect();
    ordered.sort_by_key(|h| h.index);

    let mut report = MergeReport {
        bytes_written: 0,
        complete: true,
        missing_ranges: Vec::new(),
        skipped_stores: Vec::new(),
    };

    for handle in ordered {
        let mut store = match File::open(&handle.store) {
            Ok(f) => f,
            Err(_) => {
                let e = DownloadError::MergeStoreMissing { index: handle.index, path: handle.store.clone() };
                warn!("[merge] {}，跳过", e);
                report.complete = false;
                report.missing_ranges.push(handle.range);
                report.skipped_stores.push(handle.store.clone());
                continue;
            }
        };

        append_store(&mut output, &mut store, handle, block_size, &mut report)?;
        drop(store);

        if let Err(e) = fs::remove_file(&handle.store) {
            warn!("[merge] 删除临时文件 {} 失败: {}", handle.store.display(), e);
        } else {
            debug!("[merge] 分块 {} 已合并并删除", handle.index);
        }
    }

    output.flush()?;
    info!(
        "[merge] {} 写入 {} 字节, 完整: {}",
        destination.display(),
        report.bytes_written,
        report.complete
    );
    Ok(report)
}

/// 把一个分块追加到目标文件
///
/// 读取中途失败时目标文件回退到该分块之前的长度，后续分块不会错位。
fn append_store<R: Read>(
    output: &mut BufWriter<File>,
    store: &mut R,
    handle: &ChunkHandle,
    block_size: usize,
    report: &mut MergeReport,
) -> DownloadResult<()> {
    match copy_store(store, output, block_size) {
        Ok(copied) => {
            report.bytes_written += copied;
            if copied != handle.range.len() {
                warn!(
                    "[merge] 分块 {} 长度不符: 预期 {} 字节, 实际 {} 字节",
                    handle.index,
                    handle.range.len(),
                    copied
                );
                report.complete = false;
                report.missing_ranges.push(handle.range);
            }
            Ok(())
        }
        Err(CopyError::Read(copied, e)) => {
            warn!("[merge] 读取分块 {} 失败: {}，丢弃已写入的 {} 字节", handle.index, e, copied);
            rollback(output, report.bytes_written)?;
            report.complete = false;
            report.missing_ranges.push(handle.range);
            report.skipped_stores.push(handle.store.clone());
            Ok(())
        }
        Err(CopyError::Write(e)) => {
            error!("[merge] 写入目标文件失败: {}", e);
            Err(DownloadError::IoError(e))
        }
    }
}

fn rollback(output: &mut BufWriter<File>, len: u64) -> std::io::Result<()> {
    output.flush()?;
    let file = output.get_mut();
    file.set_len(len)?;
    file.seek(SeekFrom::Start(len))?;
    Ok(())
}

enum CopyError {
    Read(u64, std::io::Error),
    Write(std::io::Error),
}

/// 区分读端和写端错误的块拷贝
fn copy_store<R: Read, W: Write>(store: &mut R, output: &mut W, block_size: usize) -> Result<u64, CopyError> {
    let mut tracker = WriteTracker { inner: output, written: 0, error: None };
    match copy_blocks(store, &mut tracker, block_size) {
        Ok(n) => Ok(n),
        Err(e) => match tracker.error.take() {
            Some(write_err) => Err(CopyError::Write(write_err)),
            None => Err(CopyError::Read(tracker.written, e)),
        },
    }
}

struct WriteTracker<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
    error: Option<std::io::Error>,
}

impl<W: Write> Write for WriteTracker<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.inner.write(buf) {
            Ok(n) => {
                self.written += n as u64;
                Ok(n)
            }
            Err(e) => {
                let kind = e.kind();
                self.error = Some(e);
                Err(std::io::Error::from(kind))
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
