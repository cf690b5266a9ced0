use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::core::error::DownloadError;

/// 分块临时文件的写入端
///
/// 数据先攒进固定大小的缓冲块，块满了再一次性写盘。
/// 被 drop 时文件随之关闭，未 `finish` 的缓冲内容会丢弃。
pub struct BlockWriter {
    path: PathBuf,
    buffer: Vec<u8>,
    block_size: usize,
    current_pos: usize,
    file_handle: File,
    total_written: u64,
}

impl BlockWriter {
    /// 以独占写方式创建（截断）临时文件
    pub fn create(path: &Path, block_size: usize) -> Result<Self, DownloadError> {
        let file_handle = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| DownloadError::StoreOpenFailed { path: path.to_path_buf(), source })?;

        let block_size = block_size.max(1);
        Ok(Self {
            path: path.to_path_buf(),
            buffer: vec![0; block_size],
            block_size,
            current_pos: 0,
            file_handle,
            total_written: 0,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        let mut bytes_written = 0;
        while bytes_written < data.len() {
            let space_left = self.block_size - self.current_pos;
            let to_copy = std::cmp::min(space_left, data.len() - bytes_written);

            self.buffer[self.current_pos..self.current_pos + to_copy]
                .copy_from_slice(&data[bytes_written..bytes_written + to_copy]);
            self.current_pos += to_copy;
            bytes_written += to_copy;

            if self.current_pos == self.block_size {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DownloadError> {
        if self.current_pos > 0 {
            self.file_handle.write_all(&self.buffer[..self.current_pos])?;
            self.total_written += self.current_pos as u64;
            self.current_pos = 0;
        }
        Ok(())
    }

    /// 写出剩余缓冲并关闭文件，返回写入总字节数
    pub fn finish(mut self) -> Result<u64, DownloadError> {
        self.flush()?;
        self.file_handle.flush()?;
        Ok(self.total_written)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 按固定块大小把 `reader` 的内容全部拷贝到 `writer`，返回拷贝的字节数
pub fn copy_blocks<R: Read, W: Write>(reader: &mut R, writer: &mut W, block_size: usize) -> std::io::Result<u64> {
    let mut buffer = vec![0u8; block_size.max(1)];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_writer_flushes_full_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.part0");

        let mut writer = BlockWriter::create(&path, 4).unwrap();
        writer.write(b"abcdef").unwrap();
        // 满 4 字节的块已经落盘，剩余 2 字节仍在缓冲中
        assert_eq!(std::fs::read(&path).unwrap(), b"abcd");

        writer.write(b"ghij").unwrap();
        assert_eq!(writer.finish().unwrap(), 10);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdefghij");
    }

    #[test]
    fn test_block_writer_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.part1");
        std::fs::write(&path, b"stale data from an earlier attempt").unwrap();

        let mut writer = BlockWriter::create(&path, 8192).unwrap();
        writer.write(b"new").unwrap();
        writer.finish().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_block_writer_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir/out.part0");
        assert!(matches!(
            BlockWriter::create(&path, 16),
            Err(DownloadError::StoreOpenFailed { .. })
        ));
    }

    #[test]
    fn test_copy_blocks() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut out = Vec::new();
        let copied = copy_blocks(&mut data.as_slice(), &mut out, 333).unwrap();
        assert_eq!(copied, 10_000);
        assert_eq!(out, data);
    }
}
