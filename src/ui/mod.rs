//! 终端输出：进度条、结果摘要和错误提示，核心流程不直接打印任何内容

mod progress;

use std::fmt;
use crossterm::style::Stylize;
use crate::core::JobReport;
pub use progress::{Finish, ProgressActor};

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.yellow());
}

/// 下载结果摘要
pub struct DownloadSummary<'a>(pub &'a JobReport);

impl fmt::Display for DownloadSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let failed = report.failed_chunks().count();
        writeln!(f, "\n下载摘要:")?;
        writeln!(f, "  目标文件: {}", report.destination.display())?;
        writeln!(f, "  文件大小: {}", format_size(report.total_size))?;
        writeln!(f, "  写入大小: {}", format_size(report.merge.bytes_written))?;
        writeln!(f, "  分块数: {}", report.workers)?;
        writeln!(f, "  成功: {}", report.outcomes.len() - failed)?;
        writeln!(f, "  失败: {}", failed)?;
        writeln!(f, "  耗时: {:.2}秒", report.elapsed_ms as f64 / 1000.0)?;
        for range in &report.merge.missing_ranges {
            writeln!(f, "  缺失范围: {} ({})", range, format_size(range.len()))?;
        }
        Ok(())
    }
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
