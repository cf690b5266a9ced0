//! partdown: 按字节范围并行下载单个文件
//!
//! 流程：HEAD 探测文件大小 → 切分字节范围 → 每个范围一个任务并发下载到
//! `<目标>.part<i>` → 全部结束后按顺序合并并删除临时文件。

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;
pub mod utils;
