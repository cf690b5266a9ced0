use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::core::error::DownloadError;

/// 超过大小上限后轮转为 `<file>.backup` 的日志文件
pub struct RotatingFile {
    writer: BufWriter<File>,
    file_path: PathBuf,
    max_size: u64,
    current_size: u64,
}

impl RotatingFile {
    pub fn open(file_path: impl AsRef<Path>, max_size: u64) -> Result<Self, std::io::Error> {
        let file_path = file_path.as_ref().to_path_buf();
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&file_path)?;
        let current_size = file.metadata()?.len();

        Ok(Self {
            writer: BufWriter::new(file),
            file_path,
            max_size,
            current_size,
        })
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.file_path.clone().into_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    fn check_rotation(&mut self) -> Result<(), std::io::Error> {
        if self.current_size > self.max_size {
            self.writer.flush()?;

            let backup_path = self.backup_path();
            if backup_path.exists() {
                std::fs::remove_file(&backup_path)?;
            }
            std::fs::rename(&self.file_path, &backup_path)?;

            let file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
            self.writer = BufWriter::new(file);
            self.current_size = 0;
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.check_rotation()?;
        let n = self.writer.write(buf)?;
        self.current_size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn builder(config: &Config) -> Builder {
    // RUST_LOG 优先于配置文件
    let mut builder = Builder::new();
    builder
        .filter_level(config.level_filter())
        .parse_env(Env::default())
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });
    builder
}

/// 安装全局日志：配置了 `log_file` 时写入轮转文件，否则写到 stderr
pub fn init(config: &Config) -> Result<(), DownloadError> {
    let mut builder = builder(config);
    match &config.log_file {
        Some(path) => {
            let file = RotatingFile::open(path, config.log_max_size)?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(Target::Stderr);
        }
    }
    builder
        .try_init()
        .map_err(|e| DownloadError::Config(format!("日志初始化失败: {}", e)))
}
