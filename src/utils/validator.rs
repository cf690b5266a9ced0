use anyhow::Result;
use url::Url;

/// 只接受能解析且带主机名的 http/https 地址
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn validate_worker_count(workers: usize) -> Result<()> {
    if workers == 0 {
        anyhow::bail!("线程数必须至少为1");
    }
    Ok(())
}

pub fn validate_output_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        anyhow::bail!("输出路径不能为空");
    }
    if path.ends_with('/') || path.ends_with('\\') {
        anyhow::bail!("输出路径必须是文件而不是目录: {}", path);
    }
    Ok(())
}
