use log::{debug, warn};

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::transport::Transport;

/// 通过 HEAD 请求获取远程文件的总字节数
///
/// 传输失败、非 2xx 状态码、缺少 Content-Length 或长度为 0 都返回
/// [`DownloadError::SizeUnavailable`]，整个任务随之中止。
pub async fn probe<T: Transport + ?Sized>(transport: &T, url: &str) -> DownloadResult<u64> {
    let response = transport.probe(url).await.map_err(|e| {
        warn!("[probe] 请求失败 {}: {}", url, e);
        DownloadError::SizeUnavailable(e.to_string())
    })?;
    debug!("[probe] {} -> {:?}", url, response);

    if !(200..300).contains(&response.status) {
        return Err(DownloadError::SizeUnavailable(format!("服务器返回状态码 {}", response.status)));
    }

    match response.content_length {
        Some(0) => Err(DownloadError::SizeUnavailable("Content-Length 为 0".to_string())),
        Some(size) => Ok(size),
        None => Err(DownloadError::SizeUnavailable("响应中缺少 Content-Length".to_string())),
    }
}
