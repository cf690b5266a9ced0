//! 传输层：HEAD 探测和 Range 请求
//!
//! 探测和分块下载都只依赖 [`Transport`]，正式运行使用基于 awc 的
//! [`AwcTransport`]，测试中可以换成内存实现。awc 的客户端只能在
//! 当前线程使用，所以这里的 future 不要求 `Send`。

use async_trait::async_trait;
use awc::http::header;
use bytes::Bytes;
use futures::stream::{LocalBoxStream, StreamExt, TryStreamExt};

use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::job::ByteRange;

/// 响应体字节流
pub type BodyStream = LocalBoxStream<'static, DownloadResult<Bytes>>;

/// HEAD 请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_length: Option<u64>,
}

/// Range 请求的结果，状态码已确认为 2xx
pub struct RangeResponse {
    pub status: u16,
    pub body: BodyStream,
}

#[async_trait(?Send)]
pub trait Transport {
    /// 只取元数据，不下载响应体
    async fn probe(&self, url: &str) -> DownloadResult<ProbeResponse>;

    /// 请求 `range` 对应的字节，非 2xx 状态码返回 `HttpStatus`
    async fn fetch_range(&self, url: &str, range: ByteRange) -> DownloadResult<RangeResponse>;
}

/// 基于 awc 的传输实现，自动跟随重定向，不设超时
#[derive(Clone)]
pub struct AwcTransport {
    client: awc::Client,
}

impl AwcTransport {
    pub fn new(config: &Config) -> Self {
        let client = awc::Client::builder()
            .add_default_header((header::USER_AGENT, config.user_agent.clone()))
            .max_redirects(config.max_redirects)
            .disable_timeout()
            .finish();
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transport for AwcTransport {
    async fn probe(&self, url: &str) -> DownloadResult<ProbeResponse> {
        // 与分块请求使用同一编码，长度才是原始字节数
        let response = self.client.head(url)
            .insert_header((header::ACCEPT_ENCODING, "identity"))
            .no_decompress()
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;

        let content_length = response.headers().get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            content_length,
        })
    }

    async fn fetch_range(&self, url: &str, range: ByteRange) -> DownloadResult<RangeResponse> {
        // 压缩会打乱字节偏移，必须要求原样返回
        let response = self.client.get(url)
            .insert_header((header::RANGE, range.header_value()))
            .insert_header((header::ACCEPT_ENCODING, "identity"))
            .no_decompress()
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        let body = response
            .map_err(|e| DownloadError::NetworkError(format!("网络流错误: {}", e)))
            .boxed_local();

        Ok(RangeResponse { status: status.as_u16(), body })
    }
}
