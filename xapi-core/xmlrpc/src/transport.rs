//! HTTP(S) 传输
//!
//! 每次调用是一次独立的 POST 往返。连接池由 reqwest 管理并在所有调用间共享；
//! 连接级瞬时故障按指数退避重试，其余错误直接返回。

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::backoff::Backoff;
use crate::config::{TlsPolicy, TransportConfig};
use crate::error::{Result, XmlRpcError};
use crate::tls::pinned_client_config;
use crate::value::Value;
use crate::xml::{parse_method_response, write_method_call};

/// 错误信息中保留的响应体长度上限
const MAX_ERROR_BODY: usize = 512;

/// 单次调用选项
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// 本次调用的截止时间，缺省使用配置中的 call_timeout
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// XML-RPC 传输接口
///
/// 只负责把一次方法调用送达 `endpoint` 并返回 methodResponse 中的值，
/// 不理解具体方法语义。
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// 发起一次调用
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: &[Value],
        options: &CallOptions,
    ) -> Result<Value>;

    /// 丢弃缓存的连接（端点切换后调用）
    fn reset(&self) {}
}

/// 基于 reqwest 的 HTTP(S) 传输
pub struct HttpTransport {
    client: RwLock<Client>,
    config: TransportConfig,
}

impl HttpTransport {
    /// 创建传输实例
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self {
            client: RwLock::new(client),
            config,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn client(&self) -> Client {
        match self.client.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn send_once(&self, endpoint: &Url, body: &str, deadline: Duration) -> Result<Value> {
        let response = self
            .client()
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .timeout(deadline)
            .body(body.to_owned())
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, deadline))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, deadline))?;

        if status != StatusCode::OK {
            return Err(XmlRpcError::HttpStatus(status.as_u16(), truncate(text)));
        }

        parse_method_response(&text)
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: &[Value],
        options: &CallOptions,
    ) -> Result<Value> {
        let body = write_method_call(method, params);
        let deadline = options.timeout.unwrap_or(self.config.call_timeout);
        let mut backoff = Backoff::new(
            self.config.retry_initial_delay,
            self.config.retry_max_delay,
            2.0,
            self.config.retry_jitter,
        );

        let mut attempt = 1;
        loop {
            debug!("XML-RPC 调用: {} -> {} (第 {} 次)", method, endpoint, attempt);

            match self.send_once(endpoint, &body, deadline).await {
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let delay = backoff.next_delay();
                    warn!(
                        "XML-RPC 调用 {} 失败 ({}/{})，{:?} 后重试: {}",
                        method, attempt, self.config.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(XmlRpcError::Connect(message)) if attempt > 1 => {
                    return Err(XmlRpcError::Connect(format!("{} (共尝试 {} 次)", message, attempt)));
                }
                result => return result,
            }
        }
    }

    fn reset(&self) {
        match build_client(&self.config) {
            Ok(client) => {
                let mut guard = match self.client.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard = client;
                info!("HTTP 连接池已重建");
            }
            Err(e) => warn!("重建 HTTP 客户端失败，继续使用原连接池: {}", e),
        }
    }
}

fn build_client(config: &TransportConfig) -> Result<Client> {
    let builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.clone());

    let builder = match &config.tls {
        TlsPolicy::VerifyChain => builder.use_rustls_tls(),
        TlsPolicy::PinnedFingerprint(fingerprint) => {
            builder.use_preconfigured_tls(pinned_client_config(fingerprint)?)
        }
        TlsPolicy::Insecure => {
            warn!("TLS 证书校验已关闭");
            builder.use_rustls_tls().danger_accept_invalid_certs(true)
        }
    };

    builder
        .build()
        .map_err(|e| XmlRpcError::Config(format!("创建 HTTP 客户端失败: {}", e)))
}

fn map_reqwest_error(e: reqwest::Error, deadline: Duration) -> XmlRpcError {
    if e.is_timeout() {
        XmlRpcError::Timeout(deadline)
    } else if e.is_connect() || e.is_request() {
        XmlRpcError::Connect(e.to_string())
    } else {
        XmlRpcError::Http(e.to_string())
    }
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push('…');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundary() {
        let long = "错".repeat(400);
        let short = truncate(long);
        assert!(short.len() <= MAX_ERROR_BODY + '…'.len_utf8());
        assert!(short.ends_with('…'));
        assert_eq!(truncate("ok".to_string()), "ok");
    }

    #[test]
    fn test_new_validates_config() {
        let config = TransportConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(HttpTransport::new(config), Err(XmlRpcError::Config(_))));
    }

    #[test]
    fn test_new_rejects_bad_fingerprint() {
        let config = TransportConfig {
            tls: TlsPolicy::PinnedFingerprint("not-hex".to_string()),
            ..Default::default()
        };
        assert!(matches!(HttpTransport::new(config), Err(XmlRpcError::Config(_))));
    }
}
