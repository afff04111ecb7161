//! 传输层配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, XmlRpcError};

/// TLS 校验策略
///
/// ```toml
/// [tls]
/// mode = "pinned-fingerprint"
/// fingerprint = "AB:CD:…"   # SHA-256 或 SHA-1 十六进制，冒号可省略
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "fingerprint", rename_all = "kebab-case")]
pub enum TlsPolicy {
    /// 校验证书链（系统根证书）
    #[default]
    VerifyChain,
    /// 仅比对服务端证书指纹
    PinnedFingerprint(String),
    /// 不做任何校验（仅限测试环境）
    Insecure,
}

/// 传输层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// 建立连接超时
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// 单次调用超时（不含 event.from 的长轮询部分）
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub call_timeout: Duration,

    /// 瞬时故障时的最大尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 重试初始延迟
    #[serde(with = "humantime_serde", default = "default_retry_initial_delay")]
    pub retry_initial_delay: Duration,

    /// 重试最大延迟
    #[serde(with = "humantime_serde", default = "default_retry_max_delay")]
    pub retry_max_delay: Duration,

    /// 重试抖动比例
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,

    /// User-Agent 请求头
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TLS 策略
    #[serde(default)]
    pub tls: TlsPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            call_timeout: default_call_timeout(),
            max_attempts: default_max_attempts(),
            retry_initial_delay: default_retry_initial_delay(),
            retry_max_delay: default_retry_max_delay(),
            retry_jitter: default_retry_jitter(),
            user_agent: default_user_agent(),
            tls: TlsPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(XmlRpcError::Config("max_attempts 必须大于 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(XmlRpcError::Config(format!(
                "retry_jitter 必须在 [0, 1] 范围内: {}",
                self.retry_jitter
            )));
        }
        if self.call_timeout.is_zero() {
            return Err(XmlRpcError::Config("call_timeout 不能为 0".to_string()));
        }
        Ok(())
    }
}

// 默认值函数
fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_initial_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_retry_jitter() -> f64 {
    0.2
}

fn default_user_agent() -> String {
    format!("xapi-rust-sdk/{}", env!("CARGO_PKG_VERSION"))
}
