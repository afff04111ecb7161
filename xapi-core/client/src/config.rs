//! 客户端配置
//!
//! ```toml
//! endpoint = "https://xen-host:443/"
//! originator = "my-tool"
//! call_timeout = "60s"
//! event_timeout = "30s"
//!
//! [credentials]
//! username = "root"
//! password = "xyz"
//!
//! [tls]
//! mode = "pinned-fingerprint"
//! fingerprint = "AB:CD:…"
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use xapi_xmlrpc::TransportConfig;

use crate::error::{Result, XapiError};

/// 登录凭据
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// 用户名 + 密码
    Password { username: String, password: String },
    /// 外部签发的会话引用
    Token { token: String },
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
        }
    }
}

/// 任务轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPollConfig {
    /// 首次轮询间隔
    #[serde(with = "humantime_serde", default = "default_poll_initial")]
    pub initial_interval: Duration,

    /// 轮询间隔上限
    #[serde(with = "humantime_serde", default = "default_poll_max")]
    pub max_interval: Duration,

    /// 抖动比例
    #[serde(default = "default_poll_jitter")]
    pub jitter: f64,
}

impl Default for TaskPollConfig {
    fn default() -> Self {
        Self {
            initial_interval: default_poll_initial(),
            max_interval: default_poll_max(),
            jitter: default_poll_jitter(),
        }
    }
}

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// 服务端地址
    pub endpoint: Url,

    /// 登录凭据
    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// 传输层配置
    #[serde(flatten)]
    pub transport: TransportConfig,

    /// 登录时上报的客户端标识
    #[serde(default = "default_originator")]
    pub originator: String,

    /// 登录时上报的 API 版本
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// 严格解码：记录中出现未知字段时报错
    #[serde(default)]
    pub strict_decoding: bool,

    /// 任务轮询
    #[serde(default)]
    pub task_poll: TaskPollConfig,

    /// event.from 长轮询时长
    #[serde(with = "humantime_serde", default = "default_event_timeout")]
    pub event_timeout: Duration,
}

impl ClientConfig {
    /// 以默认值创建配置
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| XapiError::Config(format!("服务端地址非法 {}: {}", endpoint, e)))?;
        Ok(Self {
            endpoint,
            credentials: None,
            transport: TransportConfig::default(),
            originator: default_originator(),
            api_version: default_api_version(),
            strict_decoding: false,
            task_poll: TaskPollConfig::default(),
            event_timeout: default_event_timeout(),
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// 从 TOML 文档加载
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        match self.endpoint.scheme() {
            "http" | "https" => {}
            other => {
                return Err(XapiError::Config(format!("不支持的协议: {}", other)));
            }
        }
        if self.endpoint.host_str().is_none() {
            return Err(XapiError::Config(format!("服务端地址缺少主机: {}", self.endpoint)));
        }
        self.transport.validate()?;
        if !(0.0..=1.0).contains(&self.task_poll.jitter) {
            return Err(XapiError::Config(format!(
                "task_poll.jitter 必须在 [0, 1] 范围内: {}",
                self.task_poll.jitter
            )));
        }
        Ok(())
    }
}

// 默认值函数
fn default_originator() -> String {
    "xapi-rust-sdk".to_string()
}

fn default_api_version() -> String {
    "1.0".to_string()
}

fn default_event_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_initial() -> Duration {
    Duration::from_millis(100)
}

fn default_poll_max() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_jitter() -> f64 {
    0.2
}
