//! XAPI 客户端错误定义

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use xapi_xmlrpc::XmlRpcError;

/// 客户端结果类型
pub type Result<T> = std::result::Result<T, XapiError>;

/// 服务端错误码
///
/// 只区分参与控制流决策的少数错误码，其余一律保留原始字符串。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 当前主机不是池协调者，第一个参数为协调者地址
    HostIsSlave,
    /// 会话失效
    SessionInvalid,
    /// 事件队列溢出
    EventsLost,
    /// 任务已取消
    TaskCancelled,
    /// 当前状态不允许该操作
    OperationNotAllowed,
    /// 用户名或密码错误
    SessionAuthenticationFailed,
    /// 会话未注册事件
    SessionNotRegistered,
    /// 方法不存在
    MessageMethodUnknown,
    /// 其他错误码
    Other(String),
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "HOST_IS_SLAVE" => Self::HostIsSlave,
            "SESSION_INVALID" => Self::SessionInvalid,
            "EVENTS_LOST" => Self::EventsLost,
            "TASK_CANCELLED" => Self::TaskCancelled,
            "OPERATION_NOT_ALLOWED" => Self::OperationNotAllowed,
            "SESSION_AUTHENTICATION_FAILED" => Self::SessionAuthenticationFailed,
            "SESSION_NOT_REGISTERED" => Self::SessionNotRegistered,
            "MESSAGE_METHOD_UNKNOWN" => Self::MessageMethodUnknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// 线路上的原始错误码
    pub fn as_str(&self) -> &str {
        match self {
            Self::HostIsSlave => "HOST_IS_SLAVE",
            Self::SessionInvalid => "SESSION_INVALID",
            Self::EventsLost => "EVENTS_LOST",
            Self::TaskCancelled => "TASK_CANCELLED",
            Self::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Self::SessionAuthenticationFailed => "SESSION_AUTHENTICATION_FAILED",
            Self::SessionNotRegistered => "SESSION_NOT_REGISTERED",
            Self::MessageMethodUnknown => "MESSAGE_METHOD_UNKNOWN",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 服务端返回的 Failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    /// 出错的方法（任务失败时为任务引用）
    pub method: String,
    /// 错误码
    pub code: ErrorCode,
    /// 错误参数
    pub params: Vec<String>,
}

impl RpcError {
    /// 从 `[code, param…]` 构建
    pub fn from_parts(method: impl Into<String>, parts: Vec<String>) -> Self {
        let mut parts = parts.into_iter();
        let code = parts.next().unwrap_or_default();
        Self {
            method: method.into(),
            code: ErrorCode::parse(&code),
            params: parts.collect(),
        }
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 失败: {}", self.method, self.code)?;
        if !self.params.is_empty() {
            write!(f, " [{}]", self.params.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum XapiError {
    /// 网络或 TLS 故障，未收到响应信封
    #[error("传输错误: {0}")]
    Transport(String),

    /// 响应信封格式错误
    #[error("协议错误: {0}")]
    Protocol(String),

    /// 成功响应的值与期望类型不符
    #[error("解码错误 [{path}]: {message}")]
    Decode { path: String, message: String },

    /// 参数无法编码为线路值
    #[error("编码错误 [{path}]: {message}")]
    Encode { path: String, message: String },

    /// 服务端返回 Failure
    #[error("RPC 错误: {0}")]
    Rpc(RpcError),

    /// 异步任务失败
    #[error("任务失败: {0}")]
    TaskFailed(RpcError),

    /// 异步任务被取消
    #[error("任务已取消: {0}")]
    TaskCancelled(String),

    /// 超过调用方截止时间
    #[error("超时 ({0:?})")]
    Timeout(Duration),

    /// 未登录或缺少凭据
    #[error("认证错误: {0}")]
    Auth(String),

    /// 订阅已关闭
    #[error("订阅已关闭")]
    SubscriptionClosed,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl XapiError {
    /// 服务端错误（同步调用或任务失败）
    pub fn rpc(&self) -> Option<&RpcError> {
        match self {
            Self::Rpc(e) | Self::TaskFailed(e) => Some(e),
            _ => None,
        }
    }

    /// 服务端错误码
    pub fn code(&self) -> Option<&ErrorCode> {
        self.rpc().map(|e| &e.code)
    }

    pub fn is_code(&self, code: &ErrorCode) -> bool {
        self.code() == Some(code)
    }
}

impl From<XmlRpcError> for XapiError {
    fn from(e: XmlRpcError) -> Self {
        match e {
            XmlRpcError::Parse(msg) => Self::Protocol(msg),
            XmlRpcError::Fault { code, message } => {
                Self::Protocol(format!("XML-RPC fault [{}]: {}", code, message))
            }
            XmlRpcError::Timeout(d) => Self::Timeout(d),
            XmlRpcError::Config(msg) => Self::Config(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for XapiError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
