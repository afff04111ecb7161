//! 传输层错误定义

use std::time::Duration;

use thiserror::Error;

/// 传输层结果类型
pub type Result<T> = std::result::Result<T, XmlRpcError>;

/// 传输层错误类型
#[derive(Error, Debug)]
pub enum XmlRpcError {
    /// 连接失败（拒绝连接、TLS 握手失败、连接被重置），可重试
    #[error("连接失败: {0}")]
    Connect(String),

    /// HTTP 请求失败（不可重试）
    #[error("HTTP 错误: {0}")]
    Http(String),

    /// 服务端返回非 200 状态码
    #[error("HTTP 状态码错误 [{0}]: {1}")]
    HttpStatus(u16, String),

    /// 调用超过截止时间
    #[error("请求超时 ({0:?})")]
    Timeout(Duration),

    /// XML 格式或 XML-RPC 结构错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// XML-RPC fault 响应
    #[error("XML-RPC fault [{code}]: {message}")]
    Fault { code: i64, message: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl XmlRpcError {
    /// 是否为瞬时故障（传输层会按退避策略重试）
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_))
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

impl From<quick_xml::Error> for XmlRpcError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Parse(format!("XML 格式错误: {}", e))
    }
}
