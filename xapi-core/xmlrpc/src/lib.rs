//! XAPI 传输层
//!
//! 负责 XML-RPC 线路格式与 HTTP(S) 传输，不理解具体的 XAPI 方法语义。
//!
//! # 功能
//!
//! - **值模型** (`Value`): XML-RPC 动态类型值树
//! - **XML 编解码** (`xml`): methodCall / methodResponse 的生成与解析
//! - **时间格式** (`datetime`): 紧凑与扩展 ISO-8601 格式互转
//! - **HTTP 传输** (`HttpTransport`): 连接池、超时、瞬时故障重试
//! - **TLS 策略** (`TlsPolicy`): 证书链校验 / 证书指纹固定 / 不校验
//!
//! # 示例
//!
//! ```ignore
//! use xapi_xmlrpc::{CallOptions, HttpTransport, RpcTransport, TransportConfig, Value};
//!
//! let transport = HttpTransport::new(TransportConfig::default())?;
//! let endpoint = "https://xen-host:443/".parse()?;
//! let reply = transport
//!     .call(&endpoint, "session.login_with_password", &[Value::from("root"), Value::from("xyz")], &CallOptions::default())
//!     .await?;
//! ```

pub mod backoff;
pub mod config;
pub mod datetime;
pub mod error;
pub mod tls;
pub mod transport;
pub mod value;
pub mod xml;

pub use backoff::Backoff;
pub use config::{TlsPolicy, TransportConfig};
pub use error::{Result, XmlRpcError};
pub use transport::{CallOptions, HttpTransport, RpcTransport};
pub use value::Value;
