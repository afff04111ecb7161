//! XAPI 客户端
//!
//! 在 `xapi-xmlrpc` 传输层之上提供类型化的 XAPI 访问。
//!
//! # 功能
//!
//! - **编解码** (`codec`): 动态值与 Rust 类型互转，错误携带字段路径
//! - **对象引用** (`Ref<C>`): 按类区分的不透明引用
//! - **会话管理** (`Session`): 登录、主节点重定向、会话失效后重新登录
//! - **异步任务** (`TaskHandle`): 轮询任务直到终态并解码结果
//! - **事件订阅** (`Subscription`): 基于令牌的长轮询，支持溢出后重新同步
//! - **类 API** (`api`): VM / VDI / SR / host / pool 等常用类
//!
//! # 示例
//!
//! ```ignore
//! use xapi_client::{ClientConfig, Credentials, Session};
//!
//! let config = ClientConfig::new("https://xen-host/")?
//!     .with_credentials(Credentials::password("root", "xyz"));
//! let session = Session::new(config)?;
//! session.login().await?;
//!
//! for vm in session.vm().get_by_name_label("web-01").await? {
//!     let task = session.vm().async_clean_shutdown(&vm).await?;
//!     task.wait().await?;
//! }
//! session.logout().await?;
//! ```

pub mod api;
pub mod call;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod event;
pub mod models;
pub mod reference;
pub mod session;
pub mod task;

pub use xapi_xmlrpc::{RpcTransport, TlsPolicy, TransportConfig, Value};

pub use call::RpcCall;
pub use codec::{Blob, Context, FromXapi, ToXapi};
pub use config::{ClientConfig, Credentials, TaskPollConfig};
pub use envelope::Envelope;
pub use error::{ErrorCode, Result, RpcError, XapiError};
pub use event::{
    Event, EventBatch, LegacySubscription, Subscription, SubscriptionCloser, SubscriptionState,
    ALL_CLASSES,
};
pub use reference::{classes, Ref, XapiClass, NULL_REF};
pub use session::{ApiVersion, Session};
pub use task::TaskHandle;
