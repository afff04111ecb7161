//! XAPI 类 API
//!
//! 每个类一个 API 结构体，通过 `Session` 的访问器获取：
//! - 会话 (SessionApi)
//! - 资源池 (PoolApi)
//! - 主机 (HostApi)
//! - 虚拟机 (VmApi)
//! - 存储仓库 (SrApi)
//! - 虚拟磁盘 (VdiApi)
//! - 物理块设备 (PbdApi)
//! - 虚拟块设备 (VbdApi)
//! - 网络 (NetworkApi)
//! - 任务 (TaskApi)
//! - 事件 (EventApi)
//! - PVS 站点 (PvsSiteApi)
//! - 崩溃转储 (CrashdumpApi)
//!
//! 每个操作只提供当前版本的签名；修改类操作另有 `async_*` 版本返回任务句柄。

/// 为类 API 生成通用查询操作：get_all / get_all_records / get_record / get_by_uuid / get_uuid
macro_rules! common_api {
    ($api:ident, $class:ty, $record:ty) => {
        impl<'a> $api<'a> {
            pub(crate) fn new(session: &'a $crate::session::Session) -> Self {
                Self { session }
            }

            fn method(name: &str) -> String {
                format!(
                    "{}.{}",
                    <$class as $crate::reference::XapiClass>::NAME,
                    name
                )
            }

            /// 列出全部对象引用
            pub async fn get_all(&self) -> $crate::error::Result<Vec<$crate::reference::Ref<$class>>> {
                self.session.rpc(Self::method("get_all")).call().await
            }

            /// 读取全部对象记录
            pub async fn get_all_records(
                &self,
            ) -> $crate::error::Result<
                std::collections::HashMap<$crate::reference::Ref<$class>, $record>,
            > {
                self.session.rpc(Self::method("get_all_records")).call().await
            }

            /// 读取对象记录
            pub async fn get_record(
                &self,
                self_ref: &$crate::reference::Ref<$class>,
            ) -> $crate::error::Result<$record> {
                self.session
                    .rpc(Self::method("get_record"))
                    .arg("self", self_ref)?
                    .call()
                    .await
            }

            /// 按 UUID 查找对象
            pub async fn get_by_uuid(
                &self,
                uuid: &str,
            ) -> $crate::error::Result<$crate::reference::Ref<$class>> {
                self.session
                    .rpc(Self::method("get_by_uuid"))
                    .arg("uuid", uuid)?
                    .call()
                    .await
            }

            /// 读取对象 UUID
            pub async fn get_uuid(
                &self,
                self_ref: &$crate::reference::Ref<$class>,
            ) -> $crate::error::Result<String> {
                self.session
                    .rpc(Self::method("get_uuid"))
                    .arg("self", self_ref)?
                    .call()
                    .await
            }
        }
    };
}

pub mod crashdump;
pub mod event;
pub mod host;
pub mod network;
pub mod pbd;
pub mod pool;
pub mod pvs_site;
pub mod session;
pub mod sr;
pub mod task;
pub mod vbd;
pub mod vdi;
pub mod vm;

pub use crashdump::CrashdumpApi;
pub use event::EventApi;
pub use host::HostApi;
pub use network::NetworkApi;
pub use pbd::PbdApi;
pub use pool::PoolApi;
pub use pvs_site::PvsSiteApi;
pub use session::SessionApi;
pub use sr::SrApi;
pub use task::TaskApi;
pub use vbd::VbdApi;
pub use vdi::VdiApi;
pub use vm::VmApi;
