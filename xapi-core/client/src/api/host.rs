//! 主机 API

use tracing::info;

use crate::error::Result;
use crate::models::HostRecord;
use crate::reference::classes::{Host, HostRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 主机 API
pub struct HostApi<'a> {
    session: &'a Session,
}

common_api!(HostApi, Host, HostRecord);

impl<'a> HostApi<'a> {
    /// 按名称查找主机
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<HostRef>> {
        self.session
            .rpc("host.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    /// 禁用主机（不再调度新虚拟机）
    pub async fn disable(&self, host: &HostRef) -> Result<()> {
        info!("禁用主机: {}", host);
        self.session.rpc("host.disable").arg("host", host)?.call().await
    }

    pub async fn async_disable(&self, host: &HostRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("host.disable")
            .arg("host", host)?
            .call_async()
            .await
    }

    /// 启用主机
    pub async fn enable(&self, host: &HostRef) -> Result<()> {
        info!("启用主机: {}", host);
        self.session.rpc("host.enable").arg("host", host)?.call().await
    }

    pub async fn async_enable(&self, host: &HostRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("host.enable")
            .arg("host", host)?
            .call_async()
            .await
    }
}
