//! 虚拟磁盘 API

use std::collections::HashMap;

use tracing::info;

use crate::error::Result;
use crate::models::VdiRecord;
use crate::reference::classes::{Vdi, VdiRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 虚拟磁盘 API
pub struct VdiApi<'a> {
    session: &'a Session,
}

common_api!(VdiApi, Vdi, VdiRecord);

impl<'a> VdiApi<'a> {
    /// 按名称查找虚拟磁盘
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<VdiRef>> {
        self.session
            .rpc("VDI.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    /// 按记录创建虚拟磁盘
    pub async fn create(&self, record: &VdiRecord) -> Result<VdiRef> {
        info!("创建虚拟磁盘: {}", record.name_label);
        self.session.rpc("VDI.create").arg("args", record)?.call().await
    }

    pub async fn async_create(&self, record: &VdiRecord) -> Result<TaskHandle<VdiRef>> {
        self.session
            .rpc("VDI.create")
            .arg("args", record)?
            .call_async()
            .await
    }

    /// 克隆磁盘，`driver_params` 透传给存储驱动
    pub async fn clone(&self, vdi: &VdiRef, driver_params: &HashMap<String, String>) -> Result<VdiRef> {
        info!("克隆虚拟磁盘: {}", vdi);
        self.session
            .rpc("VDI.clone")
            .arg("vdi", vdi)?
            .arg("driver_params", driver_params)?
            .call()
            .await
    }

    pub async fn async_clone(
        &self,
        vdi: &VdiRef,
        driver_params: &HashMap<String, String>,
    ) -> Result<TaskHandle<VdiRef>> {
        self.session
            .rpc("VDI.clone")
            .arg("vdi", vdi)?
            .arg("driver_params", driver_params)?
            .call_async()
            .await
    }

    /// 创建磁盘快照
    pub async fn snapshot(&self, vdi: &VdiRef, driver_params: &HashMap<String, String>) -> Result<VdiRef> {
        info!("创建虚拟磁盘快照: {}", vdi);
        self.session
            .rpc("VDI.snapshot")
            .arg("vdi", vdi)?
            .arg("driver_params", driver_params)?
            .call()
            .await
    }

    pub async fn async_snapshot(
        &self,
        vdi: &VdiRef,
        driver_params: &HashMap<String, String>,
    ) -> Result<TaskHandle<VdiRef>> {
        self.session
            .rpc("VDI.snapshot")
            .arg("vdi", vdi)?
            .arg("driver_params", driver_params)?
            .call_async()
            .await
    }

    /// 调整容量（字节）
    pub async fn resize(&self, vdi: &VdiRef, size: i64) -> Result<()> {
        info!("调整虚拟磁盘容量: {} -> {}", vdi, size);
        self.session
            .rpc("VDI.resize")
            .arg("vdi", vdi)?
            .arg("size", &size)?
            .call()
            .await
    }

    pub async fn async_resize(&self, vdi: &VdiRef, size: i64) -> Result<TaskHandle<()>> {
        self.session
            .rpc("VDI.resize")
            .arg("vdi", vdi)?
            .arg("size", &size)?
            .call_async()
            .await
    }

    /// 修改名称
    pub async fn set_name_label(&self, vdi: &VdiRef, value: &str) -> Result<()> {
        self.session
            .rpc("VDI.set_name_label")
            .arg("self", vdi)?
            .arg("value", value)?
            .call()
            .await
    }

    /// 删除磁盘
    pub async fn destroy(&self, vdi: &VdiRef) -> Result<()> {
        info!("删除虚拟磁盘: {}", vdi);
        self.session.rpc("VDI.destroy").arg("self", vdi)?.call().await
    }

    pub async fn async_destroy(&self, vdi: &VdiRef) -> Result<TaskHandle<()>> {
        self.session.rpc("VDI.destroy").arg("self", vdi)?.call_async().await
    }
}
