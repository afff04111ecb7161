//! 虚拟机 API

use tracing::info;

use crate::error::Result;
use crate::models::{VmPowerState, VmRecord};
use crate::reference::classes::{VdiRef, Vm, VmRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 虚拟机 API
pub struct VmApi<'a> {
    session: &'a Session,
}

common_api!(VmApi, Vm, VmRecord);

impl<'a> VmApi<'a> {
    /// 按名称查找虚拟机
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<VmRef>> {
        self.session
            .rpc("VM.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    /// 查询电源状态
    pub async fn get_power_state(&self, vm: &VmRef) -> Result<VmPowerState> {
        self.session
            .rpc("VM.get_power_state")
            .arg("self", vm)?
            .call()
            .await
    }

    /// 启动虚拟机
    pub async fn start(&self, vm: &VmRef, start_paused: bool, force: bool) -> Result<()> {
        info!("启动虚拟机: {}", vm);
        self.session
            .rpc("VM.start")
            .arg("vm", vm)?
            .arg("start_paused", &start_paused)?
            .arg("force", &force)?
            .call()
            .await
    }

    pub async fn async_start(&self, vm: &VmRef, start_paused: bool, force: bool) -> Result<TaskHandle<()>> {
        self.session
            .rpc("VM.start")
            .arg("vm", vm)?
            .arg("start_paused", &start_paused)?
            .arg("force", &force)?
            .call_async()
            .await
    }

    /// 正常关机
    pub async fn clean_shutdown(&self, vm: &VmRef) -> Result<()> {
        info!("关闭虚拟机: {}", vm);
        self.session.rpc("VM.clean_shutdown").arg("vm", vm)?.call().await
    }

    pub async fn async_clean_shutdown(&self, vm: &VmRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("VM.clean_shutdown")
            .arg("vm", vm)?
            .call_async()
            .await
    }

    /// 强制关机
    pub async fn hard_shutdown(&self, vm: &VmRef) -> Result<()> {
        info!("强制关闭虚拟机: {}", vm);
        self.session.rpc("VM.hard_shutdown").arg("vm", vm)?.call().await
    }

    pub async fn async_hard_shutdown(&self, vm: &VmRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("VM.hard_shutdown")
            .arg("vm", vm)?
            .call_async()
            .await
    }

    /// 正常重启
    pub async fn clean_reboot(&self, vm: &VmRef) -> Result<()> {
        info!("重启虚拟机: {}", vm);
        self.session.rpc("VM.clean_reboot").arg("vm", vm)?.call().await
    }

    pub async fn async_clean_reboot(&self, vm: &VmRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("VM.clean_reboot")
            .arg("vm", vm)?
            .call_async()
            .await
    }

    /// 克隆虚拟机
    pub async fn clone(&self, vm: &VmRef, new_name: &str) -> Result<VmRef> {
        info!("克隆虚拟机: {} -> {}", vm, new_name);
        self.session
            .rpc("VM.clone")
            .arg("vm", vm)?
            .arg("new_name", new_name)?
            .call()
            .await
    }

    pub async fn async_clone(&self, vm: &VmRef, new_name: &str) -> Result<TaskHandle<VmRef>> {
        self.session
            .rpc("VM.clone")
            .arg("vm", vm)?
            .arg("new_name", new_name)?
            .call_async()
            .await
    }

    /// 创建快照，`ignore_vdis` 中的磁盘不做快照
    pub async fn snapshot(&self, vm: &VmRef, new_name: &str, ignore_vdis: &[VdiRef]) -> Result<VmRef> {
        info!("创建虚拟机快照: {} -> {}", vm, new_name);
        self.session
            .rpc("VM.snapshot")
            .arg("vm", vm)?
            .arg("new_name", new_name)?
            .arg("ignore_vdis", ignore_vdis)?
            .call()
            .await
    }

    pub async fn async_snapshot(
        &self,
        vm: &VmRef,
        new_name: &str,
        ignore_vdis: &[VdiRef],
    ) -> Result<TaskHandle<VmRef>> {
        self.session
            .rpc("VM.snapshot")
            .arg("vm", vm)?
            .arg("new_name", new_name)?
            .arg("ignore_vdis", ignore_vdis)?
            .call_async()
            .await
    }

    /// 销毁虚拟机对象（不删除磁盘）
    pub async fn destroy(&self, vm: &VmRef) -> Result<()> {
        info!("销毁虚拟机: {}", vm);
        self.session.rpc("VM.destroy").arg("self", vm)?.call().await
    }

    pub async fn async_destroy(&self, vm: &VmRef) -> Result<TaskHandle<()>> {
        self.session.rpc("VM.destroy").arg("self", vm)?.call_async().await
    }
}
