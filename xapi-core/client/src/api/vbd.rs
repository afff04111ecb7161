//! 虚拟块设备 API

use tracing::info;

use crate::error::Result;
use crate::models::VbdRecord;
use crate::reference::classes::{Vbd, VbdRef, VdiRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 虚拟块设备 API
pub struct VbdApi<'a> {
    session: &'a Session,
}

common_api!(VbdApi, Vbd, VbdRecord);

impl<'a> VbdApi<'a> {
    /// 热插入设备
    pub async fn plug(&self, vbd: &VbdRef) -> Result<()> {
        info!("插入 VBD: {}", vbd);
        self.session.rpc("VBD.plug").arg("self", vbd)?.call().await
    }

    pub async fn async_plug(&self, vbd: &VbdRef) -> Result<TaskHandle<()>> {
        self.session.rpc("VBD.plug").arg("self", vbd)?.call_async().await
    }

    /// 热拔出设备
    pub async fn unplug(&self, vbd: &VbdRef) -> Result<()> {
        info!("拔出 VBD: {}", vbd);
        self.session.rpc("VBD.unplug").arg("self", vbd)?.call().await
    }

    pub async fn async_unplug(&self, vbd: &VbdRef) -> Result<TaskHandle<()>> {
        self.session.rpc("VBD.unplug").arg("self", vbd)?.call_async().await
    }

    /// 向空光驱插入介质
    pub async fn insert(&self, vbd: &VbdRef, vdi: &VdiRef) -> Result<()> {
        self.session
            .rpc("VBD.insert")
            .arg("vbd", vbd)?
            .arg("vdi", vdi)?
            .call()
            .await
    }

    /// 弹出光驱介质
    pub async fn eject(&self, vbd: &VbdRef) -> Result<()> {
        self.session.rpc("VBD.eject").arg("vbd", vbd)?.call().await
    }
}
