//! 物理块设备 API

use tracing::info;

use crate::error::Result;
use crate::models::PbdRecord;
use crate::reference::classes::{Pbd, PbdRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 物理块设备 API
pub struct PbdApi<'a> {
    session: &'a Session,
}

common_api!(PbdApi, Pbd, PbdRecord);

impl<'a> PbdApi<'a> {
    /// 挂载存储到主机
    pub async fn plug(&self, pbd: &PbdRef) -> Result<()> {
        info!("挂载 PBD: {}", pbd);
        self.session.rpc("PBD.plug").arg("self", pbd)?.call().await
    }

    pub async fn async_plug(&self, pbd: &PbdRef) -> Result<TaskHandle<()>> {
        self.session.rpc("PBD.plug").arg("self", pbd)?.call_async().await
    }

    /// 从主机卸载存储
    pub async fn unplug(&self, pbd: &PbdRef) -> Result<()> {
        info!("卸载 PBD: {}", pbd);
        self.session.rpc("PBD.unplug").arg("self", pbd)?.call().await
    }

    pub async fn async_unplug(&self, pbd: &PbdRef) -> Result<TaskHandle<()>> {
        self.session.rpc("PBD.unplug").arg("self", pbd)?.call_async().await
    }
}
