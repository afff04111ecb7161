//! PVS 站点 API

use tracing::info;

use crate::error::Result;
use crate::models::PvsSiteRecord;
use crate::reference::classes::{PvsSite, PvsSiteRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// PVS 站点 API
pub struct PvsSiteApi<'a> {
    session: &'a Session,
}

common_api!(PvsSiteApi, PvsSite, PvsSiteRecord);

impl<'a> PvsSiteApi<'a> {
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<PvsSiteRef>> {
        self.session
            .rpc("PVS_site.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    /// 登记 PVS 站点
    pub async fn introduce(
        &self,
        name_label: &str,
        name_description: &str,
        pvs_uuid: &str,
    ) -> Result<PvsSiteRef> {
        info!("登记 PVS 站点: {} ({})", name_label, pvs_uuid);
        self.session
            .rpc("PVS_site.introduce")
            .arg("name_label", name_label)?
            .arg("name_description", name_description)?
            .arg("PVS_uuid", pvs_uuid)?
            .call()
            .await
    }

    pub async fn async_introduce(
        &self,
        name_label: &str,
        name_description: &str,
        pvs_uuid: &str,
    ) -> Result<TaskHandle<PvsSiteRef>> {
        self.session
            .rpc("PVS_site.introduce")
            .arg("name_label", name_label)?
            .arg("name_description", name_description)?
            .arg("PVS_uuid", pvs_uuid)?
            .call_async()
            .await
    }

    /// 移除站点登记
    pub async fn forget(&self, site: &PvsSiteRef) -> Result<()> {
        info!("移除 PVS 站点: {}", site);
        self.session.rpc("PVS_site.forget").arg("self", site)?.call().await
    }

    pub async fn async_forget(&self, site: &PvsSiteRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("PVS_site.forget")
            .arg("self", site)?
            .call_async()
            .await
    }

    pub async fn set_pvs_uuid(&self, site: &PvsSiteRef, value: &str) -> Result<()> {
        self.session
            .rpc("PVS_site.set_PVS_uuid")
            .arg("self", site)?
            .arg("value", value)?
            .call()
            .await
    }

    pub async fn async_set_pvs_uuid(&self, site: &PvsSiteRef, value: &str) -> Result<TaskHandle<()>> {
        self.session
            .rpc("PVS_site.set_PVS_uuid")
            .arg("self", site)?
            .arg("value", value)?
            .call_async()
            .await
    }

    pub async fn set_name_label(&self, site: &PvsSiteRef, value: &str) -> Result<()> {
        self.session
            .rpc("PVS_site.set_name_label")
            .arg("self", site)?
            .arg("value", value)?
            .call()
            .await
    }

    pub async fn set_name_description(&self, site: &PvsSiteRef, value: &str) -> Result<()> {
        self.session
            .rpc("PVS_site.set_name_description")
            .arg("self", site)?
            .arg("value", value)?
            .call()
            .await
    }
}
