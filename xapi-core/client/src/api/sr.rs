//! 存储仓库 API

use tracing::info;

use crate::error::Result;
use crate::models::SrRecord;
use crate::reference::classes::{Sr, SrRef, VdiRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 存储仓库 API
pub struct SrApi<'a> {
    session: &'a Session,
}

common_api!(SrApi, Sr, SrRecord);

impl<'a> SrApi<'a> {
    /// 按名称查找存储仓库
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<SrRef>> {
        self.session
            .rpc("SR.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    /// 列出存储仓库中的虚拟磁盘
    pub async fn get_vdis(&self, sr: &SrRef) -> Result<Vec<VdiRef>> {
        self.session.rpc("SR.get_VDIs").arg("self", sr)?.call().await
    }

    /// 重新扫描存储仓库
    pub async fn scan(&self, sr: &SrRef) -> Result<()> {
        info!("扫描存储仓库: {}", sr);
        self.session.rpc("SR.scan").arg("sr", sr)?.call().await
    }

    pub async fn async_scan(&self, sr: &SrRef) -> Result<TaskHandle<()>> {
        self.session.rpc("SR.scan").arg("sr", sr)?.call_async().await
    }
}
