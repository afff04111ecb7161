//! 崩溃转储 API

use tracing::info;

use crate::error::Result;
use crate::models::CrashdumpRecord;
use crate::reference::classes::{Crashdump, CrashdumpRef};
use crate::session::Session;
use crate::task::TaskHandle;

/// 崩溃转储 API
pub struct CrashdumpApi<'a> {
    session: &'a Session,
}

common_api!(CrashdumpApi, Crashdump, CrashdumpRecord);

impl<'a> CrashdumpApi<'a> {
    /// 删除崩溃转储及其磁盘
    pub async fn destroy(&self, crashdump: &CrashdumpRef) -> Result<()> {
        info!("删除崩溃转储: {}", crashdump);
        self.session
            .rpc("crashdump.destroy")
            .arg("self", crashdump)?
            .call()
            .await
    }

    pub async fn async_destroy(&self, crashdump: &CrashdumpRef) -> Result<TaskHandle<()>> {
        self.session
            .rpc("crashdump.destroy")
            .arg("self", crashdump)?
            .call_async()
            .await
    }
}
