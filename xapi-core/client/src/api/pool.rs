//! 资源池 API

use tracing::info;

use crate::error::Result;
use crate::models::PoolRecord;
use crate::reference::classes::{HostRef, Pool, PoolRef, SrRef};
use crate::session::Session;

/// 资源池 API
pub struct PoolApi<'a> {
    session: &'a Session,
}

common_api!(PoolApi, Pool, PoolRecord);

impl<'a> PoolApi<'a> {
    /// 读取主节点
    pub async fn get_master(&self, pool: &PoolRef) -> Result<HostRef> {
        self.session.rpc("pool.get_master").arg("self", pool)?.call().await
    }

    /// 读取默认存储仓库；未设置时为空引用
    pub async fn get_default_sr(&self, pool: &PoolRef) -> Result<SrRef> {
        self.session
            .rpc("pool.get_default_SR")
            .arg("self", pool)?
            .call()
            .await
    }

    pub async fn set_default_sr(&self, pool: &PoolRef, sr: &SrRef) -> Result<()> {
        info!("设置默认存储仓库: {} -> {}", pool, sr);
        self.session
            .rpc("pool.set_default_SR")
            .arg("self", pool)?
            .arg("value", sr)?
            .call()
            .await
    }
}
