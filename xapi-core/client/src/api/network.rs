//! 网络 API

use crate::error::Result;
use crate::models::NetworkRecord;
use crate::reference::classes::{Network, NetworkRef};
use crate::session::Session;

/// 网络 API
pub struct NetworkApi<'a> {
    session: &'a Session,
}

common_api!(NetworkApi, Network, NetworkRecord);

impl<'a> NetworkApi<'a> {
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<NetworkRef>> {
        self.session
            .rpc("network.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    /// 读取网桥名称
    pub async fn get_bridge(&self, network: &NetworkRef) -> Result<String> {
        self.session
            .rpc("network.get_bridge")
            .arg("self", network)?
            .call()
            .await
    }
}
