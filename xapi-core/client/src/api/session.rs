//! 会话 API
//!
//! 登录与登出由 [`Session`](crate::session::Session) 负责，这里只有会话对象上的查询与改密。

use tracing::info;

use crate::error::Result;
use crate::models::SessionRecord;
use crate::reference::classes::{HostRef, SessionRef};
use crate::session::Session;

/// 会话 API
pub struct SessionApi<'a> {
    session: &'a Session,
}

impl<'a> SessionApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 读取会话记录
    pub async fn get_record(&self, session_ref: &SessionRef) -> Result<SessionRecord> {
        self.session
            .rpc("session.get_record")
            .arg("self", session_ref)?
            .call()
            .await
    }

    pub async fn get_uuid(&self, session_ref: &SessionRef) -> Result<String> {
        self.session
            .rpc("session.get_uuid")
            .arg("self", session_ref)?
            .call()
            .await
    }

    /// 读取会话所在主机
    pub async fn get_this_host(&self, session_ref: &SessionRef) -> Result<HostRef> {
        self.session
            .rpc("session.get_this_host")
            .arg("self", session_ref)?
            .call()
            .await
    }

    /// 修改当前用户密码
    pub async fn change_password(&self, old_pwd: &str, new_pwd: &str) -> Result<()> {
        info!("修改会话用户密码");
        self.session
            .rpc("session.change_password")
            .arg("old_pwd", old_pwd)?
            .arg("new_pwd", new_pwd)?
            .call()
            .await
    }
}
