//! 事件 API
//!
//! 底层调用；订阅状态机见 [`Subscription`](crate::event::Subscription)。

use std::time::Duration;

use crate::error::Result;
use crate::event::{Event, EventBatch};
use crate::session::Session;

/// 事件 API
pub struct EventApi<'a> {
    session: &'a Session,
}

impl<'a> EventApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 从 `token` 开始长轮询事件，最多阻塞 `timeout`
    ///
    /// 本次调用的传输截止时间为 `timeout` 加上常规调用超时。
    pub async fn from(&self, classes: &[String], token: &str, timeout: Duration) -> Result<EventBatch> {
        let deadline = timeout + self.session.config().transport.call_timeout;
        self.session
            .rpc("event.from")
            .arg("classes", classes)?
            .arg("token", token)?
            .arg("timeout", &timeout.as_secs_f64())?
            .timeout(deadline)
            .call()
            .await
    }

    /// 旧版接口：注册关注的类
    pub async fn register(&self, classes: &[String]) -> Result<()> {
        self.session
            .rpc("event.register")
            .arg("classes", classes)?
            .call()
            .await
    }

    pub async fn unregister(&self, classes: &[String]) -> Result<()> {
        self.session
            .rpc("event.unregister")
            .arg("classes", classes)?
            .call()
            .await
    }

    /// 旧版接口：阻塞直到有新事件
    pub async fn next(&self) -> Result<Vec<Event>> {
        let deadline = self.session.config().event_timeout + self.session.config().transport.call_timeout;
        self.session.rpc("event.next").timeout(deadline).call().await
    }

    /// 读取当前最大事件编号
    pub async fn get_current_id(&self) -> Result<i64> {
        self.session.rpc("event.get_current_id").call().await
    }

    /// 为对象注入一个空事件，返回对应令牌
    pub async fn inject(&self, class: &str, object_ref: &str) -> Result<String> {
        self.session
            .rpc("event.inject")
            .arg("class", class)?
            .arg("ref", object_ref)?
            .call()
            .await
    }
}
