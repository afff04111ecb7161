//! 事件订阅
//!
//! 基于令牌的长轮询（`event.from`）：每批事件附带新令牌，下一次轮询从该令牌继续。
//! 服务端事件队列溢出时返回 `EVENTS_LOST`，订阅进入 `LostEvents`，
//! 调用 [`Subscription::resync`] 拉取全量快照并把令牌重置为空后恢复。
//!
//! 状态机：
//!
//! ```text
//! Idle -> Subscribing -> Live -> (LostEvents -> Resynchronizing -> Live) | Closed
//! ```
//!
//! 旧版 register / next 接口由 [`LegacySubscription`] 提供，溢出语义相同。

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xapi_xmlrpc::datetime::parse_datetime;
use xapi_xmlrpc::Value;

use crate::codec::{Context, FromXapi};
use crate::error::{ErrorCode, Result, RpcError, XapiError};
use crate::models::EventOperation;
use crate::session::Session;

/// 订阅全部类的通配符
pub const ALL_CLASSES: &str = "*";

/// 单个事件
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub timestamp: Option<DateTime<Utc>>,
    /// 对象类名
    pub class: String,
    pub operation: EventOperation,
    /// 对象引用
    pub reference: String,
    pub obj_uuid: String,
    /// 对象快照；删除事件为 None
    pub snapshot: Option<Value>,
}

impl Event {
    /// 把快照解码为具体记录类型
    pub fn snapshot_as<T: FromXapi>(&self) -> Result<Option<T>> {
        let cx = Context::new(format!("event[{}].snapshot", self.id));
        self.snapshot.as_ref().map(|v| T::from_xapi(v, &cx)).transpose()
    }
}

impl FromXapi for Event {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        let members = match value {
            Value::Struct(members) => members,
            other => return Err(cx.mismatch("struct", other)),
        };

        fn field<T: FromXapi + Default>(
            members: &std::collections::BTreeMap<String, Value>,
            name: &str,
            cx: &Context,
        ) -> Result<T> {
            match members.get(name) {
                Some(v) => T::from_xapi(v, &cx.field(name)),
                None => Ok(T::default()),
            }
        }

        let operation: EventOperation = field(members, "operation", cx)?;
        let snapshot = match operation {
            EventOperation::Del => None,
            _ => members.get("snapshot").cloned(),
        };

        Ok(Self {
            id: field(members, "id", cx)?,
            timestamp: members
                .get("timestamp")
                .map(|v| decode_timestamp(v, &cx.field("timestamp")))
                .transpose()?,
            class: field(members, "class", cx)?,
            operation,
            reference: field(members, "ref", cx)?,
            obj_uuid: field(members, "obj_uuid", cx)?,
            snapshot,
        })
    }
}

/// 事件时间戳既可能是 ISO-8601，也可能是 Unix 秒（带小数）字符串
fn decode_timestamp(value: &Value, cx: &Context) -> Result<DateTime<Utc>> {
    match value {
        Value::DateTime(t) => Ok(*t),
        Value::String(raw) => {
            if let Some(t) = parse_datetime(raw) {
                return Ok(t);
            }
            raw.trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| {
                    let whole = secs.trunc() as i64;
                    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
                    Utc.timestamp_opt(whole, nanos).single()
                })
                .ok_or_else(|| cx.decode_error(format!("非法时间戳: {:?}", raw)))
        }
        Value::Double(secs) => Utc
            .timestamp_opt(secs.trunc() as i64, 0)
            .single()
            .ok_or_else(|| cx.decode_error(format!("非法时间戳: {}", secs))),
        other => Err(cx.mismatch("时间戳", other)),
    }
}

/// 一批事件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    /// 下一次轮询使用的令牌
    pub token: String,
    /// 各类对象当前的有效引用数
    pub valid_ref_counts: HashMap<String, i64>,
    pub events: Vec<Event>,
}

impl EventBatch {
    /// 空批次为保活响应
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl FromXapi for EventBatch {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        let members = match value {
            Value::Struct(members) => members,
            other => return Err(cx.mismatch("struct", other)),
        };
        let token = match members.get("token") {
            Some(v) => String::from_xapi(v, &cx.field("token"))?,
            None => return Err(cx.field("token").decode_error("缺少令牌")),
        };
        Ok(Self {
            token,
            valid_ref_counts: match members.get("valid_ref_counts") {
                Some(v) => FromXapi::from_xapi(v, &cx.field("valid_ref_counts"))?,
                None => HashMap::new(),
            },
            events: match members.get("events") {
                Some(v) => FromXapi::from_xapi(v, &cx.field("events"))?,
                None => Vec::new(),
            },
        })
    }
}

/// 令牌比较：`current` 是否已经覆盖 `event.inject` 返回的 `injected`
///
/// 令牌不透明，只按字典序比较。
pub fn token_has_reached(current: &str, injected: &str) -> bool {
    !current.is_empty() && current >= injected
}

/// 订阅状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// 尚未发起轮询
    Idle,
    /// 首次轮询进行中
    Subscribing,
    /// 正常接收事件
    Live,
    /// 事件丢失，等待重新同步
    LostEvents,
    /// 已拉取快照，等待首次轮询确认
    Resynchronizing,
    /// 已关闭
    Closed,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Subscribing => "subscribing",
            Self::Live => "live",
            Self::LostEvents => "lost-events",
            Self::Resynchronizing => "resynchronizing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// 关闭句柄，可在其他任务中中止进行中的长轮询
#[derive(Debug, Clone)]
pub struct SubscriptionCloser {
    cancel: CancellationToken,
}

impl SubscriptionCloser {
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// 全量快照：类名 -> `{引用: 记录}` 原始值
pub type ResyncSnapshot = HashMap<String, Value>;

async fn snapshot_classes(session: &Session, classes: &[String]) -> Result<ResyncSnapshot> {
    let mut snapshot = HashMap::new();
    for class in classes.iter().filter(|c| c.as_str() != ALL_CLASSES) {
        let records: Value = session
            .rpc(format!("{}.get_all_records", class))
            .call()
            .await?;
        snapshot.insert(class.clone(), records);
    }
    Ok(snapshot)
}

fn lost_events(method: &str) -> XapiError {
    XapiError::Rpc(RpcError {
        method: method.to_string(),
        code: ErrorCode::EventsLost,
        params: Vec::new(),
    })
}

/// 基于令牌的事件订阅
pub struct Subscription {
    session: Session,
    classes: Vec<String>,
    token: String,
    timeout: Duration,
    state: SubscriptionState,
    cancel: CancellationToken,
}

impl Subscription {
    /// 订阅给定的类，从空令牌开始
    pub fn new<I, S>(session: Session, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let timeout = session.config().event_timeout;
        Self {
            session,
            classes: classes.into_iter().map(Into::into).collect(),
            token: String::new(),
            timeout,
            state: SubscriptionState::Idle,
            cancel: CancellationToken::new(),
        }
    }

    /// 从已保存的令牌继续
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// 长轮询时长
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn closer(&self) -> SubscriptionCloser {
        SubscriptionCloser {
            cancel: self.cancel.clone(),
        }
    }

    /// 当前令牌是否已覆盖注入的令牌
    pub fn has_reached(&self, injected: &str) -> bool {
        token_has_reached(&self.token, injected)
    }

    /// 拉取下一批事件
    ///
    /// 空批次表示保活。返回 `EVENTS_LOST` 后需先调用 [`resync`](Self::resync)。
    pub async fn next_batch(&mut self) -> Result<EventBatch> {
        if self.cancel.is_cancelled() {
            self.state = SubscriptionState::Closed;
        }
        match self.state {
            SubscriptionState::Closed => return Err(XapiError::SubscriptionClosed),
            SubscriptionState::LostEvents => return Err(lost_events("event.from")),
            SubscriptionState::Idle => self.state = SubscriptionState::Subscribing,
            _ => {}
        }
        let previous = self.state;

        let poll = {
            let session = self.session.clone();
            let classes = self.classes.clone();
            let token = self.token.clone();
            let timeout = self.timeout;
            async move { session.event().from(&classes, &token, timeout).await }
        };

        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            result = poll => Some(result),
        };

        match outcome {
            None => {
                info!("事件订阅已关闭");
                self.state = SubscriptionState::Closed;
                Err(XapiError::SubscriptionClosed)
            }
            Some(Ok(batch)) => {
                debug!("收到 {} 个事件，新令牌 {}", batch.events.len(), batch.token);
                self.token = batch.token.clone();
                self.state = SubscriptionState::Live;
                Ok(batch)
            }
            Some(Err(e)) if e.is_code(&ErrorCode::EventsLost) => {
                warn!("事件队列溢出，订阅需要重新同步");
                self.state = SubscriptionState::LostEvents;
                Err(e)
            }
            Some(Err(e)) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// 重新同步：拉取订阅类的全量记录并把令牌重置为空
    pub async fn resync(&mut self) -> Result<ResyncSnapshot> {
        if self.state == SubscriptionState::Closed {
            return Err(XapiError::SubscriptionClosed);
        }
        info!("重新同步事件订阅: {:?}", self.classes);

        let snapshot = snapshot_classes(&self.session, &self.classes).await?;
        self.token.clear();
        self.state = SubscriptionState::Resynchronizing;
        Ok(snapshot)
    }

    /// 关闭订阅，中止进行中的长轮询
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.state = SubscriptionState::Closed;
    }
}

/// 旧版 register / next 订阅
pub struct LegacySubscription {
    session: Session,
    classes: Vec<String>,
    state: SubscriptionState,
    cancel: CancellationToken,
}

impl LegacySubscription {
    pub fn new<I, S>(session: Session, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            session,
            classes: classes.into_iter().map(Into::into).collect(),
            state: SubscriptionState::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn closer(&self) -> SubscriptionCloser {
        SubscriptionCloser {
            cancel: self.cancel.clone(),
        }
    }

    /// 注册订阅类
    pub async fn register(&mut self) -> Result<()> {
        if self.state == SubscriptionState::Closed {
            return Err(XapiError::SubscriptionClosed);
        }
        self.state = SubscriptionState::Subscribing;
        self.session.event().register(&self.classes).await?;
        self.state = SubscriptionState::Live;
        Ok(())
    }

    /// 阻塞直到有事件；长轮询超时返回空列表
    pub async fn next(&mut self) -> Result<Vec<Event>> {
        if self.cancel.is_cancelled() {
            self.state = SubscriptionState::Closed;
        }
        match self.state {
            SubscriptionState::Closed => return Err(XapiError::SubscriptionClosed),
            SubscriptionState::LostEvents => return Err(lost_events("event.next")),
            SubscriptionState::Idle => {
                return Err(XapiError::Auth("需要先调用 register 注册事件".to_string()))
            }
            _ => {}
        }

        let poll = {
            let session = self.session.clone();
            async move { session.event().next().await }
        };
        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            result = poll => Some(result),
        };

        match outcome {
            None => {
                info!("旧版事件订阅已关闭");
                self.state = SubscriptionState::Closed;
                Err(XapiError::SubscriptionClosed)
            }
            Some(Ok(events)) => {
                self.state = SubscriptionState::Live;
                Ok(events)
            }
            Some(Err(XapiError::Timeout(_))) => Ok(Vec::new()),
            Some(Err(e)) if e.is_code(&ErrorCode::EventsLost) => {
                warn!("事件队列溢出，旧版订阅需要重新同步");
                self.state = SubscriptionState::LostEvents;
                Err(e)
            }
            Some(Err(e)) => Err(e),
        }
    }

    /// 重新同步：注销后拉取全量快照再重新注册
    pub async fn resync(&mut self) -> Result<ResyncSnapshot> {
        if self.state == SubscriptionState::Closed {
            return Err(XapiError::SubscriptionClosed);
        }
        info!("重新同步旧版事件订阅: {:?}", self.classes);

        if let Err(e) = self.session.event().unregister(&self.classes).await {
            debug!("注销事件失败（已忽略）: {}", e);
        }
        let snapshot = snapshot_classes(&self.session, &self.classes).await?;
        self.session.event().register(&self.classes).await?;
        self.state = SubscriptionState::Resynchronizing;
        Ok(snapshot)
    }

    /// 关闭订阅并尽力注销
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if self.state != SubscriptionState::Closed && self.state != SubscriptionState::Idle {
            if let Err(e) = self.session.event().unregister(&self.classes).await {
                debug!("注销事件失败（已忽略）: {}", e);
            }
        }
        self.state = SubscriptionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_has_reached() {
        assert!(token_has_reached("00000000000000000012,00000000000000000000", "00000000000000000012,00000000000000000000"));
        assert!(token_has_reached("00000000000000000013,0", "00000000000000000012,0"));
        assert!(!token_has_reached("00000000000000000011,0", "00000000000000000012,0"));
        assert!(!token_has_reached("", "0"));
    }

    #[test]
    fn test_decode_event() {
        let value = Value::structure([
            ("id", Value::from("42")),
            ("timestamp", Value::from("1700000000.500")),
            ("class", Value::from("vm")),
            ("operation", Value::from("mod")),
            ("ref", Value::from("OpaqueRef:r")),
            ("obj_uuid", Value::from("u-1")),
            ("snapshot", Value::structure([("uuid", Value::from("u-1"))])),
        ]);
        let event = Event::from_xapi(&value, &Context::new("event")).unwrap();
        assert_eq!(event.id, 42);
        assert_eq!(event.timestamp.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(event.operation, EventOperation::Mod);
        assert_eq!(event.reference, "OpaqueRef:r");
        assert!(event.snapshot.is_some());
    }

    #[test]
    fn test_delete_event_has_no_snapshot() {
        let value = Value::structure([
            ("id", Value::Int(1)),
            ("timestamp", Value::from("20240101T00:00:00Z")),
            ("class", Value::from("SR")),
            ("operation", Value::from("del")),
            ("ref", Value::from("OpaqueRef:x")),
            ("snapshot", Value::structure([("uuid", Value::from("gone"))])),
        ]);
        let event = Event::from_xapi(&value, &Context::new("event")).unwrap();
        assert_eq!(event.operation, EventOperation::Del);
        assert_eq!(event.snapshot, None);
        assert_eq!(event.snapshot_as::<crate::models::SrRecord>().unwrap(), None);
    }

    #[test]
    fn test_decode_batch() {
        let value = Value::structure([
            ("token", Value::from("t1")),
            ("valid_ref_counts", Value::structure([("VM", Value::Int(3))])),
            ("events", Value::Array(vec![])),
        ]);
        let batch = EventBatch::from_xapi(&value, &Context::new("event.from")).unwrap();
        assert_eq!(batch.token, "t1");
        assert_eq!(batch.valid_ref_counts.get("VM"), Some(&3));
        assert!(batch.is_empty());

        let missing = Value::structure([("events", Value::Array(vec![]))]);
        assert!(EventBatch::from_xapi(&missing, &Context::new("event.from")).is_err());
    }
}
