//! 调用分发
//!
//! 按声明顺序编码位置参数（参数名用于错误路径），交给会话发送，
//! 再把结果解码为声明的返回类型。同步与异步两种分发共用同一路径，
//! 异步分发只是在方法名前加 `Async.` 并返回任务句柄。

use std::time::Duration;

use tracing::debug;
use xapi_xmlrpc::{CallOptions, Value};

use crate::codec::{Context, FromXapi, ToXapi};
use crate::error::Result;
use crate::reference::classes::TaskRef;
use crate::session::Session;
use crate::task::TaskHandle;

/// 异步方法前缀
pub const ASYNC_PREFIX: &str = "Async.";

/// 一次待发送的方法调用
#[must_use = "调用需要 .call() 或 .call_async() 才会发送"]
pub struct RpcCall<'a> {
    session: &'a Session,
    method: String,
    args: Vec<Value>,
    authenticated: bool,
    options: CallOptions,
    cx: Context,
}

impl<'a> RpcCall<'a> {
    pub(crate) fn new(session: &'a Session, method: impl Into<String>) -> Self {
        let method = method.into();
        let cx = Context::new(method.clone()).strict(session.config().strict_decoding);
        Self {
            session,
            method,
            args: Vec::new(),
            authenticated: true,
            options: CallOptions::default(),
            cx,
        }
    }

    /// 追加一个位置参数
    pub fn arg<T: ToXapi + ?Sized>(mut self, name: &str, value: &T) -> Result<Self> {
        let encoded = value.to_xapi(&self.cx.field(name))?;
        self.args.push(encoded);
        Ok(self)
    }

    /// 不插入会话引用
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// 覆盖本次调用的截止时间
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// 同步分发
    pub async fn call<R: FromXapi>(self) -> Result<R> {
        let value = self
            .session
            .execute(&self.method, &self.args, self.authenticated, &self.options)
            .await?;
        R::from_xapi(&value, &self.cx.field("result"))
    }

    /// 异步分发，返回任务句柄
    pub async fn call_async<R: FromXapi>(self) -> Result<TaskHandle<R>> {
        let method = format!("{}{}", ASYNC_PREFIX, self.method);
        let value = self
            .session
            .execute(&method, &self.args, self.authenticated, &self.options)
            .await?;
        let task = TaskRef::from_xapi(&value, &self.cx.field("task"))?;
        debug!("{} 已创建任务 {}", method, task);
        Ok(TaskHandle::new(self.session.clone(), task, self.method))
    }
}
