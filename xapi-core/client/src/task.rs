//! 异步任务
//!
//! `Async.` 方法返回任务引用，[`TaskHandle`] 轮询任务直到终态：
//! 轮询间隔从 100ms 起指数增长到 2s，带抖动。
//! 任务对象由调用方负责销毁，等待结束后不会自动 destroy。

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use xapi_xmlrpc::xml::parse_value;
use xapi_xmlrpc::{Backoff, Value};

use crate::codec::{Context, FromXapi};
use crate::error::{ErrorCode, Result, RpcError, XapiError};
use crate::models::{TaskRecord, TaskStatusType};
use crate::reference::classes::TaskRef;
use crate::session::Session;

/// 类型化任务句柄，`R` 为任务结果类型
pub struct TaskHandle<R> {
    session: Session,
    task: TaskRef,
    method: String,
    _result: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task", &self.task)
            .field("method", &self.method)
            .finish()
    }
}

impl<R: FromXapi> TaskHandle<R> {
    /// 包装已有的任务引用
    pub fn new(session: Session, task: TaskRef, method: impl Into<String>) -> Self {
        Self {
            session,
            task,
            method: method.into(),
            _result: PhantomData,
        }
    }

    pub fn task_ref(&self) -> &TaskRef {
        &self.task
    }

    /// 读取任务记录
    pub async fn record(&self) -> Result<TaskRecord> {
        self.session.task().get_record(&self.task).await
    }

    /// 请求取消任务
    pub async fn cancel(&self) -> Result<()> {
        self.session.task().cancel(&self.task).await
    }

    /// 销毁任务对象
    pub async fn destroy(self) -> Result<()> {
        self.session.task().destroy(&self.task).await
    }

    /// 等待任务结束并返回结果
    pub async fn wait(&self) -> Result<R> {
        self.poll(None).await
    }

    /// 等待任务结束；超过 `deadline` 时尽力取消任务并返回超时
    pub async fn wait_with_deadline(&self, deadline: Duration) -> Result<R> {
        self.poll(Some(deadline)).await
    }

    async fn poll(&self, deadline: Option<Duration>) -> Result<R> {
        let settings = &self.session.config().task_poll;
        let mut backoff = Backoff::new(settings.initial_interval, settings.max_interval, 2.0, settings.jitter);
        let started = Instant::now();

        loop {
            let record = match deadline {
                None => self.record().await?,
                Some(deadline) => {
                    let remaining = deadline.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return Err(self.expire(deadline).await);
                    }
                    match tokio::time::timeout(remaining, self.record_within(remaining)).await {
                        Ok(Ok(record)) => record,
                        Ok(Err(XapiError::Timeout(_))) | Err(_) => return Err(self.expire(deadline).await),
                        Ok(Err(e)) => return Err(e),
                    }
                }
            };
            debug!(
                "任务 {} ({}) 状态: {}，进度 {:.0}%",
                self.task,
                self.method,
                record.status,
                record.progress * 100.0
            );

            match record.status {
                TaskStatusType::Success => return self.extract(&record),
                TaskStatusType::Failure => return Err(self.failure(record.error_info)),
                TaskStatusType::Cancelled => return Err(XapiError::TaskCancelled(self.task.to_string())),
                TaskStatusType::Unrecognized(ref raw) => {
                    warn!("任务 {} 状态未识别: {:?}，继续轮询", self.task, raw);
                }
                _ => {}
            }

            let mut delay = backoff.next_delay();
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return Err(self.expire(deadline).await);
                }
                delay = delay.min(remaining);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// 以剩余时间作为单次调用截止时间读取任务记录
    async fn record_within(&self, remaining: Duration) -> Result<TaskRecord> {
        self.session
            .rpc("task.get_record")
            .arg("self", &self.task)?
            .timeout(remaining)
            .call()
            .await
    }

    async fn expire(&self, deadline: Duration) -> XapiError {
        warn!("任务 {} 超过截止时间 {:?}，尝试取消", self.task, deadline);
        if let Err(e) = self.cancel().await {
            warn!("取消任务 {} 失败（已忽略）: {}", self.task, e);
        }
        XapiError::Timeout(deadline)
    }

    fn extract(&self, record: &TaskRecord) -> Result<R> {
        let cx = Context::new(format!("{}.result", self.method)).strict(self.session.config().strict_decoding);
        R::from_xapi(&parse_task_result(&record.result), &cx)
    }

    fn failure(&self, error_info: Vec<String>) -> XapiError {
        let error = RpcError::from_parts(self.method.clone(), error_info);
        if error.code == ErrorCode::TaskCancelled {
            XapiError::TaskCancelled(self.task.to_string())
        } else {
            XapiError::TaskFailed(error)
        }
    }
}

/// 解析任务结果字段
///
/// 结果是 XML-RPC `<value>` 文档时按值解析，否则按原始字符串处理。
pub fn parse_task_result(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with("<value") {
        match parse_value(trimmed) {
            Ok(value) => return value,
            Err(e) => debug!("任务结果不是合法的 XML-RPC 值，按字符串处理: {}", e),
        }
    }
    Value::String(raw.to_string())
}
