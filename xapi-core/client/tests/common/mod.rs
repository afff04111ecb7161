//! 测试用脚本化传输
//!
//! 记录每次调用的地址、方法与参数，按处理函数或预置序列返回响应信封。

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use xapi_client::{ClientConfig, Credentials, Session, TaskPollConfig, Value};
use xapi_xmlrpc::{CallOptions, RpcTransport, XmlRpcError};

/// 一次已记录的调用
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Url,
    pub method: String,
    pub params: Vec<Value>,
    pub timeout: Option<Duration>,
}

impl RecordedCall {
    pub fn param_str(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(Value::as_str)
    }

    pub fn host(&self) -> &str {
        self.endpoint.host_str().unwrap_or_default()
    }
}

type Handler = Box<dyn Fn(&RecordedCall) -> Result<Value, XmlRpcError> + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
    delays: Mutex<HashMap<String, Duration>>,
    resets: AtomicUsize,
}

impl ScriptedTransport {
    /// 由处理函数决定每次调用的响应
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&RecordedCall) -> Result<Value, XmlRpcError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            resets: AtomicUsize::new(0),
        })
    }

    /// 按顺序返回预置响应，用完后返回协议错误
    pub fn sequence(replies: Vec<Value>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |call| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| XmlRpcError::Parse(format!("没有为 {} 预置响应", call.method)))
        })
    }

    /// 让某个方法在响应前等待；超过调用截止时间时返回超时
    pub fn delay(&self, method: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(method.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: &[Value],
        options: &CallOptions,
    ) -> xapi_xmlrpc::Result<Value> {
        let call = RecordedCall {
            endpoint: endpoint.clone(),
            method: method.to_string(),
            params: params.to_vec(),
            timeout: options.timeout,
        };
        self.calls.lock().unwrap().push(call.clone());
        let delay = self.delays.lock().unwrap().get(method).copied();
        match (delay, options.timeout) {
            (Some(delay), Some(timeout)) if delay > timeout => {
                tokio::time::sleep(timeout).await;
                return Err(XmlRpcError::Timeout(timeout));
            }
            (Some(delay), _) => tokio::time::sleep(delay).await,
            (None, _) => tokio::task::yield_now().await,
        }
        (self.handler)(&call)
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// 成功信封
pub fn success(value: impl Into<Value>) -> Value {
    Value::structure([("Status", Value::from("Success")), ("Value", value.into())])
}

/// 失败信封
pub fn failure(parts: &[&str]) -> Value {
    Value::structure([
        ("Status", Value::from("Failure")),
        (
            "Value",
            Value::Array(parts.iter().map(|p| Value::from(*p)).collect()),
        ),
    ])
}

pub fn refs(raw: &[&str]) -> Value {
    Value::Array(raw.iter().map(|r| Value::from(*r)).collect())
}

/// 按 RUST_LOG 输出日志
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config(endpoint: &str) -> ClientConfig {
    let mut config = ClientConfig::new(endpoint)
        .unwrap()
        .with_credentials(Credentials::password("root", "xyz"));
    config.task_poll = TaskPollConfig {
        initial_interval: Duration::from_millis(100),
        max_interval: Duration::from_millis(400),
        jitter: 0.0,
    };
    config
}

pub fn session(endpoint: &str, transport: Arc<ScriptedTransport>) -> Session {
    init_tracing();
    Session::with_transport(config(endpoint), transport)
}
