//! 会话管理
//!
//! 会话保存服务端地址、会话引用与登录凭据，并负责两类透明恢复：
//!
//! - **协调者重定向**：调用返回 `HOST_IS_SLAVE` 时切换到协调者地址并重试一次
//! - **会话续期**：调用返回 `SESSION_INVALID` 时用保存的凭据重新登录并重试一次
//!
//! 每次调用开始时对 `{endpoint, ref}` 做快照，网络往返期间不持有锁；
//! 重定向与续期在写锁下安装新快照并递增代数。

use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;
use xapi_xmlrpc::{CallOptions, HttpTransport, RpcTransport, Value};

use crate::api::{
    CrashdumpApi, EventApi, HostApi, NetworkApi, PbdApi, PoolApi, PvsSiteApi, SessionApi, SrApi,
    TaskApi, VbdApi, VdiApi, VmApi,
};
use crate::call::RpcCall;
use crate::codec::{Context, FromXapi};
use crate::config::{ClientConfig, Credentials};
use crate::envelope::Envelope;
use crate::error::{ErrorCode, Result, RpcError, XapiError};
use crate::reference::classes::SessionRef;

const LOGIN_METHOD: &str = "session.login_with_password";
const TOKEN_CHECK_METHOD: &str = "session.get_uuid";
const LOGOUT_METHOD: &str = "session.logout";

/// 服务端 API 版本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: i64,
    pub minor: i64,
    /// xapi 软件版本（`software_version["xapi"]`）
    pub xapi_version: Option<String>,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// 会话可变状态快照
#[derive(Debug, Clone)]
struct SessionState {
    endpoint: Url,
    session_ref: Option<SessionRef>,
    /// 每次重定向或续期递增
    generation: u64,
}

struct SessionInner {
    transport: Arc<dyn RpcTransport>,
    config: ClientConfig,
    state: RwLock<SessionState>,
    credentials: Mutex<Option<Credentials>>,
    /// 串行化登录、续期与登出
    relogin: Mutex<()>,
    api_version: RwLock<Option<ApiVersion>>,
}

/// XAPI 会话
///
/// 可廉价克隆，克隆体共享同一会话状态与连接池。
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// 使用 HTTP 传输创建会话（尚未登录）
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.transport.clone())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// 使用自定义传输创建会话
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn RpcTransport>) -> Self {
        let state = SessionState {
            endpoint: config.endpoint.clone(),
            session_ref: None,
            generation: 0,
        };
        Self {
            inner: Arc::new(SessionInner {
                transport,
                config,
                state: RwLock::new(state),
                credentials: Mutex::new(None),
                relogin: Mutex::new(()),
                api_version: RwLock::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// 当前会话引用
    pub async fn session_ref(&self) -> Option<SessionRef> {
        self.inner.state.read().await.session_ref.clone()
    }

    /// 当前服务端地址（重定向后为协调者地址）
    pub async fn endpoint(&self) -> Url {
        self.inner.state.read().await.endpoint.clone()
    }

    /// 状态代数
    pub async fn generation(&self) -> u64 {
        self.inner.state.read().await.generation
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.state.read().await.session_ref.is_some()
    }

    // ============================================
    // 登录 / 登出
    // ============================================

    /// 使用配置中的凭据登录
    pub async fn login(&self) -> Result<SessionRef> {
        let credentials = self
            .inner
            .config
            .credentials
            .clone()
            .ok_or_else(|| XapiError::Auth("配置中没有登录凭据".to_string()))?;
        self.login_with(credentials).await
    }

    /// 用户名密码登录
    pub async fn login_with_password(&self, username: &str, password: &str) -> Result<SessionRef> {
        self.login_with(Credentials::password(username, password)).await
    }

    /// 采用外部签发的会话引用
    pub async fn login_with_token(&self, token: &str) -> Result<SessionRef> {
        self.login_with(Credentials::token(token)).await
    }

    async fn login_with(&self, credentials: Credentials) -> Result<SessionRef> {
        let _gate = self.inner.relogin.lock().await;
        let session_ref = self.authenticate(&credentials).await?;
        *self.inner.credentials.lock().await = Some(credentials);
        Ok(session_ref)
    }

    /// 登出
    ///
    /// 尽力而为且幂等：服务端报错只记录日志，重复登出直接返回。
    /// 保存的凭据随之清除。
    pub async fn logout(&self) -> Result<()> {
        let _gate = self.inner.relogin.lock().await;
        self.inner.credentials.lock().await.take();

        let (endpoint, session_ref) = {
            let mut state = self.inner.state.write().await;
            let session_ref = state.session_ref.take();
            if session_ref.is_some() {
                state.generation += 1;
            }
            (state.endpoint.clone(), session_ref)
        };

        let Some(session_ref) = session_ref else {
            debug!("会话未登录，跳过登出");
            return Ok(());
        };

        let params = [Value::from(session_ref.as_str())];
        let outcome = self
            .inner
            .transport
            .call(&endpoint, LOGOUT_METHOD, &params, &CallOptions::default())
            .await
            .map_err(XapiError::from)
            .and_then(|reply| Envelope::classify(LOGOUT_METHOD, reply));

        match outcome {
            Ok(Envelope::Success(_)) => info!("会话已登出"),
            Ok(Envelope::Failure(e)) => warn!("登出失败（已忽略）: {}", e),
            Err(e) => warn!("登出失败（已忽略）: {}", e),
        }
        Ok(())
    }

    /// 执行登录并安装新的会话引用（调用方需持有 relogin 锁）
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionRef> {
        let session_ref = match credentials {
            Credentials::Password { username, password } => {
                info!("登录 XAPI: 用户 {}", username);
                let params = [
                    Value::from(username.as_str()),
                    Value::from(password.as_str()),
                    Value::from(self.inner.config.api_version.as_str()),
                    Value::from(self.inner.config.originator.as_str()),
                ];
                let value = self.login_call(LOGIN_METHOD, &params).await?;
                SessionRef::from_xapi(&value, &Context::new(LOGIN_METHOD).field("result"))?
            }
            Credentials::Token { token } => {
                info!("使用外部会话引用登录 XAPI");
                let params = [Value::from(token.as_str()), Value::from(token.as_str())];
                self.login_call(TOKEN_CHECK_METHOD, &params).await?;
                SessionRef::from(token.as_str())
            }
        };

        let mut state = self.inner.state.write().await;
        state.session_ref = Some(session_ref.clone());
        state.generation += 1;
        info!("XAPI 登录成功: {}", state.endpoint);
        Ok(session_ref)
    }

    /// 未认证调用（登录类方法），只处理协调者重定向
    async fn login_call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let mut redirected = false;
        loop {
            let snapshot = self.snapshot().await;
            let reply = self
                .inner
                .transport
                .call(&snapshot.endpoint, method, params, &CallOptions::default())
                .await?;

            match Envelope::classify(method, reply)? {
                Envelope::Success(value) => return Ok(value),
                Envelope::Failure(e) if e.code == ErrorCode::HostIsSlave && !redirected => {
                    redirected = true;
                    self.redirect(&snapshot, &e).await?;
                }
                Envelope::Failure(e) => return Err(XapiError::Rpc(e)),
            }
        }
    }

    // ============================================
    // 调用管线
    // ============================================

    /// 构建一次方法调用
    pub fn rpc(&self, method: impl Into<String>) -> RpcCall<'_> {
        RpcCall::new(self, method)
    }

    /// 发送调用并分类响应
    ///
    /// `authenticated` 为真时在参数前插入会话引用。重定向与续期各最多一次，
    /// 第二次出现同类错误直接返回。
    pub(crate) async fn execute(
        &self,
        method: &str,
        args: &[Value],
        authenticated: bool,
        options: &CallOptions,
    ) -> Result<Value> {
        let mut redirected = false;
        let mut renewed = false;

        loop {
            let snapshot = self.snapshot().await;

            let mut params = Vec::with_capacity(args.len() + 1);
            if authenticated {
                let session_ref = snapshot
                    .session_ref
                    .as_ref()
                    .ok_or_else(|| XapiError::Auth(format!("调用 {} 前需要先登录", method)))?;
                params.push(Value::from(session_ref.as_str()));
            }
            params.extend_from_slice(args);

            debug!("XAPI 调用: {} ({} 个参数)", method, args.len());
            let reply = self
                .inner
                .transport
                .call(&snapshot.endpoint, method, &params, options)
                .await?;

            let failure = match Envelope::classify(method, reply)? {
                Envelope::Success(value) => return Ok(value),
                Envelope::Failure(e) => e,
            };

            match failure.code {
                ErrorCode::HostIsSlave if !redirected => {
                    redirected = true;
                    self.redirect(&snapshot, &failure).await?;
                }
                ErrorCode::SessionInvalid if authenticated && !renewed => {
                    renewed = true;
                    self.renew(&snapshot).await?;
                }
                _ => return Err(XapiError::Rpc(failure)),
            }
        }
    }

    async fn snapshot(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    /// 切换到协调者地址
    async fn redirect(&self, seen: &SessionState, failure: &RpcError) -> Result<()> {
        let master = failure.param(0).ok_or_else(|| {
            XapiError::Protocol(format!("{} 返回 HOST_IS_SLAVE 但缺少协调者地址", failure.method))
        })?;

        let mut state = self.inner.state.write().await;
        if state.endpoint != seen.endpoint {
            debug!("协调者地址已被其他调用方更新: {}", state.endpoint);
            return Ok(());
        }

        let target = redirect_endpoint(&state.endpoint, master)?;
        info!("当前主机不是协调者，重定向: {} -> {}", state.endpoint, target);
        state.endpoint = target;
        state.generation += 1;
        drop(state);

        self.inner.transport.reset();
        Ok(())
    }

    /// 会话失效后重新登录
    async fn renew(&self, seen: &SessionState) -> Result<()> {
        let _gate = self.inner.relogin.lock().await;

        if self.inner.state.read().await.session_ref != seen.session_ref {
            debug!("会话已被其他调用方续期");
            return Ok(());
        }

        let credentials = self
            .inner
            .credentials
            .lock()
            .await
            .clone()
            .ok_or_else(|| XapiError::Auth("会话已失效且没有保存的凭据".to_string()))?;

        warn!("会话已失效，使用保存的凭据重新登录");
        self.authenticate(&credentials).await?;
        Ok(())
    }

    // ============================================
    // 版本探测
    // ============================================

    /// 读取池协调者的 API 版本并缓存
    pub async fn detect_api_version(&self) -> Result<ApiVersion> {
        let pools = self.pool().get_all_records().await?;
        let pool = pools
            .into_values()
            .next()
            .ok_or_else(|| XapiError::Protocol("服务端没有返回资源池".to_string()))?;
        let host = self.host().get_record(&pool.master).await?;

        let version = ApiVersion {
            major: host.api_version_major,
            minor: host.api_version_minor,
            xapi_version: host.software_version.get("xapi").cloned(),
        };
        info!("服务端 API 版本: {}", version);
        *self.inner.api_version.write().await = Some(version.clone());
        Ok(version)
    }

    /// 已缓存的 API 版本
    pub async fn api_version(&self) -> Option<ApiVersion> {
        self.inner.api_version.read().await.clone()
    }

    // ============================================
    // 类 API
    // ============================================

    /// 会话 API
    pub fn session(&self) -> SessionApi<'_> {
        SessionApi::new(self)
    }

    /// 资源池 API
    pub fn pool(&self) -> PoolApi<'_> {
        PoolApi::new(self)
    }

    /// 主机 API
    pub fn host(&self) -> HostApi<'_> {
        HostApi::new(self)
    }

    /// 虚拟机 API
    pub fn vm(&self) -> VmApi<'_> {
        VmApi::new(self)
    }

    /// 存储仓库 API
    pub fn sr(&self) -> SrApi<'_> {
        SrApi::new(self)
    }

    /// 虚拟磁盘 API
    pub fn vdi(&self) -> VdiApi<'_> {
        VdiApi::new(self)
    }

    /// 物理块设备 API
    pub fn pbd(&self) -> PbdApi<'_> {
        PbdApi::new(self)
    }

    /// 虚拟块设备 API
    pub fn vbd(&self) -> VbdApi<'_> {
        VbdApi::new(self)
    }

    /// 网络 API
    pub fn network(&self) -> NetworkApi<'_> {
        NetworkApi::new(self)
    }

    /// 任务 API
    pub fn task(&self) -> TaskApi<'_> {
        TaskApi::new(self)
    }

    /// 事件 API
    pub fn event(&self) -> EventApi<'_> {
        EventApi::new(self)
    }

    /// PVS 站点 API
    pub fn pvs_site(&self) -> PvsSiteApi<'_> {
        PvsSiteApi::new(self)
    }

    /// 崩溃转储 API
    pub fn crashdump(&self) -> CrashdumpApi<'_> {
        CrashdumpApi::new(self)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.inner.config.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// 计算重定向后的地址
///
/// `master` 可以是完整 URL，也可以只是主机名或 IP；后者保留原地址的协议、端口与路径。
fn redirect_endpoint(current: &Url, master: &str) -> Result<Url> {
    let master = master.trim();
    if master.contains("://") {
        return Url::parse(master)
            .map_err(|e| XapiError::Protocol(format!("协调者地址非法 {}: {}", master, e)));
    }

    let host = if master.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]", master)
    } else {
        master.to_string()
    };

    let mut target = current.clone();
    target
        .set_host(Some(&host))
        .map_err(|e| XapiError::Protocol(format!("协调者地址非法 {}: {}", master, e)))?;
    Ok(target)
}
