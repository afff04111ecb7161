//! 对象引用
//!
//! 服务端为每个托管对象分配不透明的引用字符串（如 `OpaqueRef:…`）。
//! `Ref<C>` 在类型层面区分不同类的引用，线路上就是原始字符串，原样往返。

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use xapi_xmlrpc::Value;

use crate::codec::{Context, FromXapi, ToXapi};
use crate::error::Result;

/// 空引用哨兵
pub const NULL_REF: &str = "OpaqueRef:NULL";

/// 服务端对象类
pub trait XapiClass: 'static {
    /// 线路上的类名（方法名前缀）
    const NAME: &'static str;
}

/// 类 `C` 的对象引用
pub struct Ref<C> {
    raw: String,
    _class: PhantomData<fn() -> C>,
}

impl<C> Ref<C> {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _class: PhantomData,
        }
    }

    /// 空引用
    pub fn null() -> Self {
        Self::new(NULL_REF)
    }

    pub fn is_null(&self) -> bool {
        self.raw == NULL_REF
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }

    /// 转换为其他类的引用（仅用于服务端返回未分类引用的场景）
    pub fn cast<D>(self) -> Ref<D> {
        Ref::new(self.raw)
    }
}

impl<C> Clone for Ref<C> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<C> PartialEq for Ref<C> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<C> Eq for Ref<C> {}

impl<C> PartialOrd for Ref<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for Ref<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<C> Hash for Ref<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<C> Default for Ref<C> {
    fn default() -> Self {
        Self::null()
    }
}

impl<C: XapiClass> fmt::Debug for Ref<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref<{}>({})", C::NAME, self.raw)
    }
}

impl<C> fmt::Display for Ref<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<C> From<&str> for Ref<C> {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<C> From<String> for Ref<C> {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<C> ToXapi for Ref<C> {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::String(self.raw.clone()))
    }
}

impl<C> FromXapi for Ref<C> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::String(raw) => {
                if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
                    Err(cx.decode_error(format!("非法引用: {:?}", raw)))
                } else {
                    Ok(Self::new(raw.clone()))
                }
            }
            other => Err(cx.mismatch("引用字符串", other)),
        }
    }
}

impl<C> Serialize for Ref<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de, C> Deserialize<'de> for Ref<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// 服务端对象类标记
pub mod classes {
    use super::{Ref, XapiClass};

    macro_rules! classes {
        ($( $(#[$meta:meta])* $marker:ident => $wire:literal, $alias:ident; )+) => {
            $(
                $(#[$meta])*
                #[derive(Debug)]
                pub enum $marker {}

                impl XapiClass for $marker {
                    const NAME: &'static str = $wire;
                }

                pub type $alias = Ref<$marker>;
            )+
        };
    }

    classes! {
        /// 会话
        Session => "session", SessionRef;
        /// 资源池
        Pool => "pool", PoolRef;
        /// 物理主机
        Host => "host", HostRef;
        /// 虚拟机
        Vm => "VM", VmRef;
        /// 存储仓库
        Sr => "SR", SrRef;
        /// 虚拟磁盘
        Vdi => "VDI", VdiRef;
        /// 物理块设备（主机与 SR 的连接）
        Pbd => "PBD", PbdRef;
        /// 虚拟块设备（VM 与 VDI 的连接）
        Vbd => "VBD", VbdRef;
        /// 网络
        Network => "network", NetworkRef;
        /// 虚拟网卡
        Vif => "VIF", VifRef;
        /// 物理网卡
        Pif => "PIF", PifRef;
        /// 异步任务
        Task => "task", TaskRef;
        /// PVS 站点
        PvsSite => "PVS_site", PvsSiteRef;
        /// 虚拟机崩溃转储
        Crashdump => "crashdump", CrashdumpRef;
    }
}

#[cfg(test)]
mod tests {
    use super::classes::*;
    use super::*;

    #[test]
    fn test_null_ref() {
        let r = VmRef::default();
        assert!(r.is_null());
        assert_eq!(r.as_str(), NULL_REF);
        assert!(!VmRef::from("OpaqueRef:1").is_null());
    }

    #[test]
    fn test_round_trip_exact() {
        let raw = "OpaqueRef:5b5e6f2a-0000-4c1a-9c0e-Upper";
        let r = SrRef::from_xapi(&Value::from(raw), &Context::new("sr")).unwrap();
        assert_eq!(r.to_xapi(&Context::new("sr")).unwrap(), Value::from(raw));
    }

    #[test]
    fn test_malformed_ref() {
        let cx = Context::new("vdi");
        assert!(VdiRef::from_xapi(&Value::from(""), &cx).is_err());
        assert!(VdiRef::from_xapi(&Value::from("OpaqueRef:a b"), &cx).is_err());
        assert!(VdiRef::from_xapi(&Value::Int(1), &cx).is_err());
    }

    #[test]
    fn test_debug_names_class() {
        assert_eq!(format!("{:?}", VdiRef::from("OpaqueRef:V1")), "Ref<VDI>(OpaqueRef:V1)");
    }
}
