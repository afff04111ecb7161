//! XML-RPC 值模型

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// XML-RPC 线路值
///
/// 覆盖 XAPI 使用的全部线路类型。时间统一按 UTC 解释，
/// 线路精度为秒。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 有符号 64 位整数
    Int(i64),
    /// 双精度浮点
    Double(f64),
    /// 布尔值
    Boolean(bool),
    /// 字符串
    String(String),
    /// ISO-8601 时间（无时区，按 UTC 解释）
    DateTime(DateTime<Utc>),
    /// base64 二进制块
    Base64(Vec<u8>),
    /// 数组
    Array(Vec<Value>),
    /// 结构体（成员名 -> 值）
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// 类型名称（用于错误信息）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
            Self::DateTime(_) => "dateTime.iso8601",
            Self::Base64(_) => "base64",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// 读取结构体成员
    pub fn member(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(name))
    }

    /// 从成员列表构建结构体
    pub fn structure<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::DateTime(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}
