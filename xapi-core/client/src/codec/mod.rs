//! 类型化编解码
//!
//! 在强类型对象模型与线路值树 (`Value`) 之间双向转换。
//! 每次转换都携带一个 [`Context`]，记录参数名路径用于错误信息，
//! 并决定是否启用严格解码（未知字段报错）。

mod macros;

pub(crate) use macros::{xapi_enum, xapi_record};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::num::IntErrorKind;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use xapi_xmlrpc::datetime::parse_datetime;
use xapi_xmlrpc::Value;

use crate::error::{Result, XapiError};
use crate::reference::NULL_REF;

/// 编解码上下文
#[derive(Debug, Clone)]
pub struct Context {
    path: String,
    strict: bool,
}

impl Context {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            strict: false,
        }
    }

    /// 严格模式：记录解码遇到未知字段时报错
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// 进入子字段
    pub fn field(&self, name: &str) -> Self {
        Self {
            path: if self.path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", self.path, name)
            },
            strict: self.strict,
        }
    }

    /// 进入数组元素
    pub fn index(&self, index: usize) -> Self {
        Self {
            path: format!("{}[{}]", self.path, index),
            strict: self.strict,
        }
    }

    pub fn decode_error(&self, message: impl Into<String>) -> XapiError {
        XapiError::Decode {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    pub fn encode_error(&self, message: impl Into<String>) -> XapiError {
        XapiError::Encode {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    /// 结构不匹配
    pub fn mismatch(&self, expected: &str, got: &Value) -> XapiError {
        self.decode_error(format!("期望 {}，实际为 {}", expected, got.kind()))
    }
}

/// 编码为线路值
pub trait ToXapi {
    fn to_xapi(&self, cx: &Context) -> Result<Value>;
}

/// 从线路值解码
pub trait FromXapi: Sized {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self>;
}

/// 以 `path` 为根路径编码
pub fn encode<T: ToXapi + ?Sized>(value: &T, path: &str) -> Result<Value> {
    value.to_xapi(&Context::new(path))
}

/// 以 `path` 为根路径解码
pub fn decode<T: FromXapi>(value: &Value, path: &str) -> Result<T> {
    T::from_xapi(value, &Context::new(path))
}

/// 检查记录中的未知字段
pub(crate) fn check_unknown_fields(
    members: &BTreeMap<String, Value>,
    known: &[&str],
    cx: &Context,
) -> Result<()> {
    for key in members.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        if cx.is_strict() {
            return Err(cx.field(key).decode_error("未知字段"));
        }
        trace!("忽略未知字段: {}", cx.field(key).path());
    }
    Ok(())
}

// ============================================
// 标量
// ============================================

impl<T: ToXapi + ?Sized> ToXapi for &T {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        (**self).to_xapi(cx)
    }
}

impl ToXapi for str {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }
}

impl ToXapi for String {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }
}

impl FromXapi for String {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(cx.mismatch("string", other)),
        }
    }
}

impl ToXapi for bool {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::Boolean(*self))
    }
}

impl FromXapi for bool {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(cx.mismatch("boolean", other)),
        }
    }
}

impl ToXapi for i64 {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::Int(*self))
    }
}

/// 整数既可能以 int 传输，也可能以十进制字符串传输（超出 32 位时）
impl FromXapi for i64 {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::String(s) => s.trim().parse::<i64>().map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    cx.decode_error(format!("整数超出 64 位范围: {}", s))
                }
                _ => cx.decode_error(format!("非法整数: {:?}", s)),
            }),
            other => Err(cx.mismatch("int", other)),
        }
    }
}

impl ToXapi for u64 {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        i64::try_from(*self)
            .map(Value::Int)
            .map_err(|_| cx.encode_error(format!("整数超出 64 位有符号范围: {}", self)))
    }
}

impl FromXapi for u64 {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        let signed = i64::from_xapi(value, cx)?;
        u64::try_from(signed).map_err(|_| cx.decode_error(format!("期望非负整数，实际为 {}", signed)))
    }
}

impl ToXapi for f64 {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::Double(*self))
    }
}

impl FromXapi for f64 {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::Double(d) => Ok(*d),
            Value::Int(i) => Ok(*i as f64),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| cx.decode_error(format!("非法浮点数: {:?}", s))),
            other => Err(cx.mismatch("double", other)),
        }
    }
}

impl ToXapi for DateTime<Utc> {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::DateTime(*self))
    }
}

impl FromXapi for DateTime<Utc> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::DateTime(t) => Ok(*t),
            Value::String(s) => parse_datetime(s).ok_or_else(|| cx.decode_error(format!("非法时间: {:?}", s))),
            other => Err(cx.mismatch("dateTime.iso8601", other)),
        }
    }
}

/// 二进制块
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob(pub Vec<u8>);

impl ToXapi for Blob {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(Value::Base64(self.0.clone()))
    }
}

impl FromXapi for Blob {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::Base64(bytes) => Ok(Self(bytes.clone())),
            Value::String(s) => STANDARD
                .decode(s.trim())
                .map(Self)
                .map_err(|e| cx.decode_error(format!("非法 base64: {}", e))),
            other => Err(cx.mismatch("base64", other)),
        }
    }
}

/// 无返回值的方法，服务端通常返回空字符串
impl FromXapi for () {
    fn from_xapi(_value: &Value, _cx: &Context) -> Result<Self> {
        Ok(())
    }
}

impl ToXapi for Value {
    fn to_xapi(&self, _cx: &Context) -> Result<Value> {
        Ok(self.clone())
    }
}

impl FromXapi for Value {
    fn from_xapi(value: &Value, _cx: &Context) -> Result<Self> {
        Ok(value.clone())
    }
}

// ============================================
// 可选值：None 以空引用哨兵传输
// ============================================

impl<T: ToXapi> ToXapi for Option<T> {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        match self {
            Some(inner) => inner.to_xapi(cx),
            None => Ok(Value::from(NULL_REF)),
        }
    }
}

impl<T: FromXapi> FromXapi for Option<T> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        match value {
            Value::String(s) if s == NULL_REF => Ok(None),
            other => T::from_xapi(other, cx).map(Some),
        }
    }
}

// ============================================
// 集合
// ============================================

fn encode_seq<'a, T, I>(items: I, cx: &Context) -> Result<Value>
where
    T: ToXapi + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| item.to_xapi(&cx.index(i)))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn decode_seq<T: FromXapi>(value: &Value, cx: &Context) -> Result<Vec<T>> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_xapi(item, &cx.index(i)))
            .collect(),
        other => Err(cx.mismatch("array", other)),
    }
}

impl<T: ToXapi> ToXapi for Vec<T> {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        encode_seq(self, cx)
    }
}

impl<T: ToXapi> ToXapi for [T] {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        encode_seq(self, cx)
    }
}

impl<T: FromXapi> FromXapi for Vec<T> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        decode_seq(value, cx)
    }
}

impl<T: ToXapi> ToXapi for HashSet<T> {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        encode_seq(self, cx)
    }
}

impl<T: FromXapi + Eq + Hash> FromXapi for HashSet<T> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        let mut set = HashSet::new();
        for (i, item) in decode_seq::<T>(value, cx)?.into_iter().enumerate() {
            if !set.insert(item) {
                return Err(cx.index(i).decode_error("集合中存在重复元素"));
            }
        }
        Ok(set)
    }
}

impl<T: ToXapi> ToXapi for BTreeSet<T> {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        encode_seq(self, cx)
    }
}

impl<T: FromXapi + Ord> FromXapi for BTreeSet<T> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        let mut set = BTreeSet::new();
        for (i, item) in decode_seq::<T>(value, cx)?.into_iter().enumerate() {
            if !set.insert(item) {
                return Err(cx.index(i).decode_error("集合中存在重复元素"));
            }
        }
        Ok(set)
    }
}

// ============================================
// 映射
//
// 键全部编码为字符串时以 struct 传输，否则以 `[[K, V], …]` 传输。
// 解码两种形式均接受；解码后出现重复键报错。
// ============================================

fn encode_map<'a, K, V, I>(entries: I, cx: &Context) -> Result<Value>
where
    K: ToXapi + 'a,
    V: ToXapi + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut pairs = Vec::new();
    for (i, (key, value)) in entries.into_iter().enumerate() {
        let key = key.to_xapi(&cx.index(i))?;
        let value_cx = match &key {
            Value::String(name) => cx.field(name),
            _ => cx.index(i),
        };
        pairs.push((key, value.to_xapi(&value_cx)?));
    }

    if pairs.iter().all(|(key, _)| matches!(key, Value::String(_))) {
        let members = pairs
            .into_iter()
            .filter_map(|(key, value)| match key {
                Value::String(name) => Some((name, value)),
                _ => None,
            })
            .collect();
        Ok(Value::Struct(members))
    } else {
        Ok(Value::Array(
            pairs
                .into_iter()
                .map(|(key, value)| Value::Array(vec![key, value]))
                .collect(),
        ))
    }
}

fn decode_map<K, V, M, F>(value: &Value, cx: &Context, mut insert: F) -> Result<M>
where
    K: FromXapi,
    V: FromXapi,
    M: Default,
    F: FnMut(&mut M, K, V) -> bool,
{
    let mut map = M::default();
    match value {
        Value::Struct(members) => {
            for (name, member) in members {
                let entry_cx = cx.field(name);
                let key = K::from_xapi(&Value::String(name.clone()), &entry_cx)?;
                let value = V::from_xapi(member, &entry_cx)?;
                if !insert(&mut map, key, value) {
                    return Err(entry_cx.decode_error("映射中存在重复的键"));
                }
            }
        }
        Value::Array(pairs) => {
            for (i, pair) in pairs.iter().enumerate() {
                let entry_cx = cx.index(i);
                let (key, value) = match pair {
                    Value::Array(kv) if kv.len() == 2 => (&kv[0], &kv[1]),
                    other => return Err(entry_cx.mismatch("二元数组 [key, value]", other)),
                };
                let key = K::from_xapi(key, &entry_cx)?;
                let value = V::from_xapi(value, &entry_cx)?;
                if !insert(&mut map, key, value) {
                    return Err(entry_cx.decode_error("映射中存在重复的键"));
                }
            }
        }
        other => return Err(cx.mismatch("struct 或 array", other)),
    }
    Ok(map)
}

impl<K: ToXapi, V: ToXapi, S> ToXapi for HashMap<K, V, S> {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        encode_map(self, cx)
    }
}

impl<K, V, S> FromXapi for HashMap<K, V, S>
where
    K: FromXapi + Eq + Hash,
    V: FromXapi,
    S: std::hash::BuildHasher + Default,
{
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        decode_map(value, cx, |map: &mut HashMap<K, V, S>, key: K, value: V| {
            map.insert(key, value).is_none()
        })
    }
}

impl<K: ToXapi, V: ToXapi> ToXapi for BTreeMap<K, V> {
    fn to_xapi(&self, cx: &Context) -> Result<Value> {
        encode_map(self, cx)
    }
}

impl<K: FromXapi + Ord, V: FromXapi> FromXapi for BTreeMap<K, V> {
    fn from_xapi(value: &Value, cx: &Context) -> Result<Self> {
        decode_map(value, cx, |map: &mut BTreeMap<K, V>, key: K, value: V| {
            map.insert(key, value).is_none()
        })
    }
}
