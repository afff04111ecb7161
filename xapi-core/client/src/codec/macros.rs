//! 枚举与记录的声明宏

/// 声明服务端枚举
///
/// 生成的枚举额外带一个 `Unrecognized(String)` 变体，保存未知取值的原始字符串；
/// 解析时大小写不敏感。
macro_rules! xapi_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
            /// 未识别的取值（保留原始字符串）
            Unrecognized(String),
        }

        impl $name {
            /// 全部已知的线路取值
            pub const VARIANTS: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unrecognized(raw) => raw,
                }
            }

            pub fn parse(raw: &str) -> Self {
                $(
                    if raw.eq_ignore_ascii_case($wire) {
                        return Self::$variant;
                    }
                )+
                Self::Unrecognized(raw.to_string())
            }

            pub fn is_unrecognized(&self) -> bool {
                matches!(self, Self::Unrecognized(_))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::Unrecognized(String::new())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self::parse(s))
            }
        }

        impl $crate::codec::ToXapi for $name {
            fn to_xapi(&self, _cx: &$crate::codec::Context) -> $crate::error::Result<$crate::Value> {
                Ok($crate::Value::String(self.as_str().to_string()))
            }
        }

        impl $crate::codec::FromXapi for $name {
            fn from_xapi(value: &$crate::Value, cx: &$crate::codec::Context) -> $crate::error::Result<Self> {
                match value {
                    $crate::Value::String(raw) => Ok(Self::parse(raw)),
                    other => Err(cx.mismatch("枚举字符串", other)),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::parse(&raw))
            }
        }
    };
}

/// 声明服务端记录
///
/// 每个字段以 `字段 : 类型 => "线路名"` 声明。解码时缺失的字段取默认值，
/// 未知字段被忽略（严格模式下报错）。
macro_rules! xapi_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $ty:ty => $wire:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(rename = $wire)]
                pub $field: $ty,
            )+
        }

        impl $name {
            /// 线路字段名
            pub const FIELDS: &'static [&'static str] = &[$($wire),+];
        }

        impl $crate::codec::ToXapi for $name {
            fn to_xapi(&self, cx: &$crate::codec::Context) -> $crate::error::Result<$crate::Value> {
                let mut members = std::collections::BTreeMap::new();
                $(
                    members.insert(
                        $wire.to_string(),
                        $crate::codec::ToXapi::to_xapi(&self.$field, &cx.field($wire))?,
                    );
                )+
                Ok($crate::Value::Struct(members))
            }
        }

        impl $crate::codec::FromXapi for $name {
            fn from_xapi(value: &$crate::Value, cx: &$crate::codec::Context) -> $crate::error::Result<Self> {
                let members = match value {
                    $crate::Value::Struct(members) => members,
                    other => return Err(cx.mismatch("struct", other)),
                };
                $crate::codec::check_unknown_fields(members, Self::FIELDS, cx)?;

                Ok(Self {
                    $(
                        $field: match members.get($wire) {
                            Some(member) => <$ty as $crate::codec::FromXapi>::from_xapi(member, &cx.field($wire))?,
                            None => Default::default(),
                        },
                    )+
                })
            }
        }
    };
}

pub(crate) use xapi_enum;
pub(crate) use xapi_record;
