//! 响应信封分类
//!
//! 服务端每个响应都是 `{Status, Value}` 结构：
//! `Success` 时 `Value` 为返回值，`Failure` 时为 `[错误码, 参数…]`。
//! 旧版服务端在失败时使用 `ErrorDescription` 携带同样的数组。

use xapi_xmlrpc::Value;

use crate::error::{Result, RpcError, XapiError};

/// 分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Failure(RpcError),
}

impl Envelope {
    /// 拆分响应信封
    pub fn classify(method: &str, reply: Value) -> Result<Self> {
        let mut members = match reply {
            Value::Struct(members) => members,
            other => {
                return Err(XapiError::Protocol(format!(
                    "{} 响应不是 struct，实际为 {}",
                    method,
                    other.kind()
                )))
            }
        };

        let status = match members.get("Status") {
            Some(Value::String(status)) => status.clone(),
            Some(other) => {
                return Err(XapiError::Protocol(format!(
                    "{} 响应的 Status 不是字符串: {}",
                    method,
                    other.kind()
                )))
            }
            None => return Err(XapiError::Protocol(format!("{} 响应缺少 Status", method))),
        };

        match status.as_str() {
            "Success" => members
                .remove("Value")
                .map(Self::Success)
                .ok_or_else(|| XapiError::Protocol(format!("{} 成功响应缺少 Value", method))),
            "Failure" => {
                let detail = members
                    .remove("Value")
                    .or_else(|| members.remove("ErrorDescription"))
                    .ok_or_else(|| XapiError::Protocol(format!("{} 失败响应缺少错误描述", method)))?;
                let parts = failure_parts(method, detail)?;
                Ok(Self::Failure(RpcError::from_parts(method, parts)))
            }
            other => Err(XapiError::Protocol(format!(
                "{} 响应的 Status 非法: {:?}",
                method, other
            ))),
        }
    }

    /// 成功时返回值，失败时转为 `XapiError::Rpc`
    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(e) => Err(XapiError::Rpc(e)),
        }
    }
}

fn failure_parts(method: &str, detail: Value) -> Result<Vec<String>> {
    let items = match detail {
        Value::Array(items) if !items.is_empty() => items,
        other => {
            return Err(XapiError::Protocol(format!(
                "{} 失败响应的错误描述应为非空数组，实际为 {}",
                method,
                other.kind()
            )))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(XapiError::Protocol(format!(
                "{} 失败响应的错误描述包含非字符串元素: {}",
                method,
                other.kind()
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn failure(key: &str, parts: &[&str]) -> Value {
        Value::structure([
            ("Status", Value::from("Failure")),
            (key, Value::Array(parts.iter().map(|p| Value::from(*p)).collect())),
        ])
    }

    #[test]
    fn test_success() {
        let reply = Value::structure([("Status", Value::from("Success")), ("Value", Value::from("OpaqueRef:S1"))]);
        assert_eq!(
            Envelope::classify("session.login_with_password", reply).unwrap(),
            Envelope::Success(Value::from("OpaqueRef:S1"))
        );
    }

    #[test]
    fn test_failure() {
        let envelope = Envelope::classify("SR.get_all", failure("Value", &["HOST_IS_SLAVE", "h2"])).unwrap();
        match envelope {
            Envelope::Failure(e) => {
                assert_eq!(e.code, ErrorCode::HostIsSlave);
                assert_eq!(e.params, vec!["h2".to_string()]);
                assert_eq!(e.method, "SR.get_all");
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_error_description() {
        let envelope = Envelope::classify("VM.start", failure("ErrorDescription", &["SESSION_INVALID", "OpaqueRef:S1"])).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert!(err.is_code(&ErrorCode::SessionInvalid));
    }

    #[test]
    fn test_protocol_violations() {
        let cases = vec![
            Value::from("Success"),
            Value::structure([("Value", Value::Int(1))]),
            Value::structure([("Status", Value::from("success")), ("Value", Value::Int(1))]),
            Value::structure([("Status", Value::from("Success"))]),
            Value::structure([("Status", Value::from("Failure")), ("Value", Value::Array(vec![]))]),
            Value::structure([("Status", Value::from("Failure")), ("Value", Value::Array(vec![Value::Int(1)]))]),
        ];
        for reply in cases {
            assert!(matches!(Envelope::classify("m", reply), Err(XapiError::Protocol(_))));
        }
    }
}
