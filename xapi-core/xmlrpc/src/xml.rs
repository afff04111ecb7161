//! XML-RPC 文档编解码
//!
//! 请求体格式：
//!
//! ```text
//! <methodCall><methodName>…</methodName><params><param><value>…</value></param>…</params></methodCall>
//! ```
//!
//! 解析先用 quick-xml 构建一棵轻量元素树，再按 XML-RPC 规则解释。
//! 字符串值中的空白原样保留；类型元素之间的空白被忽略。

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::datetime::{format_datetime, parse_datetime};
use crate::error::{Result, XmlRpcError};
use crate::value::Value;

const XML_HEADER: &str = "<?xml version=\"1.0\"?>";

// ============================================
// 写出
// ============================================

/// 生成 methodCall 文档
pub fn write_method_call(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(128 + params.len() * 64);
    out.push_str(XML_HEADER);
    out.push_str("<methodCall><methodName>");
    escape_into(&mut out, method);
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// 生成成功的 methodResponse 文档
pub fn write_method_response(value: &Value) -> String {
    let mut out = String::with_capacity(128);
    out.push_str(XML_HEADER);
    out.push_str("<methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

/// 生成 fault 响应文档
pub fn write_fault(code: i64, message: &str) -> String {
    let fault = Value::structure([
        ("faultCode", Value::Int(code)),
        ("faultString", Value::from(message)),
    ]);
    let mut out = String::with_capacity(128);
    out.push_str(XML_HEADER);
    out.push_str("<methodResponse><fault>");
    write_value(&mut out, &fault);
    out.push_str("</fault></methodResponse>");
    out
}

/// 将单个值写为 `<value>…</value>`
pub fn value_to_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// 追加写出 `<value>…</value>`
pub fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            // 32 位范围内使用标准 <int>，超出时使用 <i8> 扩展
            let tag = if i32::try_from(*i).is_ok() { "int" } else { "i8" };
            let _ = write!(out, "<{tag}>{i}</{tag}>");
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::Boolean(b) => {
            out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        Value::DateTime(t) => {
            let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", format_datetime(t));
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

// ============================================
// 解析
// ============================================

/// 解析 methodResponse 文档
///
/// fault 响应返回 `XmlRpcError::Fault`。
pub fn parse_method_response(xml: &str) -> Result<Value> {
    let root = parse_document(xml)?;
    root.ensure("methodResponse")?;

    if let Some(fault) = root.find("fault") {
        let detail = element_value(fault.child("value")?)?;
        let code = match detail.member("faultCode") {
            Some(Value::Int(code)) => *code,
            _ => 0,
        };
        let message = detail
            .member("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(XmlRpcError::Fault { code, message });
    }

    let params = root.child("params")?;
    match params.children.as_slice() {
        [param] => {
            param.ensure("param")?;
            element_value(param.child("value")?)
        }
        other => Err(XmlRpcError::parse(format!(
            "methodResponse 应包含 1 个 param，实际 {} 个",
            other.len()
        ))),
    }
}

/// 解析 methodCall 文档，返回方法名与参数
pub fn parse_method_call(xml: &str) -> Result<(String, Vec<Value>)> {
    let root = parse_document(xml)?;
    root.ensure("methodCall")?;

    let method = root.child("methodName")?.text.trim().to_string();
    if method.is_empty() {
        return Err(XmlRpcError::parse("methodName 为空"));
    }

    let params = match root.find("params") {
        Some(params) => params
            .children
            .iter()
            .map(|param| {
                param.ensure("param")?;
                element_value(param.child("value")?)
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok((method, params))
}

/// 解析根元素为 `<value>` 的片段
pub fn parse_value(xml: &str) -> Result<Value> {
    let root = parse_document(xml)?;
    root.ensure("value")?;
    element_value(&root)
}

/// 轻量元素树节点
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|e| XmlRpcError::parse(format!("元素名不是合法 UTF-8: {}", e)))?
            .to_string();
        Ok(Self {
            name,
            ..Default::default()
        })
    }

    fn ensure(&self, name: &str) -> Result<()> {
        if self.name == name {
            Ok(())
        } else {
            Err(XmlRpcError::parse(format!(
                "期望元素 <{}>，实际为 <{}>",
                name, self.name
            )))
        }
    }

    fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child(&self, name: &str) -> Result<&Element> {
        self.find(name).ok_or_else(|| {
            XmlRpcError::parse(format!("<{}> 缺少子元素 <{}>", self.name, name))
        })
    }
}

fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlRpcError::parse("多余的结束标签"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    let raw = std::str::from_utf8(&data)
                        .map_err(|e| XmlRpcError::parse(format!("CDATA 不是合法 UTF-8: {}", e)))?;
                    top.text.push_str(raw);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlRpcError::parse("文档未正常结束"));
    }
    root.ok_or_else(|| XmlRpcError::parse("空文档"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(XmlRpcError::parse("文档存在多个根元素"));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

fn element_value(element: &Element) -> Result<Value> {
    element.ensure("value")?;
    match element.children.as_slice() {
        // 无类型元素时按字符串处理
        [] => Ok(Value::String(element.text.clone())),
        [typed] => typed_value(typed),
        _ => Err(XmlRpcError::parse("<value> 只能包含一个类型元素")),
    }
}

fn typed_value(element: &Element) -> Result<Value> {
    let text = element.text.as_str();
    match element.name.as_str() {
        "int" | "i4" | "i8" => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| XmlRpcError::parse(format!("整数超出范围或格式错误: {}", text.trim()))),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Boolean(true)),
            "0" | "false" => Ok(Value::Boolean(false)),
            other => Err(XmlRpcError::parse(format!("非法布尔值: {}", other))),
        },
        "double" => text
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| XmlRpcError::parse(format!("非法浮点数: {}", text.trim()))),
        "string" => Ok(Value::String(text.to_string())),
        "dateTime.iso8601" => parse_datetime(text)
            .map(Value::DateTime)
            .ok_or_else(|| XmlRpcError::parse(format!("非法时间: {}", text.trim()))),
        "base64" => {
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(cleaned)
                .map(Value::Base64)
                .map_err(|e| XmlRpcError::parse(format!("非法 base64: {}", e)))
        }
        "array" => {
            let items = match element.find("data") {
                Some(data) => data
                    .children
                    .iter()
                    .map(element_value)
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in &element.children {
                member.ensure("member")?;
                let name = member.child("name")?.text.clone();
                let value = element_value(member.child("value")?)?;
                if members.contains_key(&name) {
                    return Err(XmlRpcError::parse(format!("struct 成员重复: {}", name)));
                }
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        other => Err(XmlRpcError::parse(format!("不支持的值类型 <{}>", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_write_method_call() {
        let xml = write_method_call("SR.get_all", &[Value::from("OpaqueRef:S1")]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\"?><methodCall><methodName>SR.get_all</methodName><params>\
             <param><value><string>OpaqueRef:S1</string></value></param></params></methodCall>"
        );
    }

    #[test]
    fn test_parse_success_envelope() {
        let xml = r#"<?xml version="1.0"?>
<methodResponse>
  <params>
    <param>
      <value>
        <struct>
          <member><name>Status</name><value>Success</value></member>
          <member>
            <name>Value</name>
            <value><array><data>
              <value>OpaqueRef:A</value>
              <value><string>OpaqueRef:B</string></value>
            </data></array></value>
          </member>
        </struct>
      </value>
    </param>
  </params>
</methodResponse>"#;

        let value = parse_method_response(xml).expect("parse");
        assert_eq!(value.member("Status"), Some(&Value::from("Success")));
        assert_eq!(
            value.member("Value"),
            Some(&Value::Array(vec![Value::from("OpaqueRef:A"), Value::from("OpaqueRef:B")]))
        );
    }

    #[test]
    fn test_string_whitespace_preserved() {
        let value = parse_value("<value><string>  padded\n</string></value>").expect("parse");
        assert_eq!(value, Value::from("  padded\n"));

        let untyped = parse_value("<value> raw </value>").expect("parse");
        assert_eq!(untyped, Value::from(" raw "));

        let empty = parse_value("<value><string/></value>").expect("parse");
        assert_eq!(empty, Value::from(""));
    }

    #[test]
    fn test_escaping_round_trip() {
        let original = Value::structure([("a<b", Value::from("x & y <z> \r\n 'q' \"dq\""))]);
        let parsed = parse_value(&value_to_string(&original)).expect("parse");
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(parse_value("<value><i4>-7</i4></value>").unwrap(), Value::Int(-7));
        assert_eq!(
            parse_value("<value><i8>9223372036854775807</i8></value>").unwrap(),
            Value::Int(i64::MAX)
        );
        assert_eq!(parse_value("<value><boolean>1</boolean></value>").unwrap(), Value::Boolean(true));
        assert_eq!(parse_value("<value><double>0.5</double></value>").unwrap(), Value::Double(0.5));
        assert_eq!(
            parse_value("<value><base64>aGVs\nbG8=</base64></value>").unwrap(),
            Value::Base64(b"hello".to_vec())
        );
        assert_eq!(
            parse_value("<value><dateTime.iso8601>20240102T03:04:05Z</dateTime.iso8601></value>").unwrap(),
            Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn test_integer_overflow_is_error() {
        let err = parse_value("<value><i8>9223372036854775808</i8></value>").unwrap_err();
        assert!(matches!(err, XmlRpcError::Parse(_)));
    }

    #[test]
    fn test_duplicate_struct_member_is_error() {
        let err = parse_value(
            "<value><struct>\
             <member><name>k</name><value>a</value></member>\
             <member><name>k</name><value>b</value></member>\
             </struct></value>",
        )
        .unwrap_err();
        match err {
            XmlRpcError::Parse(message) => assert!(message.contains("k"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_large_int_uses_i8_tag() {
        let xml = value_to_string(&Value::Int(10_737_418_240));
        assert_eq!(xml, "<value><i8>10737418240</i8></value>");
        assert_eq!(value_to_string(&Value::Int(42)), "<value><int>42</int></value>");
    }

    #[test]
    fn test_fault_response() {
        let err = parse_method_response(&write_fault(-32601, "no such method")).unwrap_err();
        match err {
            XmlRpcError::Fault { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "no such method");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_method_call_round_trip() {
        let params = vec![
            Value::from("root"),
            Value::Array(vec![]),
            Value::structure([("k", Value::Int(1))]),
        ];
        let (method, parsed) = parse_method_call(&write_method_call("session.login", &params)).unwrap();
        assert_eq!(method, "session.login");
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_method_response("").is_err());
        assert!(parse_method_response("<methodResponse><params>").is_err());
        assert!(parse_method_response("<methodCall/>").is_err());
        assert!(parse_value("<value><nil/></value>").is_err());
        assert!(parse_value("<value><int>1</int><int>2</int></value>").is_err());
    }
}
