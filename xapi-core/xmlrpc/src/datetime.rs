//! XML-RPC 时间格式
//!
//! 写出时使用 XAPI 兼容的紧凑格式 `YYYYMMDDTHH:MM:SSZ`；
//! 解析时同时接受紧凑与扩展 ISO-8601 格式，缺省时区按 UTC 解释。

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// 可接受的无时区格式（`%.f` 允许缺省小数秒）
const NAIVE_FORMATS: &[&str] = &[
    "%Y%m%dT%H:%M:%S%.f",
    "%Y%m%dT%H%M%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// 格式化为紧凑格式（秒级精度）
pub fn format_datetime(t: &DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H:%M:%SZ").to_string()
}

/// 格式化为扩展 ISO-8601 格式
pub fn format_datetime_extended(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// 解析紧凑或扩展 ISO-8601 时间
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }

    let naive = s
        .strip_suffix('Z')
        .or_else(|| s.strip_suffix('z'))
        .unwrap_or(s);

    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(naive, f).ok())
        .map(|n| Utc.from_utc_datetime(&n))
}
