//! 对外时间格式：统一使用带本地时区偏移的 ISO-8601 字符串。

use chrono::{DateTime, Local, Utc};

/// 对外时间格式（YYYY-MM-DDTHH:MM:SS±HH:MM）。
pub const WIRE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// 将 UTC 时间转换为带本地时区偏移的字符串。
pub fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(WIRE_TIME_FORMAT).to_string()
}

/// serde 序列化辅助：`DateTime<Utc>` → 本地偏移字符串。
pub mod serde_local {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_local(*ts))
    }
}

/// serde 序列化辅助：`Option<DateTime<Utc>>` → 本地偏移字符串或 null。
pub mod serde_local_opt {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&super::format_local(*ts)),
            None => serializer.serialize_none(),
        }
    }
}
