//! Serde adapters for `gateway.toml` fields

/// Timeouts written as whole seconds, e.g. `connect_timeout = 10`.
///
/// Use with `#[serde(with = "duration_secs")]` on a `Duration` field.
/// Sub-second precision is dropped on save.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
