//! Serde helpers for fields where "absent" and "explicitly null" mean
//! different things.

use serde::{Deserialize, Deserializer};

/// Deserializes into `Option<Option<T>>` keeping the three request states apart.
///
/// Must be combined with `#[serde(default)]` so a missing key yields `None`:
///
/// * key missing → `None` (leave unchanged)
/// * `null` → `Some(None)` (clear)
/// * value → `Some(Some(value))` (overwrite)
pub fn deserialize_nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
