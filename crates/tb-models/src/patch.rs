//! Patch-style request fields
//!
//! A clearable attribute arrives as `Option<Option<T>>`: absent means "leave
//! unchanged", `null` means "clear", and a value means "set".

use serde::{Deserialize, Deserializer};

/// Use with `#[serde(default, deserialize_with = "crate::patch::nullable")]`
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
