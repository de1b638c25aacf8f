// Network Manager - Wire Codec
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! D-Bus dictionary codec shared by the connection and the value types.
//!
//! The wire format is the classic `a{sa{sv}}` dictionary of dictionaries:
//! setting name → (property name → variant). This module normalizes those
//! loosely typed payloads into strongly typed values and back. No I/O or
//! D-Bus interaction is performed.
//!
//! Dictionaries are kept as **order-preserving pair vectors** rather than
//! hash maps: duplicate-key handling (reject under strict parsing, last
//! occurrence wins otherwise) and reproducible serialization both depend
//! on seeing entries in wire order.

use std::collections::HashMap;

use zvariant::{Dict, OwnedValue, Value};

use crate::error::{Error, Result};

/// A single wire value (D-Bus variant).
pub type WireValue = OwnedValue;

/// An `a{sv}` dictionary: property name → variant, in wire order.
pub type PropertyDict = Vec<(String, WireValue)>;

/// An `a{sa{sv}}` dictionary: setting name → property dict, in wire order.
pub type ConnectionDict = Vec<(String, PropertyDict)>;

fn invalid_type(setting: &str, key: &str, expected: &str, value: &Value<'_>) -> Error {
    Error::invalid_property(
        setting,
        key,
        format!("expected {}, got: {:?}", expected, value),
    )
}

/// Look up a property, honoring last-occurrence-wins for duplicates.
pub fn lookup<'a>(dict: &'a PropertyDict, key: &str) -> Option<&'a WireValue> {
    dict.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// First key that occurs more than once, if any.
pub fn duplicate_key(dict: &PropertyDict) -> Option<&str> {
    for (i, (key, _)) in dict.iter().enumerate() {
        if dict[..i].iter().any(|(k, _)| k == key) {
            return Some(key);
        }
    }
    None
}

/// First key not contained in `known`, if any.
pub fn unknown_key<'a>(dict: &'a PropertyDict, known: &[&str]) -> Option<&'a str> {
    dict.iter()
        .map(|(k, _)| k.as_str())
        .find(|k| !known.contains(k))
}

/// Append a property to a dict under construction.
pub fn push(dict: &mut PropertyDict, key: &str, value: WireValue) {
    dict.push((key.to_string(), value));
}

/// Build a wire value from any plain Rust value.
///
/// Plain data values never hold file descriptors, so the owned conversion
/// cannot fail.
pub fn owned<'a>(value: impl Into<Value<'a>>) -> WireValue {
    let value: Value<'a> = value.into();
    value
        .try_to_owned()
        .expect("plain data values convert to owned values")
}

/// Encode an ordered property dict as a single `a{sv}` wire value.
pub fn dict_value(entries: &PropertyDict) -> WireValue {
    let map: HashMap<String, WireValue> = entries
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    map.into()
}

/// Encode a list of property dicts as a single `aa{sv}` wire value.
pub fn dict_array_value(dicts: &[PropertyDict]) -> WireValue {
    let maps: Vec<HashMap<String, WireValue>> = dicts
        .iter()
        .map(|d| d.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .collect();
    owned(maps)
}

/// Encode a string→string map as an `a{ss}` wire value.
pub fn string_map_value(entries: &[(String, String)]) -> WireValue {
    let map: HashMap<String, String> = entries.iter().cloned().collect();
    owned(map)
}

/// Decode an `a{sv}` wire value into an ordered property dict.
pub fn as_dict_entries(setting: &str, key: &str, value: &WireValue) -> Result<PropertyDict> {
    let dict = value
        .downcast_ref::<Dict>()
        .map_err(|_| invalid_type(setting, key, "a dictionary", value))?;

    let mut out = PropertyDict::new();
    for (k, v) in dict {
        let name: String = k
            .downcast_ref::<String>()
            .map_err(|_| invalid_type(setting, key, "a string key", &k))?;
        let value = v
            .try_to_owned()
            .map_err(|_| invalid_type(setting, key, "an owned value", &v))?;
        out.push((name, value));
    }
    // Hash-backed dicts come back in arbitrary order; keep lookups stable.
    out.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(out)
}

/// Decode an `aa{sv}` wire value into a list of property dicts.
pub fn as_dict_array(setting: &str, key: &str, value: &WireValue) -> Result<Vec<PropertyDict>> {
    let Value::Array(array) = &**value else {
        return Err(invalid_type(setting, key, "an array of dictionaries", value));
    };
    let mut out = Vec::new();
    for item in array.iter() {
        let item = item
            .try_to_owned()
            .map_err(|_| invalid_type(setting, key, "an owned value", item))?;
        out.push(as_dict_entries(setting, key, &item)?);
    }
    Ok(out)
}

/// Structural equality of two wire values.
///
/// Dictionaries built from hash maps come back in arbitrary entry
/// order, so plain `PartialEq` is not a semantic comparison; this
/// helper compares dict entries order-insensitively and arrays
/// element-wise.
pub fn values_equal(a: &WireValue, b: &WireValue) -> bool {
    value_eq(a, b)
}

fn value_eq(a: &Value<'_>, b: &Value<'_>) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(i, j)| value_eq(i, j))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            let mut xs = dict_pairs(x);
            let mut ys = dict_pairs(y);
            if xs.len() != ys.len() {
                return false;
            }
            xs.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
            ys.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
            xs.iter()
                .zip(ys.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && value_eq(va, vb))
        }
        (Value::Value(x), Value::Value(y)) => value_eq(x, y),
        _ => a == b,
    }
}

fn dict_pairs(dict: &Dict<'_, '_>) -> Vec<(String, OwnedValue)> {
    let mut out = Vec::new();
    for (k, v) in dict.iter() {
        let key = k
            .downcast_ref::<String>()
            .unwrap_or_else(|_| format!("{:?}", k));
        if let Ok(value) = v.try_to_owned() {
            out.push((key, value));
        }
    }
    out
}

// ========================================
// Typed property getters
// ========================================
//
// The `opt_*` family returns `Ok(None)` for an absent key and an
// `InvalidProperty` error when the key exists with the wrong type.

macro_rules! opt_scalar {
    ($name:ident, $ty:ty, $expected:literal) => {
        pub fn $name(setting: &str, dict: &PropertyDict, key: &str) -> Result<Option<$ty>> {
            match lookup(dict, key) {
                None => Ok(None),
                Some(v) => v
                    .downcast_ref::<$ty>()
                    .map(Some)
                    .map_err(|_| invalid_type(setting, key, $expected, v)),
            }
        }
    };
}

opt_scalar!(opt_bool, bool, "a boolean");
opt_scalar!(opt_u8, u8, "a byte");
opt_scalar!(opt_u16, u16, "a u16");
opt_scalar!(opt_u32, u32, "a u32");
opt_scalar!(opt_i32, i32, "an i32");
opt_scalar!(opt_u64, u64, "a u64");
opt_scalar!(opt_i64, i64, "an i64");
opt_scalar!(opt_str, String, "a string");

/// Required string property.
pub fn req_str(setting: &str, dict: &PropertyDict, key: &str) -> Result<String> {
    opt_str(setting, dict, key)?.ok_or_else(|| Error::missing_property(setting, key))
}

/// Optional `as` (string array) property.
pub fn opt_string_list(setting: &str, dict: &PropertyDict, key: &str) -> Result<Option<Vec<String>>> {
    let Some(value) = lookup(dict, key) else {
        return Ok(None);
    };
    let Value::Array(array) = &**value else {
        return Err(invalid_type(setting, key, "an array of strings", value));
    };
    let mut out = Vec::new();
    for item in array.iter() {
        out.push(
            item.downcast_ref::<String>()
                .map_err(|_| invalid_type(setting, key, "an array of strings", value))?,
        );
    }
    Ok(Some(out))
}

/// Optional `ay` (byte array) property.
pub fn opt_bytes(setting: &str, dict: &PropertyDict, key: &str) -> Result<Option<Vec<u8>>> {
    let Some(value) = lookup(dict, key) else {
        return Ok(None);
    };
    let Value::Array(array) = &**value else {
        return Err(invalid_type(setting, key, "a byte array", value));
    };
    let mut out = Vec::new();
    for item in array.iter() {
        out.push(
            item.downcast_ref::<u8>()
                .map_err(|_| invalid_type(setting, key, "a byte array", value))?,
        );
    }
    Ok(Some(out))
}

/// Optional `a{ss}` (string map) property, returned in sorted key order.
pub fn opt_string_map(
    setting: &str,
    dict: &PropertyDict,
    key: &str,
) -> Result<Option<Vec<(String, String)>>> {
    let Some(value) = lookup(dict, key) else {
        return Ok(None);
    };
    let map = value
        .downcast_ref::<Dict>()
        .map_err(|_| invalid_type(setting, key, "a string map", value))?;
    let mut out = Vec::new();
    for (k, v) in map {
        let name: String = k
            .downcast_ref::<String>()
            .map_err(|_| invalid_type(setting, key, "a string map", value))?;
        let val: String = v
            .downcast_ref::<String>()
            .map_err(|_| invalid_type(setting, key, "a string map", value))?;
        out.push((name, val));
    }
    out.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(Some(out))
}

/// Optional `aa{sv}` property.
pub fn opt_dict_array(
    setting: &str,
    dict: &PropertyDict,
    key: &str,
) -> Result<Option<Vec<PropertyDict>>> {
    match lookup(dict, key) {
        None => Ok(None),
        Some(v) => as_dict_array(setting, key, v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ovs(s: &str) -> WireValue {
        owned(s)
    }

    #[test]
    fn test_lookup_last_occurrence_wins() {
        let dict: PropertyDict = vec![
            ("id".into(), ovs("first")),
            ("id".into(), ovs("second")),
        ];
        let v = lookup(&dict, "id").unwrap();
        assert_eq!(v.downcast_ref::<String>().unwrap(), "second");
        assert_eq!(duplicate_key(&dict), Some("id"));
    }

    #[test]
    fn test_unknown_key() {
        let dict: PropertyDict = vec![("id".into(), ovs("x")), ("bogus".into(), ovs("y"))];
        assert_eq!(unknown_key(&dict, &["id", "uuid"]), Some("bogus"));
        assert_eq!(unknown_key(&dict, &["id", "bogus"]), None);
    }

    #[test]
    fn test_scalar_getters() {
        let dict: PropertyDict = vec![
            ("autoconnect".into(), owned(true)),
            ("timestamp".into(), owned(42u64)),
            ("priority".into(), owned(-5i32)),
        ];
        assert_eq!(opt_bool("connection", &dict, "autoconnect").unwrap(), Some(true));
        assert_eq!(opt_u64("connection", &dict, "timestamp").unwrap(), Some(42));
        assert_eq!(opt_i32("connection", &dict, "priority").unwrap(), Some(-5));
        assert_eq!(opt_bool("connection", &dict, "absent").unwrap(), None);
        assert!(opt_bool("connection", &dict, "timestamp").is_err());
    }

    #[test]
    fn test_req_str_missing() {
        let dict = PropertyDict::new();
        let err = req_str("connection", &dict, "id").unwrap_err();
        assert_eq!(
            err,
            Error::missing_property("connection", "id")
        );
    }

    #[test]
    fn test_string_list_round_trip() {
        let mut dict = PropertyDict::new();
        push(&mut dict, "dns-search", owned(vec!["a.example".to_string(), "b.example".to_string()]));
        let list = opt_string_list("ipv4", &dict, "dns-search").unwrap().unwrap();
        assert_eq!(list, vec!["a.example", "b.example"]);
    }

    #[test]
    fn test_nested_dict_round_trip() {
        let inner: PropertyDict = vec![
            ("address".into(), ovs("192.168.1.5")),
            ("prefix".into(), owned(24u8)),
        ];
        let value = dict_array_value(&[inner.clone()]);
        let back = as_dict_array("ipv4", "address-data", &value).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(
            lookup(&back[0], "address").unwrap().downcast_ref::<String>().unwrap(),
            "192.168.1.5"
        );
        assert_eq!(lookup(&back[0], "prefix").unwrap().downcast_ref::<u8>().unwrap(), 24u8);
    }

    #[test]
    fn test_values_equal_ignores_dict_order() {
        let a = string_map_value(&[
            ("mode".to_string(), "active-backup".to_string()),
            ("miimon".to_string(), "100".to_string()),
        ]);
        let b = string_map_value(&[
            ("miimon".to_string(), "100".to_string()),
            ("mode".to_string(), "active-backup".to_string()),
        ]);
        assert!(values_equal(&a, &b));
        let c = string_map_value(&[("mode".to_string(), "active-backup".to_string())]);
        assert!(!values_equal(&a, &c));
        // Scalars still compare by value.
        assert!(values_equal(&owned(7u32), &owned(7u32)));
        assert!(!values_equal(&owned(7u32), &owned(8u32)));
    }

    #[test]
    fn test_string_map_round_trip() {
        let entries = vec![
            ("mode".to_string(), "active-backup".to_string()),
            ("miimon".to_string(), "100".to_string()),
        ];
        let value = string_map_value(&entries);
        let mut dict = PropertyDict::new();
        push(&mut dict, "options", value);
        let back = opt_string_map("bond", &dict, "options").unwrap().unwrap();
        assert_eq!(back.len(), 2);
        assert!(back.contains(&("mode".to_string(), "active-backup".to_string())));
    }
}
