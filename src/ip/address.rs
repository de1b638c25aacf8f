// Network Manager - IP Address Value Type
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! IP address value type with prefix length and typed attributes.

use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::wire::{self, PropertyDict, WireValue};

use super::{parse_addr, Family};

/// Attribute keys reserved for the address itself.
const RESERVED_KEYS: [&str; 2] = ["address", "prefix"];

/// An IP address with prefix length and optional named attributes.
///
/// The address is always stored in the canonical textual form for its
/// family; both the string and the binary constructor normalize.
#[derive(Debug, Clone, PartialEq)]
pub struct IpAddress {
    family: Family,
    address: IpAddr,
    prefix: u8,
    /// Extra attributes, kept sorted by name.
    attributes: PropertyDict,
}

impl IpAddress {
    /// Create an address from its textual form.
    pub fn new(family: Family, address: &str, prefix: u8) -> Result<Self> {
        let addr = parse_addr(family, address).ok_or_else(|| {
            Error::Failed(format!("invalid {} address: {}", family.as_str(), address))
        })?;
        Self::from_addr(addr, prefix)
    }

    /// Create an address from a parsed (binary) form.
    pub fn from_addr(address: IpAddr, prefix: u8) -> Result<Self> {
        let family = Family::of(&address);
        if prefix > family.max_prefix() {
            return Err(Error::Failed(format!(
                "prefix {} exceeds maximum {} for {}",
                prefix,
                family.max_prefix(),
                family.as_str()
            )));
        }
        Ok(Self {
            family,
            address,
            prefix,
            attributes: PropertyDict::new(),
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Canonical textual form of the address.
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    pub fn addr(&self) -> IpAddr {
        self.address
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Set or clear an attribute. The keys `address` and `prefix` are
    /// reserved for the address itself and rejected.
    pub fn set_attribute(&mut self, name: &str, value: Option<WireValue>) -> Result<()> {
        if RESERVED_KEYS.contains(&name) {
            return Err(Error::Failed(format!(
                "attribute name '{}' is reserved",
                name
            )));
        }
        self.attributes.retain(|(k, _)| k != name);
        if let Some(value) = value {
            self.attributes.push((name.to_string(), value));
            self.attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&WireValue> {
        wire::lookup(&self.attributes, name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(k, _)| k.as_str())
    }

    /// Equality with or without considering attributes.
    ///
    /// Attribute values are opaque typed variants; they only support
    /// equality, not ordering.
    pub fn matches(&self, other: &Self, with_attributes: bool) -> bool {
        self.family == other.family
            && self.address == other.address
            && self.prefix == other.prefix
            && (!with_attributes || self.attributes == other.attributes)
    }

    /// Encode as one element of the `address-data` wire array.
    pub fn to_wire(&self) -> PropertyDict {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "address", wire::owned(self.address()));
        wire::push(&mut dict, "prefix", wire::owned(u32::from(self.prefix)));
        for (name, value) in &self.attributes {
            dict.push((name.clone(), value.clone()));
        }
        dict
    }

    /// Decode one element of the `address-data` wire array.
    pub fn from_wire(setting: &str, dict: &PropertyDict) -> Result<Self> {
        let address = wire::req_str(setting, dict, "address")?;
        let prefix = wire::opt_u32(setting, dict, "prefix")?
            .ok_or_else(|| Error::missing_property(setting, "prefix"))?;
        let prefix = u8::try_from(prefix)
            .map_err(|_| Error::invalid_property(setting, "prefix", "out of range"))?;

        let addr: IpAddr = address.trim().parse().map_err(|_| {
            Error::invalid_property(setting, "address", format!("invalid address: {}", address))
        })?;
        let mut out = Self::from_addr(addr, prefix)
            .map_err(|e| Error::invalid_property(setting, "prefix", e.to_string()))?;
        for (name, value) in dict {
            if !RESERVED_KEYS.contains(&name.as_str()) {
                out.attributes.push((name.clone(), value.clone()));
            }
        }
        out.attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(out)
    }
}

impl std::fmt::Display for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalizes() {
        // Mixed-case and zero-compressible IPv6 forms normalize.
        let a = IpAddress::new(Family::V6, "FE80:0:0:0:0:0:0:1", 64).unwrap();
        assert_eq!(a.address(), "fe80::1");
        assert_eq!(a.to_string(), "fe80::1/64");
    }

    #[test]
    fn test_string_and_binary_constructors_agree() {
        let from_str = IpAddress::new(Family::V4, "10.0.0.1", 24).unwrap();
        let from_bin = IpAddress::from_addr("10.0.0.1".parse().unwrap(), 24).unwrap();
        assert!(from_str.matches(&from_bin, true));
    }

    #[test]
    fn test_prefix_bounds() {
        assert!(IpAddress::new(Family::V4, "10.0.0.1", 33).is_err());
        assert!(IpAddress::new(Family::V6, "::1", 128).is_ok());
        assert!(IpAddress::new(Family::V6, "::1", 129).is_err());
    }

    #[test]
    fn test_family_mismatch_rejected() {
        assert!(IpAddress::new(Family::V4, "fe80::1", 64).is_err());
    }

    #[test]
    fn test_reserved_attributes() {
        let mut a = IpAddress::new(Family::V4, "10.0.0.1", 24).unwrap();
        assert!(a.set_attribute("address", Some(wire::owned("x"))).is_err());
        assert!(a.set_attribute("prefix", Some(wire::owned(1u32))).is_err());
        assert!(a.set_attribute("label", Some(wire::owned("eth0:1"))).is_ok());
        assert!(a.attribute("label").is_some());
        // Clearing works too.
        a.set_attribute("label", None).unwrap();
        assert!(a.attribute("label").is_none());
    }

    #[test]
    fn test_matches_attribute_modes() {
        let mut a = IpAddress::new(Family::V4, "10.0.0.1", 24).unwrap();
        let b = a.clone();
        a.set_attribute("label", Some(wire::owned("lan"))).unwrap();
        assert!(a.matches(&b, false));
        assert!(!a.matches(&b, true));
    }

    #[test]
    fn test_wire_round_trip() {
        let mut a = IpAddress::new(Family::V4, "192.168.7.9", 23).unwrap();
        a.set_attribute("label", Some(wire::owned("lan"))).unwrap();
        let dict = a.to_wire();
        let back = IpAddress::from_wire("ipv4", &dict).unwrap();
        assert!(a.matches(&back, true));
    }
}
