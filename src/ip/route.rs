// Network Manager - IP Route Value Type
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! IP route value type with a data-driven attribute table.
//!
//! Route attributes mirror the kernel's per-route options (`table`,
//! `onlink`, `scope`, congestion knobs, …). They are validated against a
//! static spec table keyed by name rather than hand-coded per attribute.

use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::wire::{self, PropertyDict, WireValue};

use super::{parse_addr, Family};

/// Route metric value meaning "use the device default".
pub const METRIC_DEFAULT: i64 = -1;

/// Known values of the `type` attribute.
pub const ROUTE_TYPES: [&str; 6] = [
    "unicast",
    "local",
    "blackhole",
    "unreachable",
    "prohibit",
    "throw",
];

/// Kernel route scopes accepted for `type=local` routes.
const LOCAL_SCOPES: [u8; 2] = [254, 255]; // host, nowhere

/// Wire/semantic type of a route attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrKind {
    Bool,
    Byte,
    U32,
    /// A plain address string of the route's family.
    Address,
    /// An `addr/prefix` string of the route's family.
    AddressWithPrefix,
    /// One of [`ROUTE_TYPES`].
    RouteType,
    /// A kernel route scope byte.
    Scope,
}

struct AttrSpec {
    name: &'static str,
    kind: AttrKind,
    v4: bool,
    v6: bool,
}

const fn spec(name: &'static str, kind: AttrKind, v4: bool, v6: bool) -> AttrSpec {
    AttrSpec { name, kind, v4, v6 }
}

/// Attribute spec table, sorted by name for binary search.
const ATTRIBUTE_SPECS: [AttrSpec; 22] = [
    spec("advmss", AttrKind::U32, true, true),
    spec("cwnd", AttrKind::U32, true, true),
    spec("from", AttrKind::AddressWithPrefix, false, true),
    spec("initcwnd", AttrKind::U32, true, true),
    spec("initrwnd", AttrKind::U32, true, true),
    spec("lock-cwnd", AttrKind::Bool, true, true),
    spec("lock-initcwnd", AttrKind::Bool, true, true),
    spec("lock-initrwnd", AttrKind::Bool, true, true),
    spec("lock-mtu", AttrKind::Bool, true, true),
    spec("lock-rto_min", AttrKind::Bool, true, true),
    spec("lock-window", AttrKind::Bool, true, true),
    spec("mtu", AttrKind::U32, true, true),
    spec("onlink", AttrKind::Bool, true, true),
    spec("quickack", AttrKind::Bool, true, true),
    spec("rto_min", AttrKind::U32, true, true),
    spec("scope", AttrKind::Scope, true, false),
    spec("src", AttrKind::Address, true, true),
    spec("table", AttrKind::U32, true, true),
    spec("tos", AttrKind::Byte, true, false),
    spec("type", AttrKind::RouteType, true, true),
    spec("weight", AttrKind::U32, true, true),
    spec("window", AttrKind::U32, true, true),
];

fn attr_spec(name: &str) -> Option<&'static AttrSpec> {
    ATTRIBUTE_SPECS
        .binary_search_by(|s| s.name.cmp(name))
        .ok()
        .map(|i| &ATTRIBUTE_SPECS[i])
}

/// An IP route: destination network, optional next hop, metric, and
/// kernel attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct IpRoute {
    family: Family,
    dest: IpAddr,
    prefix: u8,
    next_hop: Option<IpAddr>,
    metric: i64,
    /// Attributes, kept sorted by name.
    attributes: PropertyDict,
}

impl IpRoute {
    /// Create a route from textual destination and next hop.
    pub fn new(
        family: Family,
        dest: &str,
        prefix: u8,
        next_hop: Option<&str>,
        metric: i64,
    ) -> Result<Self> {
        let dest = parse_addr(family, dest).ok_or_else(|| {
            Error::Failed(format!("invalid {} route destination: {}", family.as_str(), dest))
        })?;
        let next_hop = match next_hop {
            None => None,
            Some(s) => Some(parse_addr(family, s).ok_or_else(|| {
                Error::Failed(format!("invalid {} next hop: {}", family.as_str(), s))
            })?),
        };
        Self::from_addrs(dest, prefix, next_hop, metric)
    }

    /// Create a route from parsed (binary) addresses.
    pub fn from_addrs(
        dest: IpAddr,
        prefix: u8,
        next_hop: Option<IpAddr>,
        metric: i64,
    ) -> Result<Self> {
        let family = Family::of(&dest);
        if prefix > family.max_prefix() {
            return Err(Error::Failed(format!(
                "prefix {} exceeds maximum {} for {}",
                prefix,
                family.max_prefix(),
                family.as_str()
            )));
        }
        if let Some(hop) = &next_hop {
            if Family::of(hop) != family {
                return Err(Error::Failed(
                    "next hop family does not match destination".into(),
                ));
            }
        }
        if metric < METRIC_DEFAULT {
            return Err(Error::Failed(format!("invalid route metric: {}", metric)));
        }
        Ok(Self {
            family,
            dest,
            prefix,
            next_hop,
            metric,
            attributes: PropertyDict::new(),
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn dest(&self) -> IpAddr {
        self.dest
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn next_hop(&self) -> Option<IpAddr> {
        self.next_hop
    }

    /// Route metric; [`METRIC_DEFAULT`] means unset.
    pub fn metric(&self) -> i64 {
        self.metric
    }

    pub fn attribute(&self, name: &str) -> Option<&WireValue> {
        wire::lookup(&self.attributes, name)
    }

    /// String-typed attribute convenience getter.
    pub fn attribute_str(&self, name: &str) -> Option<String> {
        self.attribute(name)
            .and_then(|v| v.downcast_ref::<String>().ok())
    }

    /// Set or clear an attribute; the name must exist in the spec table
    /// and the value must match its declared wire type.
    pub fn set_attribute(&mut self, name: &str, value: Option<WireValue>) -> Result<()> {
        let Some(value) = value else {
            self.attributes.retain(|(k, _)| k != name);
            return Ok(());
        };
        let spec = attr_spec(name)
            .ok_or_else(|| Error::Failed(format!("unknown route attribute: {}", name)))?;
        check_attr_type(spec, &value)?;
        self.attributes.retain(|(k, _)| k != name);
        self.attributes.push((name.to_string(), value));
        self.attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(())
    }

    /// Equality with or without considering attributes.
    pub fn matches(&self, other: &Self, with_attributes: bool) -> bool {
        self.family == other.family
            && self.dest == other.dest
            && self.prefix == other.prefix
            && self.next_hop == other.next_hop
            && self.metric == other.metric
            && (!with_attributes || self.attributes == other.attributes)
    }

    /// Validate the route and every attribute, including cross-field
    /// rules. Violations are validation errors, never panics.
    pub fn validate_all(&self) -> Result<()> {
        for (name, value) in &self.attributes {
            let spec = attr_spec(name)
                .ok_or_else(|| Error::Failed(format!("unknown route attribute: {}", name)))?;
            let applies = match self.family {
                Family::V4 => spec.v4,
                Family::V6 => spec.v6,
            };
            if !applies {
                return Err(Error::Failed(format!(
                    "route attribute '{}' does not apply to {}",
                    name,
                    self.family.as_str()
                )));
            }
            check_attr_type(spec, value)?;
            self.check_attr_semantics(spec, value)?;
        }

        let route_type = self.attribute_str("type");
        let route_type = route_type.as_deref().unwrap_or("unicast");
        match route_type {
            "local" => {
                if let Some(scope) = self.attribute("scope") {
                    let scope = scope.downcast_ref::<u8>().unwrap_or_default();
                    if !LOCAL_SCOPES.contains(&scope) {
                        return Err(Error::Failed(format!(
                            "local route cannot have scope {}",
                            scope
                        )));
                    }
                }
            }
            "blackhole" | "unreachable" | "prohibit" | "throw" => {
                if self.next_hop.is_some() {
                    return Err(Error::Failed(format!(
                        "route of type '{}' cannot have a next-hop",
                        route_type
                    )));
                }
            }
            _ => {}
        }

        if self.attribute("weight").is_some() && route_type != "unicast" {
            return Err(Error::Failed(format!(
                "ECMP weight is only valid for unicast routes, not '{}'",
                route_type
            )));
        }

        Ok(())
    }

    fn check_attr_semantics(&self, spec: &AttrSpec, value: &WireValue) -> Result<()> {
        match spec.kind {
            AttrKind::Address => {
                let s = value.downcast_ref::<String>().unwrap_or_default();
                if parse_addr(self.family, &s).is_none() {
                    return Err(Error::Failed(format!(
                        "route attribute '{}' is not a valid {} address: {}",
                        spec.name,
                        self.family.as_str(),
                        s
                    )));
                }
            }
            AttrKind::AddressWithPrefix => {
                let s = value.downcast_ref::<String>().unwrap_or_default();
                let (addr, prefix) = s.split_once('/').unwrap_or((s.as_str(), ""));
                let ok = parse_addr(self.family, addr).is_some()
                    && (prefix.is_empty()
                        || prefix
                            .parse::<u8>()
                            .is_ok_and(|p| p <= self.family.max_prefix()));
                if !ok {
                    return Err(Error::Failed(format!(
                        "route attribute '{}' is not a valid {} subnet: {}",
                        spec.name,
                        self.family.as_str(),
                        s
                    )));
                }
            }
            AttrKind::RouteType => {
                let s = value.downcast_ref::<String>().unwrap_or_default();
                if !ROUTE_TYPES.contains(&s.as_str()) {
                    return Err(Error::Failed(format!("unknown route type: {}", s)));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Encode as one element of the `route-data` wire array.
    pub fn to_wire(&self) -> PropertyDict {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "dest", wire::owned(self.dest.to_string()));
        wire::push(&mut dict, "prefix", wire::owned(u32::from(self.prefix)));
        if let Some(hop) = &self.next_hop {
            wire::push(&mut dict, "next-hop", wire::owned(hop.to_string()));
        }
        if self.metric != METRIC_DEFAULT {
            wire::push(&mut dict, "metric", wire::owned(self.metric as u32));
        }
        for (name, value) in &self.attributes {
            dict.push((name.clone(), value.clone()));
        }
        dict
    }

    /// Decode one element of the `route-data` wire array.
    pub fn from_wire(setting: &str, dict: &PropertyDict) -> Result<Self> {
        let dest = wire::req_str(setting, dict, "dest")?;
        let prefix = wire::opt_u32(setting, dict, "prefix")?
            .ok_or_else(|| Error::missing_property(setting, "prefix"))?;
        let prefix = u8::try_from(prefix)
            .map_err(|_| Error::invalid_property(setting, "prefix", "out of range"))?;
        let next_hop = wire::opt_str(setting, dict, "next-hop")?;
        let metric = wire::opt_u32(setting, dict, "metric")?
            .map_or(METRIC_DEFAULT, i64::from);

        let dest: IpAddr = dest.trim().parse().map_err(|_| {
            Error::invalid_property(setting, "dest", format!("invalid address: {}", dest))
        })?;
        let next_hop = match next_hop {
            None => None,
            Some(s) => Some(s.trim().parse().map_err(|_| {
                Error::invalid_property(setting, "next-hop", format!("invalid address: {}", s))
            })?),
        };
        let mut out = Self::from_addrs(dest, prefix, next_hop, metric)
            .map_err(|e| Error::invalid_property(setting, "routes", e.to_string()))?;
        for (name, value) in dict {
            if !["dest", "prefix", "next-hop", "metric"].contains(&name.as_str()) {
                out.attributes.push((name.clone(), value.clone()));
            }
        }
        out.attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(out)
    }
}

fn check_attr_type(spec: &AttrSpec, value: &WireValue) -> Result<()> {
    let ok = match spec.kind {
        AttrKind::Bool => value.downcast_ref::<bool>().is_ok(),
        AttrKind::Byte | AttrKind::Scope => value.downcast_ref::<u8>().is_ok(),
        AttrKind::U32 => value.downcast_ref::<u32>().is_ok(),
        AttrKind::Address | AttrKind::AddressWithPrefix | AttrKind::RouteType => {
            value.downcast_ref::<String>().is_ok()
        }
    };
    if ok {
        Ok(())
    } else {
        Err(Error::Failed(format!(
            "route attribute '{}' has the wrong type",
            spec.name
        )))
    }
}

impl std::fmt::Display for IpRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.dest, self.prefix)?;
        if let Some(hop) = &self.next_hop {
            write!(f, " via {}", hop)?;
        }
        if self.metric != METRIC_DEFAULT {
            write!(f, " metric {}", self.metric)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_table_is_sorted() {
        for pair in ATTRIBUTE_SPECS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_route_construction() {
        let r = IpRoute::new(Family::V4, "10.0.0.0", 24, Some("10.0.0.1"), 100).unwrap();
        assert_eq!(r.to_string(), "10.0.0.0/24 via 10.0.0.1 metric 100");
        assert!(IpRoute::new(Family::V4, "10.0.0.0", 33, None, -1).is_err());
        assert!(IpRoute::new(Family::V4, "10.0.0.0", 24, Some("fe80::1"), -1).is_err());
        assert!(IpRoute::new(Family::V4, "10.0.0.0", 24, None, -2).is_err());
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let mut r = IpRoute::new(Family::V4, "10.0.0.0", 24, None, -1).unwrap();
        assert!(r.set_attribute("bogus", Some(wire::owned(1u32))).is_err());
        assert!(r.set_attribute("table", Some(wire::owned(100u32))).is_ok());
        assert!(r.set_attribute("table", Some(wire::owned("main"))).is_err());
    }

    #[test]
    fn test_blackhole_forbids_next_hop() {
        let mut r = IpRoute::new(Family::V4, "10.0.0.0", 24, Some("10.0.0.1"), -1).unwrap();
        r.set_attribute("type", Some(wire::owned("blackhole"))).unwrap();
        let err = r.validate_all().unwrap_err();
        assert!(err.to_string().contains("cannot have a next-hop"));

        let mut ok = IpRoute::new(Family::V4, "10.0.0.0", 24, None, -1).unwrap();
        ok.set_attribute("type", Some(wire::owned("blackhole"))).unwrap();
        assert!(ok.validate_all().is_ok());
    }

    #[test]
    fn test_weight_only_for_unicast() {
        let mut r = IpRoute::new(Family::V4, "10.0.0.0", 24, None, -1).unwrap();
        r.set_attribute("weight", Some(wire::owned(5u32))).unwrap();
        assert!(r.validate_all().is_ok());
        r.set_attribute("type", Some(wire::owned("throw"))).unwrap();
        assert!(r.validate_all().is_err());
    }

    #[test]
    fn test_local_scope_restriction() {
        let mut r = IpRoute::new(Family::V4, "10.0.0.1", 32, None, -1).unwrap();
        r.set_attribute("type", Some(wire::owned("local"))).unwrap();
        r.set_attribute("scope", Some(wire::owned(254u8))).unwrap();
        assert!(r.validate_all().is_ok());
        r.set_attribute("scope", Some(wire::owned(0u8))).unwrap();
        assert!(r.validate_all().is_err());
    }

    #[test]
    fn test_family_gated_attributes() {
        let mut r6 = IpRoute::new(Family::V6, "2001:db8::", 64, None, -1).unwrap();
        r6.set_attribute("tos", Some(wire::owned(0x10u8))).unwrap();
        assert!(r6.validate_all().is_err());
        r6.set_attribute("tos", None).unwrap();
        r6.set_attribute("from", Some(wire::owned("2001:db8::/64"))).unwrap();
        assert!(r6.validate_all().is_ok());
    }

    #[test]
    fn test_wire_round_trip() {
        let mut r = IpRoute::new(Family::V4, "10.4.0.0", 16, Some("10.4.0.1"), 42).unwrap();
        r.set_attribute("table", Some(wire::owned(100u32))).unwrap();
        r.set_attribute("onlink", Some(wire::owned(true))).unwrap();
        let back = IpRoute::from_wire("ipv4", &r.to_wire()).unwrap();
        assert!(r.matches(&back, true));
    }
}
