// Network Manager - IP Configuration Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `ipv4`, `ipv6` and `proxy` settings.
//!
//! The two address-family settings share one struct; the family field
//! selects the setting kind, the accepted methods, and the address
//! validation rules.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::ip::{Family, IpAddress, IpRoute, RoutingRule};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

/// Methods valid for IPv4.
const METHODS_V4: [&str; 5] = ["auto", "disabled", "link-local", "manual", "shared"];
/// Methods valid for IPv6.
const METHODS_V6: [&str; 7] = [
    "auto",
    "dhcp",
    "disabled",
    "ignore",
    "link-local",
    "manual",
    "shared",
];

/// `dhcp-send-hostname-v2` tristate: unset.
pub const SEND_HOSTNAME_DEFAULT: i32 = -1;

/// Address-family specific configuration of a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct IpConfigSetting {
    family: Family,
    pub method: Option<String>,
    pub addresses: Vec<IpAddress>,
    pub gateway: Option<String>,
    pub routes: Vec<IpRoute>,
    pub routing_rules: Vec<RoutingRule>,
    pub dns: Vec<String>,
    pub dns_search: Vec<String>,
    pub dns_options: Vec<String>,
    pub dns_priority: i32,
    pub route_metric: i64,
    pub route_table: u32,
    pub never_default: bool,
    pub ignore_auto_routes: bool,
    pub ignore_auto_dns: bool,
    pub may_fail: bool,
    pub dhcp_hostname: Option<String>,
    /// Deprecated boolean form of `dhcp-send-hostname-v2`.
    pub dhcp_send_hostname: Option<bool>,
    pub dhcp_send_hostname_v2: i32,
    pub dhcp_timeout: i32,
}

impl IpConfigSetting {
    pub const NAME_V4: &'static str = "ipv4";
    pub const NAME_V6: &'static str = "ipv6";

    const PROPERTIES: [&'static str; 19] = [
        "address-data",
        "dhcp-hostname",
        "dhcp-send-hostname",
        "dhcp-send-hostname-v2",
        "dhcp-timeout",
        "dns",
        "dns-options",
        "dns-priority",
        "dns-search",
        "gateway",
        "ignore-auto-dns",
        "ignore-auto-routes",
        "may-fail",
        "method",
        "never-default",
        "route-data",
        "route-metric",
        "route-table",
        "routing-rules",
    ];

    pub fn new(family: Family) -> Self {
        Self {
            family,
            method: None,
            addresses: Vec::new(),
            gateway: None,
            routes: Vec::new(),
            routing_rules: Vec::new(),
            dns: Vec::new(),
            dns_search: Vec::new(),
            dns_options: Vec::new(),
            dns_priority: 0,
            route_metric: -1,
            route_table: 0,
            never_default: false,
            ignore_auto_routes: false,
            ignore_auto_dns: false,
            may_fail: true,
            dhcp_hostname: None,
            dhcp_send_hostname: None,
            dhcp_send_hostname_v2: SEND_HOSTNAME_DEFAULT,
            dhcp_timeout: 0,
        }
    }

    /// Default-constructed setting carrying the given method.
    pub fn with_method(family: Family, method: &str) -> Self {
        let mut setting = Self::new(family);
        setting.method = Some(method.to_string());
        setting
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn name(&self) -> &'static str {
        match self.family {
            Family::V4 => Self::NAME_V4,
            Family::V6 => Self::NAME_V6,
        }
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        match self.family {
            Family::V4 => &METHODS_V4,
            Family::V6 => &METHODS_V6,
        }
    }

    /// Methods under which the connection carries no addresses.
    pub fn method_is_off(&self) -> bool {
        matches!(self.method.as_deref(), Some("disabled") | Some("ignore"))
    }

    /// Legacy and v2 send-hostname must agree when both are set.
    pub fn send_hostname_conflict(&self) -> bool {
        self.dhcp_send_hostname_v2 != SEND_HOSTNAME_DEFAULT
            && self
                .dhcp_send_hostname
                .is_some_and(|legacy| legacy != (self.dhcp_send_hostname_v2 != 0))
    }
}

impl SettingData for IpConfigSetting {
    fn kind(&self) -> SettingKind {
        match self.family {
            Family::V4 => SettingKind::Ipv4,
            Family::V6 => SettingKind::Ipv6,
        }
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        let name = self.name();
        let mut result = VerifyResult::Success;

        match self.method.as_deref() {
            None => {
                result = result.merge(VerifyResult::Normalizable(Error::missing_property(
                    name, "method",
                )));
            }
            Some(method) if !self.valid_methods().contains(&method) => {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "method",
                    format!("unknown method: {}", method),
                ));
            }
            Some("manual") if self.addresses.is_empty() => {
                return VerifyResult::Failure(Error::missing_property(name, "addresses"));
            }
            Some(_) => {}
        }

        if self.method_is_off() && !self.addresses.is_empty() {
            return VerifyResult::Failure(Error::invalid_property(
                name,
                "addresses",
                format!("not allowed with method {}", self.method.as_deref().unwrap_or("")),
            ));
        }

        for address in &self.addresses {
            if address.family() != self.family {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "addresses",
                    format!("address {} has the wrong family", address),
                ));
            }
        }

        if let Some(gateway) = &self.gateway {
            if crate::ip::parse_addr(self.family, gateway).is_none() {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "gateway",
                    format!("invalid address: {}", gateway),
                ));
            }
            if self.never_default {
                result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                    name,
                    "gateway",
                    "gateway is meaningless with never-default",
                )));
            } else if self.addresses.is_empty() {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "gateway",
                    "gateway requires at least one address",
                ));
            }
        }

        for route in &self.routes {
            if route.family() != self.family {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "routes",
                    "route family mismatch",
                ));
            }
            if let Err(e) = route.validate_all() {
                return VerifyResult::Failure(Error::invalid_property(name, "routes", e.to_string()));
            }
        }

        for rule in &self.routing_rules {
            if rule.family() != self.family {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "routing-rules",
                    "rule family mismatch",
                ));
            }
            if let Err(e) = rule.validate() {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "routing-rules",
                    e.to_string(),
                ));
            }
        }

        for server in &self.dns {
            if crate::ip::parse_addr(self.family, server).is_none() {
                return VerifyResult::Failure(Error::invalid_property(
                    name,
                    "dns",
                    format!("invalid nameserver: {}", server),
                ));
            }
        }

        if self.method_is_off() && !self.may_fail {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                name,
                "may-fail",
                "must be true when the method is disabled or ignored",
            )));
        }

        if self.method.as_deref() == Some("shared") && self.addresses.len() > 1 {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                name,
                "addresses",
                "shared method allows a single address",
            )));
        }

        if self.send_hostname_conflict() {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                name,
                "dhcp-send-hostname",
                "conflicts with dhcp-send-hostname-v2",
            )));
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(method) = &self.method {
            wire::push(&mut dict, "method", wire::owned(method.as_str()));
        }
        if !self.addresses.is_empty() {
            let data: Vec<PropertyDict> = self.addresses.iter().map(IpAddress::to_wire).collect();
            wire::push(&mut dict, "address-data", wire::dict_array_value(&data));
        }
        if let Some(gateway) = &self.gateway {
            wire::push(&mut dict, "gateway", wire::owned(gateway.as_str()));
        }
        if !self.routes.is_empty() {
            let data: Vec<PropertyDict> = self.routes.iter().map(IpRoute::to_wire).collect();
            wire::push(&mut dict, "route-data", wire::dict_array_value(&data));
        }
        if !self.routing_rules.is_empty() {
            let data: Vec<PropertyDict> =
                self.routing_rules.iter().map(RoutingRule::to_dbus).collect();
            wire::push(&mut dict, "routing-rules", wire::dict_array_value(&data));
        }
        if !self.dns.is_empty() {
            wire::push(&mut dict, "dns", wire::owned(self.dns.clone()));
        }
        if !self.dns_search.is_empty() {
            wire::push(&mut dict, "dns-search", wire::owned(self.dns_search.clone()));
        }
        if !self.dns_options.is_empty() {
            wire::push(&mut dict, "dns-options", wire::owned(self.dns_options.clone()));
        }
        if self.dns_priority != 0 {
            wire::push(&mut dict, "dns-priority", wire::owned(self.dns_priority));
        }
        if self.route_metric != -1 {
            wire::push(&mut dict, "route-metric", wire::owned(self.route_metric));
        }
        if self.route_table != 0 {
            wire::push(&mut dict, "route-table", wire::owned(self.route_table));
        }
        if self.never_default {
            wire::push(&mut dict, "never-default", wire::owned(true));
        }
        if self.ignore_auto_routes {
            wire::push(&mut dict, "ignore-auto-routes", wire::owned(true));
        }
        if self.ignore_auto_dns {
            wire::push(&mut dict, "ignore-auto-dns", wire::owned(true));
        }
        if !self.may_fail {
            wire::push(&mut dict, "may-fail", wire::owned(false));
        }
        if let Some(hostname) = &self.dhcp_hostname {
            wire::push(&mut dict, "dhcp-hostname", wire::owned(hostname.as_str()));
        }
        if let Some(send) = self.dhcp_send_hostname {
            wire::push(&mut dict, "dhcp-send-hostname", wire::owned(send));
        }
        if self.dhcp_send_hostname_v2 != SEND_HOSTNAME_DEFAULT {
            wire::push(
                &mut dict,
                "dhcp-send-hostname-v2",
                wire::owned(self.dhcp_send_hostname_v2),
            );
        }
        if self.dhcp_timeout != 0 {
            wire::push(&mut dict, "dhcp-timeout", wire::owned(self.dhcp_timeout));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, flags: ParseFlags) -> Result<()> {
        let n = self.name();
        self.method = wire::opt_str(n, dict, "method")?;
        self.addresses = match wire::opt_dict_array(n, dict, "address-data")? {
            None => Vec::new(),
            Some(dicts) => dicts
                .iter()
                .map(|d| IpAddress::from_wire(n, d))
                .collect::<Result<_>>()?,
        };
        self.gateway = wire::opt_str(n, dict, "gateway")?;
        self.routes = match wire::opt_dict_array(n, dict, "route-data")? {
            None => Vec::new(),
            Some(dicts) => dicts
                .iter()
                .map(|d| IpRoute::from_wire(n, d))
                .collect::<Result<_>>()?,
        };
        self.routing_rules = match wire::opt_dict_array(n, dict, "routing-rules")? {
            None => Vec::new(),
            Some(dicts) => dicts
                .iter()
                .map(|d| RoutingRule::from_dbus(d, flags))
                .collect::<Result<_>>()?,
        };
        self.dns = wire::opt_string_list(n, dict, "dns")?.unwrap_or_default();
        self.dns_search = wire::opt_string_list(n, dict, "dns-search")?.unwrap_or_default();
        self.dns_options = wire::opt_string_list(n, dict, "dns-options")?.unwrap_or_default();
        self.dns_priority = wire::opt_i32(n, dict, "dns-priority")?.unwrap_or(0);
        self.route_metric = wire::opt_i64(n, dict, "route-metric")?.unwrap_or(-1);
        self.route_table = wire::opt_u32(n, dict, "route-table")?.unwrap_or(0);
        self.never_default = wire::opt_bool(n, dict, "never-default")?.unwrap_or(false);
        self.ignore_auto_routes = wire::opt_bool(n, dict, "ignore-auto-routes")?.unwrap_or(false);
        self.ignore_auto_dns = wire::opt_bool(n, dict, "ignore-auto-dns")?.unwrap_or(false);
        self.may_fail = wire::opt_bool(n, dict, "may-fail")?.unwrap_or(true);
        self.dhcp_hostname = wire::opt_str(n, dict, "dhcp-hostname")?;
        self.dhcp_send_hostname = wire::opt_bool(n, dict, "dhcp-send-hostname")?;
        self.dhcp_send_hostname_v2 =
            wire::opt_i32(n, dict, "dhcp-send-hostname-v2")?.unwrap_or(SEND_HOSTNAME_DEFAULT);
        self.dhcp_timeout = wire::opt_i32(n, dict, "dhcp-timeout")?.unwrap_or(0);
        Ok(())
    }
}

const PROXY_METHODS: [&str; 2] = ["auto", "none"];

/// The `proxy` setting: the family-independent ("any") concern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProxySetting {
    pub method: Option<String>,
    pub browser_only: bool,
    pub pac_url: Option<String>,
    pub pac_script: Option<String>,
}

impl ProxySetting {
    pub const NAME: &'static str = "proxy";

    const PROPERTIES: [&'static str; 4] = ["browser-only", "method", "pac-script", "pac-url"];
}

impl SettingData for ProxySetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Proxy
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if let Some(method) = &self.method {
            if !PROXY_METHODS.contains(&method.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "method",
                    format!("unknown method: {}", method),
                ));
            }
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(method) = &self.method {
            wire::push(&mut dict, "method", wire::owned(method.as_str()));
        }
        if self.browser_only {
            wire::push(&mut dict, "browser-only", wire::owned(true));
        }
        if let Some(url) = &self.pac_url {
            wire::push(&mut dict, "pac-url", wire::owned(url.as_str()));
        }
        if let Some(script) = &self.pac_script {
            wire::push(&mut dict, "pac-script", wire::owned(script.as_str()));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.method = wire::opt_str(n, dict, "method")?;
        self.browser_only = wire::opt_bool(n, dict, "browser-only")?.unwrap_or(false);
        self.pac_url = wire::opt_str(n, dict, "pac-url")?;
        self.pac_script = wire::opt_str(n, dict, "pac-script")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_missing_method_is_normalizable() {
        let conn = Connection::new();
        let setting = IpConfigSetting::new(Family::V4);
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_manual_requires_addresses() {
        let conn = Connection::new();
        let mut setting = IpConfigSetting::with_method(Family::V4, "manual");
        assert!(setting.verify(&conn).is_failure());
        setting
            .addresses
            .push(IpAddress::new(Family::V4, "10.0.0.2", 24).unwrap());
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_gateway_rules() {
        let conn = Connection::new();
        let mut setting = IpConfigSetting::with_method(Family::V4, "manual");
        setting
            .addresses
            .push(IpAddress::new(Family::V4, "10.0.0.2", 24).unwrap());
        setting.gateway = Some("10.0.0.1".into());
        assert!(setting.verify(&conn).is_success());

        // Wrong family.
        setting.gateway = Some("fe80::1".into());
        assert!(setting.verify(&conn).is_failure());

        // With never-default the gateway is a soft error.
        setting.gateway = Some("10.0.0.1".into());
        setting.never_default = true;
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_disabled_method_forces_may_fail() {
        let conn = Connection::new();
        let mut setting = IpConfigSetting::with_method(Family::V6, "ignore");
        setting.may_fail = false;
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_dhcp_send_hostname_conflict() {
        let conn = Connection::new();
        let mut setting = IpConfigSetting::with_method(Family::V4, "auto");
        setting.dhcp_send_hostname = Some(false);
        setting.dhcp_send_hostname_v2 = 1;
        assert!(setting.send_hostname_conflict());
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_ip6_methods() {
        let conn = Connection::new();
        let setting = IpConfigSetting::with_method(Family::V6, "dhcp");
        assert!(setting.verify(&conn).is_success());
        let setting = IpConfigSetting::with_method(Family::V4, "dhcp");
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_wire_round_trip_with_value_types() {
        let mut setting = IpConfigSetting::with_method(Family::V4, "manual");
        setting
            .addresses
            .push(IpAddress::new(Family::V4, "10.0.0.2", 24).unwrap());
        setting.gateway = Some("10.0.0.1".into());
        setting
            .routes
            .push(IpRoute::new(Family::V4, "10.1.0.0", 16, Some("10.0.0.254"), 50).unwrap());
        setting
            .routing_rules
            .push(RoutingRule::from_string("priority 100 from 10.0.0.0/24 table 100").unwrap());
        setting.dns = vec!["1.1.1.1".into()];

        let dict = setting.to_wire(ToWireOptions::All);
        let mut back = IpConfigSetting::new(Family::V4);
        back.update_from_wire(&dict, ParseFlags::empty()).unwrap();
        assert_eq!(setting, back);
    }
}
