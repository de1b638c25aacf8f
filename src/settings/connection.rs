// Network Manager - Connection Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `connection` setting: identity, type, and port/controller
//! relationship of a profile.

use uuid::Uuid;

use crate::connection::Connection;
use crate::error::{Error, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::{self, SettingKind, SettingPriority};
use crate::validate::is_valid_ifname;
use crate::wire::{self, PropertyDict};

use super::SettingData;

/// Accepted values of the `port-type` property: the setting name of the
/// controller the connection attaches to.
pub const PORT_TYPES: [&str; 6] = ["bond", "bridge", "ovs-bridge", "ovs-port", "team", "vrf"];

/// Identity and relationship properties shared by every profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSetting {
    pub id: Option<String>,
    pub uuid: Option<String>,
    /// Wire name `type`: the base setting name describing the technology.
    pub connection_type: Option<String>,
    pub interface_name: Option<String>,
    pub autoconnect: bool,
    pub autoconnect_priority: i32,
    /// Seconds since the epoch of the last successful activation.
    pub timestamp: u64,
    pub read_only: bool,
    pub permissions: Vec<String>,
    /// UUIDs of connections activated alongside this one.
    pub secondaries: Vec<String>,
    /// Addresses pinged to confirm connectivity after activation.
    pub ip_ping_addresses: Vec<String>,
    /// Controller connection (UUID or interface name) this is a port of.
    pub controller: Option<String>,
    pub port_type: Option<String>,
}

impl Default for ConnectionSetting {
    fn default() -> Self {
        Self {
            id: None,
            uuid: None,
            connection_type: None,
            interface_name: None,
            autoconnect: true,
            autoconnect_priority: 0,
            timestamp: 0,
            read_only: false,
            permissions: Vec::new(),
            secondaries: Vec::new(),
            ip_ping_addresses: Vec::new(),
            controller: None,
            port_type: None,
        }
    }
}

impl ConnectionSetting {
    pub const NAME: &'static str = "connection";

    const PROPERTIES: [&'static str; 13] = [
        "autoconnect",
        "autoconnect-priority",
        "controller",
        "id",
        "interface-name",
        "ip-ping-addresses",
        "permissions",
        "port-type",
        "read-only",
        "secondaries",
        "timestamp",
        "type",
        "uuid",
    ];

    /// Whether the uuid is in canonical (lowercase hyphenated) form.
    pub fn uuid_is_canonical(uuid: &str) -> bool {
        Uuid::try_parse(uuid).is_ok_and(|u| u.to_string() == uuid)
    }
}

fn has_duplicates(list: &[String]) -> bool {
    list.iter()
        .enumerate()
        .any(|(i, item)| list[..i].contains(item))
}

impl SettingData for ConnectionSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Connection
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, connection: &Connection) -> VerifyResult {
        let mut result = VerifyResult::Success;

        // Identity. A missing id is repaired together with the type.
        match &self.id {
            None => {
                result = result.merge(VerifyResult::Normalizable(Error::missing_property(
                    Self::NAME,
                    "id",
                )));
            }
            Some(id) if id.is_empty() => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "id",
                    "must not be empty",
                ));
            }
            Some(_) => {}
        }

        match &self.uuid {
            None => {
                result = result.merge(VerifyResult::Normalizable(Error::missing_property(
                    Self::NAME,
                    "uuid",
                )));
            }
            Some(uuid) if !Self::uuid_is_canonical(uuid) => {
                result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                    Self::NAME,
                    "uuid",
                    format!("not a canonical uuid: {}", uuid),
                )));
            }
            Some(_) => {}
        }

        match &self.connection_type {
            None => {
                // Repairable only when inference from a single base
                // setting is possible.
                if connection.single_base_type().is_none() {
                    return VerifyResult::Failure(Error::missing_property(Self::NAME, "type"));
                }
                result = result.merge(VerifyResult::Normalizable(Error::missing_property(
                    Self::NAME,
                    "type",
                )));
            }
            Some(type_name) => match registry::by_name(type_name) {
                Some(desc) if desc.priority == SettingPriority::HwBase => {
                    if !connection.has_setting(desc.kind) {
                        result = result.merge(VerifyResult::Normalizable(Error::missing_setting(
                            type_name.clone(),
                        )));
                    }
                }
                _ => {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        "type",
                        format!("unknown connection type: {}", type_name),
                    ));
                }
            },
        }

        if let Some(name) = &self.interface_name {
            if !is_valid_ifname(name) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "interface-name",
                    format!("not a valid interface name: {}", name),
                ));
            }
        }

        if !(-999..=999).contains(&self.autoconnect_priority) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "autoconnect-priority",
                "out of range [-999, 999]",
            ));
        }

        match (&self.controller, &self.port_type) {
            (None, Some(port_type)) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "port-type",
                    format!("port-type '{}' requires a controller", port_type),
                ));
            }
            (Some(_), Some(port_type)) if !PORT_TYPES.contains(&port_type.as_str()) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "port-type",
                    format!("unknown port-type: {}", port_type),
                ));
            }
            (Some(_), None) => {
                // Only repairable when the port-role settings make the
                // port-type unambiguous.
                if connection.detect_port_type().is_some() {
                    result = result.merge(VerifyResult::Normalizable(Error::missing_property(
                        Self::NAME,
                        "port-type",
                    )));
                }
            }
            _ => {}
        }

        if self.read_only {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "read-only",
                "stray read-only flag",
            )));
        }

        if has_duplicates(&self.secondaries)
            || self
                .secondaries
                .iter()
                .any(|u| Uuid::try_parse(u).is_err())
        {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "secondaries",
                "duplicate or malformed uuid entries",
            )));
        }

        for address in &self.ip_ping_addresses {
            if address.parse::<std::net::IpAddr>().is_err() {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "ip-ping-addresses",
                    format!("invalid address: {}", address),
                ));
            }
        }
        if has_duplicates(&self.ip_ping_addresses) {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "ip-ping-addresses",
                "duplicate entries",
            )));
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(id) = &self.id {
            wire::push(&mut dict, "id", wire::owned(id.as_str()));
        }
        if let Some(uuid) = &self.uuid {
            wire::push(&mut dict, "uuid", wire::owned(uuid.as_str()));
        }
        if let Some(t) = &self.connection_type {
            wire::push(&mut dict, "type", wire::owned(t.as_str()));
        }
        if let Some(name) = &self.interface_name {
            wire::push(&mut dict, "interface-name", wire::owned(name.as_str()));
        }
        if !self.autoconnect {
            wire::push(&mut dict, "autoconnect", wire::owned(false));
        }
        if self.autoconnect_priority != 0 {
            wire::push(&mut dict, "autoconnect-priority", wire::owned(self.autoconnect_priority));
        }
        if self.timestamp != 0 {
            wire::push(&mut dict, "timestamp", wire::owned(self.timestamp));
        }
        if self.read_only {
            wire::push(&mut dict, "read-only", wire::owned(true));
        }
        if !self.permissions.is_empty() {
            wire::push(&mut dict, "permissions", wire::owned(self.permissions.clone()));
        }
        if !self.secondaries.is_empty() {
            wire::push(&mut dict, "secondaries", wire::owned(self.secondaries.clone()));
        }
        if !self.ip_ping_addresses.is_empty() {
            wire::push(
                &mut dict,
                "ip-ping-addresses",
                wire::owned(self.ip_ping_addresses.clone()),
            );
        }
        if let Some(controller) = &self.controller {
            wire::push(&mut dict, "controller", wire::owned(controller.as_str()));
        }
        if let Some(port_type) = &self.port_type {
            wire::push(&mut dict, "port-type", wire::owned(port_type.as_str()));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> crate::error::Result<()> {
        let n = Self::NAME;
        self.id = wire::opt_str(n, dict, "id")?;
        self.uuid = wire::opt_str(n, dict, "uuid")?;
        self.connection_type = wire::opt_str(n, dict, "type")?;
        self.interface_name = wire::opt_str(n, dict, "interface-name")?;
        self.autoconnect = wire::opt_bool(n, dict, "autoconnect")?.unwrap_or(true);
        self.autoconnect_priority = wire::opt_i32(n, dict, "autoconnect-priority")?.unwrap_or(0);
        self.timestamp = wire::opt_u64(n, dict, "timestamp")?.unwrap_or(0);
        self.read_only = wire::opt_bool(n, dict, "read-only")?.unwrap_or(false);
        self.permissions = wire::opt_string_list(n, dict, "permissions")?.unwrap_or_default();
        self.secondaries = wire::opt_string_list(n, dict, "secondaries")?.unwrap_or_default();
        self.ip_ping_addresses =
            wire::opt_string_list(n, dict, "ip-ping-addresses")?.unwrap_or_default();
        self.controller = wire::opt_str(n, dict, "controller")?;
        self.port_type = wire::opt_str(n, dict, "port-type")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_canonical() {
        assert!(ConnectionSetting::uuid_is_canonical(
            "2f283f08-7d4c-42f1-a472-47120dbf7e76"
        ));
        assert!(!ConnectionSetting::uuid_is_canonical(
            "2F283F08-7D4C-42F1-A472-47120DBF7E76"
        ));
        assert!(!ConnectionSetting::uuid_is_canonical("not-a-uuid"));
        assert!(!ConnectionSetting::uuid_is_canonical(
            "2f283f087d4c42f1a47247120dbf7e76"
        ));
    }

    #[test]
    fn test_wire_defaults_omitted() {
        let setting = ConnectionSetting::default();
        assert!(setting.to_wire(ToWireOptions::All).is_empty());

        let mut setting = ConnectionSetting::default();
        setting.id = Some("office".into());
        setting.autoconnect = false;
        let dict = setting.to_wire(ToWireOptions::All);
        assert!(wire::lookup(&dict, "id").is_some());
        assert!(wire::lookup(&dict, "autoconnect").is_some());
        assert!(wire::lookup(&dict, "timestamp").is_none());
    }
}
