// Network Manager - Open vSwitch Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `ovs-bridge`, `ovs-port` and `ovs-interface` settings.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OvsBridgeSetting {
    pub fail_mode: Option<String>,
    pub mcast_snooping_enable: bool,
    pub rstp_enable: bool,
    pub stp_enable: bool,
}

impl OvsBridgeSetting {
    pub const NAME: &'static str = "ovs-bridge";

    const PROPERTIES: [&'static str; 4] = [
        "fail-mode",
        "mcast-snooping-enable",
        "rstp-enable",
        "stp-enable",
    ];
}

impl SettingData for OvsBridgeSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::OvsBridge
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if let Some(fail_mode) = &self.fail_mode {
            if !["secure", "standalone"].contains(&fail_mode.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "fail-mode",
                    format!("unknown fail mode: {}", fail_mode),
                ));
            }
        }
        if self.stp_enable && self.rstp_enable {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "rstp-enable",
                "stp and rstp are mutually exclusive",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(fail_mode) = &self.fail_mode {
            wire::push(&mut dict, "fail-mode", wire::owned(fail_mode.as_str()));
        }
        if self.mcast_snooping_enable {
            wire::push(&mut dict, "mcast-snooping-enable", wire::owned(true));
        }
        if self.rstp_enable {
            wire::push(&mut dict, "rstp-enable", wire::owned(true));
        }
        if self.stp_enable {
            wire::push(&mut dict, "stp-enable", wire::owned(true));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.fail_mode = wire::opt_str(n, dict, "fail-mode")?;
        self.mcast_snooping_enable =
            wire::opt_bool(n, dict, "mcast-snooping-enable")?.unwrap_or(false);
        self.rstp_enable = wire::opt_bool(n, dict, "rstp-enable")?.unwrap_or(false);
        self.stp_enable = wire::opt_bool(n, dict, "stp-enable")?.unwrap_or(false);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OvsPortSetting {
    pub vlan_mode: Option<String>,
    pub tag: u32,
    pub lacp: Option<String>,
    pub bond_mode: Option<String>,
    /// Trunk VLAN ranges, kept sorted by start.
    pub trunks: Vec<(u16, u16)>,
}

impl OvsPortSetting {
    pub const NAME: &'static str = "ovs-port";

    const PROPERTIES: [&'static str; 5] = ["bond-mode", "lacp", "tag", "trunks", "vlan-mode"];

    pub fn trunks_sorted(&self) -> bool {
        self.trunks.windows(2).all(|w| w[0].0 <= w[1].0)
    }
}

impl SettingData for OvsPortSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::OvsPort
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if let Some(mode) = &self.vlan_mode {
            if !["access", "native-tagged", "native-untagged", "trunk"].contains(&mode.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "vlan-mode",
                    format!("unknown vlan mode: {}", mode),
                ));
            }
        }
        if self.tag > 4095 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "tag",
                "out of range [0, 4095]",
            ));
        }
        if let Some(lacp) = &self.lacp {
            if !["active", "off", "passive"].contains(&lacp.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "lacp",
                    format!("unknown lacp mode: {}", lacp),
                ));
            }
        }
        if let Some(bond_mode) = &self.bond_mode {
            if !["active-backup", "balance-slb", "balance-tcp"].contains(&bond_mode.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "bond-mode",
                    format!("unknown bond mode: {}", bond_mode),
                ));
            }
        }
        for (start, end) in &self.trunks {
            if start > end || *end > 4095 {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "trunks",
                    format!("invalid trunk range {}-{}", start, end),
                ));
            }
        }
        if !self.trunks_sorted() {
            return VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "trunks",
                "trunk list not sorted",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(mode) = &self.vlan_mode {
            wire::push(&mut dict, "vlan-mode", wire::owned(mode.as_str()));
        }
        if self.tag != 0 {
            wire::push(&mut dict, "tag", wire::owned(self.tag));
        }
        if let Some(lacp) = &self.lacp {
            wire::push(&mut dict, "lacp", wire::owned(lacp.as_str()));
        }
        if let Some(bond_mode) = &self.bond_mode {
            wire::push(&mut dict, "bond-mode", wire::owned(bond_mode.as_str()));
        }
        if !self.trunks.is_empty() {
            let data: Vec<PropertyDict> = self
                .trunks
                .iter()
                .map(|(start, end)| {
                    let mut d = PropertyDict::new();
                    wire::push(&mut d, "start", wire::owned(*start));
                    wire::push(&mut d, "end", wire::owned(*end));
                    d
                })
                .collect();
            wire::push(&mut dict, "trunks", wire::dict_array_value(&data));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.vlan_mode = wire::opt_str(n, dict, "vlan-mode")?;
        self.tag = wire::opt_u32(n, dict, "tag")?.unwrap_or(0);
        self.lacp = wire::opt_str(n, dict, "lacp")?;
        self.bond_mode = wire::opt_str(n, dict, "bond-mode")?;
        self.trunks = match wire::opt_dict_array(n, dict, "trunks")? {
            None => Vec::new(),
            Some(dicts) => {
                let mut trunks = Vec::new();
                for d in &dicts {
                    let start = wire::opt_u16(n, d, "start")?
                        .ok_or_else(|| Error::missing_property(n, "trunks"))?;
                    let end = wire::opt_u16(n, d, "end")?.unwrap_or(start);
                    trunks.push((start, end));
                }
                trunks
            }
        };
        Ok(())
    }
}

/// Interface types an OVS interface can take.
pub const OVS_INTERFACE_TYPES: [&str; 4] = ["dpdk", "internal", "patch", "system"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OvsInterfaceSetting {
    pub interface_type: Option<String>,
}

impl OvsInterfaceSetting {
    pub const NAME: &'static str = "ovs-interface";

    const PROPERTIES: [&'static str; 1] = ["type"];
}

impl SettingData for OvsInterfaceSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::OvsInterface
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        match self.interface_type.as_deref() {
            None => VerifyResult::Normalizable(Error::missing_property(Self::NAME, "type")),
            Some(t) if OVS_INTERFACE_TYPES.contains(&t) => VerifyResult::Success,
            Some(t) => VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "type",
                format!("unknown interface type: {}", t),
            )),
        }
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(t) = &self.interface_type {
                wire::push(&mut dict, "type", wire::owned(t.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.interface_type = wire::opt_str(Self::NAME, dict, "type")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_stp_rstp_exclusive() {
        let conn = Connection::new();
        let mut setting = OvsBridgeSetting::default();
        setting.stp_enable = true;
        assert!(setting.verify(&conn).is_success());
        setting.rstp_enable = true;
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_unsorted_trunks_normalizable() {
        let conn = Connection::new();
        let mut setting = OvsPortSetting::default();
        setting.trunks = vec![(100, 200), (10, 20)];
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_interface_type_inferred() {
        let conn = Connection::new();
        let setting = OvsInterfaceSetting::default();
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        let setting = OvsInterfaceSetting {
            interface_type: Some("internal".into()),
        };
        assert!(setting.verify(&conn).is_success());
    }
}
