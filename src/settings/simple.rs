// Network Manager - Simple Link Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Settings for simple virtual link types: `dummy`, `vrf`, `wpan`,
//! `6lowpan`, `tun`, `veth`, `loopback` and `generic`.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::is_valid_ifname;
use crate::wire::{self, PropertyDict};

use super::SettingData;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DummySetting;

impl DummySetting {
    pub const NAME: &'static str = "dummy";
}

impl SettingData for DummySetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Dummy
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &[]
    }

    fn to_wire(&self, _options: ToWireOptions) -> PropertyDict {
        PropertyDict::new()
    }

    fn update_from_wire(&mut self, _dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VrfSetting {
    pub table: u32,
}

impl VrfSetting {
    pub const NAME: &'static str = "vrf";

    const PROPERTIES: [&'static str; 1] = ["table"];
}

impl SettingData for VrfSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Vrf
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if self.table == 0 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "table",
                "routing table must be nonzero",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() && self.table != 0 {
            wire::push(&mut dict, "table", wire::owned(self.table));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.table = wire::opt_u32(Self::NAME, dict, "table")?.unwrap_or(0);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WpanSetting {
    pub mac_address: Option<String>,
}

impl WpanSetting {
    pub const NAME: &'static str = "wpan";

    const PROPERTIES: [&'static str; 1] = ["mac-address"];
}

impl SettingData for WpanSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Wpan
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(mac) = &self.mac_address {
                wire::push(&mut dict, "mac-address", wire::owned(mac.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.mac_address = wire::opt_str(Self::NAME, dict, "mac-address")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SixlowpanSetting {
    pub parent: Option<String>,
}

impl SixlowpanSetting {
    pub const NAME: &'static str = "6lowpan";

    const PROPERTIES: [&'static str; 1] = ["parent"];
}

impl SettingData for SixlowpanSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Sixlowpan
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if self.parent.is_none() {
            return VerifyResult::Failure(Error::missing_property(Self::NAME, "parent"));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(parent) = &self.parent {
                wire::push(&mut dict, "parent", wire::owned(parent.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.parent = wire::opt_str(Self::NAME, dict, "parent")?;
        Ok(())
    }
}

/// Tun device operating modes.
pub const TUN_MODE_TUN: u32 = 1;
pub const TUN_MODE_TAP: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct TunSetting {
    pub mode: u32,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub pi: bool,
    pub vnet_hdr: bool,
    pub multi_queue: bool,
}

impl Default for TunSetting {
    fn default() -> Self {
        Self {
            mode: TUN_MODE_TUN,
            owner: None,
            group: None,
            pi: false,
            vnet_hdr: false,
            multi_queue: false,
        }
    }
}

impl TunSetting {
    pub const NAME: &'static str = "tun";

    const PROPERTIES: [&'static str; 6] =
        ["group", "mode", "multi-queue", "owner", "pi", "vnet-hdr"];
}

impl SettingData for TunSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Tun
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if !(TUN_MODE_TUN..=TUN_MODE_TAP).contains(&self.mode) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "mode",
                "must be tun (1) or tap (2)",
            ));
        }
        for (key, value) in [("owner", &self.owner), ("group", &self.group)] {
            if let Some(id) = value {
                if id.parse::<u32>().is_err() {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        key,
                        format!("not a numeric id: {}", id),
                    ));
                }
            }
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if self.mode != TUN_MODE_TUN {
            wire::push(&mut dict, "mode", wire::owned(self.mode));
        }
        if let Some(owner) = &self.owner {
            wire::push(&mut dict, "owner", wire::owned(owner.as_str()));
        }
        if let Some(group) = &self.group {
            wire::push(&mut dict, "group", wire::owned(group.as_str()));
        }
        if self.pi {
            wire::push(&mut dict, "pi", wire::owned(true));
        }
        if self.vnet_hdr {
            wire::push(&mut dict, "vnet-hdr", wire::owned(true));
        }
        if self.multi_queue {
            wire::push(&mut dict, "multi-queue", wire::owned(true));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.mode = wire::opt_u32(n, dict, "mode")?.unwrap_or(TUN_MODE_TUN);
        self.owner = wire::opt_str(n, dict, "owner")?;
        self.group = wire::opt_str(n, dict, "group")?;
        self.pi = wire::opt_bool(n, dict, "pi")?.unwrap_or(false);
        self.vnet_hdr = wire::opt_bool(n, dict, "vnet-hdr")?.unwrap_or(false);
        self.multi_queue = wire::opt_bool(n, dict, "multi-queue")?.unwrap_or(false);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VethSetting {
    pub peer: Option<String>,
}

impl VethSetting {
    pub const NAME: &'static str = "veth";

    const PROPERTIES: [&'static str; 1] = ["peer"];
}

impl SettingData for VethSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Veth
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        match &self.peer {
            None => VerifyResult::Failure(Error::missing_property(Self::NAME, "peer")),
            Some(peer) if !is_valid_ifname(peer) => {
                VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "peer",
                    format!("not a valid interface name: {}", peer),
                ))
            }
            Some(_) => VerifyResult::Success,
        }
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(peer) = &self.peer {
                wire::push(&mut dict, "peer", wire::owned(peer.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.peer = wire::opt_str(Self::NAME, dict, "peer")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopbackSetting {
    pub mtu: u32,
}

impl LoopbackSetting {
    pub const NAME: &'static str = "loopback";

    const PROPERTIES: [&'static str; 1] = ["mtu"];
}

impl SettingData for LoopbackSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Loopback
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() && self.mtu != 0 {
            wire::push(&mut dict, "mtu", wire::owned(self.mtu));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.mtu = wire::opt_u32(Self::NAME, dict, "mtu")?.unwrap_or(0);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenericSetting;

impl GenericSetting {
    pub const NAME: &'static str = "generic";
}

impl SettingData for GenericSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Generic
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &[]
    }

    fn to_wire(&self, _options: ToWireOptions) -> PropertyDict {
        PropertyDict::new()
    }

    fn update_from_wire(&mut self, _dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_vrf_table_required() {
        let conn = Connection::new();
        assert!(VrfSetting::default().verify(&conn).is_failure());
        assert!(VrfSetting { table: 10 }.verify(&conn).is_success());
    }

    #[test]
    fn test_tun_owner_numeric() {
        let conn = Connection::new();
        let mut setting = TunSetting::default();
        setting.owner = Some("1000".into());
        assert!(setting.verify(&conn).is_success());
        setting.owner = Some("alice".into());
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_veth_peer_required() {
        let conn = Connection::new();
        assert!(VethSetting::default().verify(&conn).is_failure());
        let setting = VethSetting {
            peer: Some("veth1".into()),
        };
        assert!(setting.verify(&conn).is_success());
    }
}
