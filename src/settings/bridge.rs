// Network Manager - Bridge Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `bridge` and `bridge-port` settings.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::normalize_mac_address;
use crate::wire::{self, PropertyDict};

use super::SettingData;

/// One VLAN filtering entry on a bridge or bridge port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeVlan {
    pub vid_start: u16,
    pub vid_end: u16,
    pub pvid: bool,
    pub untagged: bool,
}

impl BridgeVlan {
    pub fn new(vid_start: u16, vid_end: u16) -> Self {
        Self {
            vid_start,
            vid_end,
            pvid: false,
            untagged: false,
        }
    }

    fn verify(&self, setting: &str) -> Option<Error> {
        if self.vid_start == 0
            || self.vid_end > 4094
            || self.vid_start > self.vid_end
        {
            Some(Error::invalid_property(
                setting,
                "vlans",
                format!("invalid vlan range {}-{}", self.vid_start, self.vid_end),
            ))
        } else {
            None
        }
    }

    fn to_wire(&self) -> PropertyDict {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "vid-start", wire::owned(self.vid_start));
        wire::push(&mut dict, "vid-end", wire::owned(self.vid_end));
        if self.pvid {
            wire::push(&mut dict, "pvid", wire::owned(true));
        }
        if self.untagged {
            wire::push(&mut dict, "untagged", wire::owned(true));
        }
        dict
    }

    fn from_wire(setting: &str, dict: &PropertyDict) -> Result<Self> {
        let vid_start = wire::opt_u16(setting, dict, "vid-start")?
            .ok_or_else(|| Error::missing_property(setting, "vid-start"))?;
        let vid_end = wire::opt_u16(setting, dict, "vid-end")?.unwrap_or(vid_start);
        Ok(Self {
            vid_start,
            vid_end,
            pvid: wire::opt_bool(setting, dict, "pvid")?.unwrap_or(false),
            untagged: wire::opt_bool(setting, dict, "untagged")?.unwrap_or(false),
        })
    }
}

/// Whether a VLAN list is sorted by start id.
pub fn vlans_sorted(vlans: &[BridgeVlan]) -> bool {
    vlans.windows(2).all(|w| w[0].vid_start <= w[1].vid_start)
}

fn vlans_to_wire(dict: &mut PropertyDict, vlans: &[BridgeVlan]) {
    if !vlans.is_empty() {
        let data: Vec<PropertyDict> = vlans.iter().map(BridgeVlan::to_wire).collect();
        wire::push(dict, "vlans", wire::dict_array_value(&data));
    }
}

fn vlans_from_wire(setting: &str, dict: &PropertyDict) -> Result<Vec<BridgeVlan>> {
    match wire::opt_dict_array(setting, dict, "vlans")? {
        None => Ok(Vec::new()),
        Some(dicts) => dicts
            .iter()
            .map(|d| BridgeVlan::from_wire(setting, d))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSetting {
    pub mac_address: Option<String>,
    pub stp: bool,
    pub priority: u32,
    pub forward_delay: u32,
    pub hello_time: u32,
    pub max_age: u32,
    pub ageing_time: u32,
    pub vlans: Vec<BridgeVlan>,
}

impl Default for BridgeSetting {
    fn default() -> Self {
        Self {
            mac_address: None,
            stp: true,
            priority: 0x8000,
            forward_delay: 15,
            hello_time: 2,
            max_age: 20,
            ageing_time: 300,
            vlans: Vec::new(),
        }
    }
}

impl BridgeSetting {
    pub const NAME: &'static str = "bridge";

    const PROPERTIES: [&'static str; 8] = [
        "ageing-time",
        "forward-delay",
        "hello-time",
        "mac-address",
        "max-age",
        "priority",
        "stp",
        "vlans",
    ];
}

impl SettingData for BridgeSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Bridge
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        let mut result = VerifyResult::Success;

        if let Some(mac) = &self.mac_address {
            if normalize_mac_address(mac).is_none() {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "mac-address",
                    format!("invalid MAC address: {}", mac),
                ));
            }
        }
        if self.priority > 0xFFFF {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "priority",
                "out of range",
            ));
        }
        // STP timers only matter with STP on.
        if self.stp {
            for (key, value, min, max) in [
                ("forward-delay", self.forward_delay, 2, 30),
                ("hello-time", self.hello_time, 1, 10),
                ("max-age", self.max_age, 6, 40),
            ] {
                if !(min..=max).contains(&value) {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        key,
                        format!("out of range [{}, {}]", min, max),
                    ));
                }
            }
        }
        for vlan in &self.vlans {
            if let Some(err) = vlan.verify(Self::NAME) {
                return VerifyResult::Failure(err);
            }
        }
        if !vlans_sorted(&self.vlans) {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "vlans",
                "vlan list not sorted",
            )));
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(mac) = &self.mac_address {
            wire::push(&mut dict, "mac-address", wire::owned(mac.as_str()));
        }
        if !self.stp {
            wire::push(&mut dict, "stp", wire::owned(false));
        }
        if self.priority != 0x8000 {
            wire::push(&mut dict, "priority", wire::owned(self.priority));
        }
        if self.forward_delay != 15 {
            wire::push(&mut dict, "forward-delay", wire::owned(self.forward_delay));
        }
        if self.hello_time != 2 {
            wire::push(&mut dict, "hello-time", wire::owned(self.hello_time));
        }
        if self.max_age != 20 {
            wire::push(&mut dict, "max-age", wire::owned(self.max_age));
        }
        if self.ageing_time != 300 {
            wire::push(&mut dict, "ageing-time", wire::owned(self.ageing_time));
        }
        vlans_to_wire(&mut dict, &self.vlans);
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.mac_address = wire::opt_str(n, dict, "mac-address")?;
        self.stp = wire::opt_bool(n, dict, "stp")?.unwrap_or(true);
        self.priority = wire::opt_u32(n, dict, "priority")?.unwrap_or(0x8000);
        self.forward_delay = wire::opt_u32(n, dict, "forward-delay")?.unwrap_or(15);
        self.hello_time = wire::opt_u32(n, dict, "hello-time")?.unwrap_or(2);
        self.max_age = wire::opt_u32(n, dict, "max-age")?.unwrap_or(20);
        self.ageing_time = wire::opt_u32(n, dict, "ageing-time")?.unwrap_or(300);
        self.vlans = vlans_from_wire(n, dict)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BridgePortSetting {
    pub priority: u32,
    pub path_cost: u32,
    pub hairpin_mode: bool,
    pub vlans: Vec<BridgeVlan>,
}

impl BridgePortSetting {
    pub const NAME: &'static str = "bridge-port";

    const PROPERTIES: [&'static str; 4] = ["hairpin-mode", "path-cost", "priority", "vlans"];
}

impl SettingData for BridgePortSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::BridgePort
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if self.priority > 63 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "priority",
                "out of range [0, 63]",
            ));
        }
        if self.path_cost > 65535 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "path-cost",
                "out of range [0, 65535]",
            ));
        }
        for vlan in &self.vlans {
            if let Some(err) = vlan.verify(Self::NAME) {
                return VerifyResult::Failure(err);
            }
        }
        if !vlans_sorted(&self.vlans) {
            return VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "vlans",
                "vlan list not sorted",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if self.priority != 0 {
            wire::push(&mut dict, "priority", wire::owned(self.priority));
        }
        if self.path_cost != 0 {
            wire::push(&mut dict, "path-cost", wire::owned(self.path_cost));
        }
        if self.hairpin_mode {
            wire::push(&mut dict, "hairpin-mode", wire::owned(true));
        }
        vlans_to_wire(&mut dict, &self.vlans);
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.priority = wire::opt_u32(n, dict, "priority")?.unwrap_or(0);
        self.path_cost = wire::opt_u32(n, dict, "path-cost")?.unwrap_or(0);
        self.hairpin_mode = wire::opt_bool(n, dict, "hairpin-mode")?.unwrap_or(false);
        self.vlans = vlans_from_wire(n, dict)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_stp_timer_bounds() {
        let conn = Connection::new();
        let mut setting = BridgeSetting::default();
        assert!(setting.verify(&conn).is_success());
        setting.forward_delay = 1;
        assert!(setting.verify(&conn).is_failure());
        // With STP off the timers are not checked.
        setting.stp = false;
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_unsorted_vlans_normalizable() {
        let conn = Connection::new();
        let mut setting = BridgeSetting::default();
        setting.vlans = vec![BridgeVlan::new(100, 200), BridgeVlan::new(10, 20)];
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.vlans.sort_by_key(|v| v.vid_start);
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_invalid_vlan_range() {
        let conn = Connection::new();
        let mut setting = BridgePortSetting::default();
        setting.vlans = vec![BridgeVlan::new(0, 10)];
        assert!(setting.verify(&conn).is_failure());
        setting.vlans = vec![BridgeVlan::new(10, 4095)];
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_vlan_wire_round_trip() {
        let mut setting = BridgeSetting::default();
        let mut vlan = BridgeVlan::new(10, 20);
        vlan.untagged = true;
        setting.vlans = vec![vlan];
        let dict = setting.to_wire(ToWireOptions::All);
        let mut back = BridgeSetting::default();
        back.update_from_wire(&dict, ParseFlags::empty()).unwrap();
        assert_eq!(setting, back);
    }
}
