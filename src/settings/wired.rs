// Network Manager - Wired Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `802-3-ethernet` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::normalize_mac_address;
use crate::wire::{self, PropertyDict};

use super::SettingData;

const DUPLEX_VALUES: [&str; 2] = ["full", "half"];

#[derive(Debug, Clone, PartialEq)]
pub struct WiredSetting {
    pub port: Option<String>,
    /// Link speed in Mbit/s; 0 means unset.
    pub speed: u32,
    pub duplex: Option<String>,
    pub auto_negotiate: bool,
    pub mac_address: Option<String>,
    pub cloned_mac_address: Option<String>,
    pub mtu: u32,
    pub wake_on_lan: u32,
}

impl Default for WiredSetting {
    fn default() -> Self {
        Self {
            port: None,
            speed: 0,
            duplex: None,
            auto_negotiate: false,
            mac_address: None,
            cloned_mac_address: None,
            mtu: 0,
            wake_on_lan: 1,
        }
    }
}

impl WiredSetting {
    pub const NAME: &'static str = "802-3-ethernet";

    const PROPERTIES: [&'static str; 8] = [
        "auto-negotiate",
        "cloned-mac-address",
        "duplex",
        "mac-address",
        "mtu",
        "port",
        "speed",
        "wake-on-lan",
    ];
}

impl SettingData for WiredSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Wired
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if let Some(duplex) = &self.duplex {
            if !DUPLEX_VALUES.contains(&duplex.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "duplex",
                    format!("must be 'full' or 'half', not '{}'", duplex),
                ));
            }
        }

        for (key, mac) in [
            ("mac-address", &self.mac_address),
            ("cloned-mac-address", &self.cloned_mac_address),
        ] {
            if let Some(mac) = mac {
                // "random"/"stable"/"preserve" are accepted for cloning.
                let special = key == "cloned-mac-address"
                    && ["random", "stable", "preserve", "permanent"].contains(&mac.as_str());
                if !special && normalize_mac_address(mac).is_none() {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        key,
                        format!("invalid MAC address: {}", mac),
                    ));
                }
            }
        }

        // Link negotiation wants speed and duplex together or not at all.
        if !self.auto_negotiate && (self.speed != 0) != self.duplex.is_some() {
            return VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "speed",
                "speed and duplex must be set together",
            ));
        }

        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(port) = &self.port {
            wire::push(&mut dict, "port", wire::owned(port.as_str()));
        }
        if self.speed != 0 {
            wire::push(&mut dict, "speed", wire::owned(self.speed));
        }
        if let Some(duplex) = &self.duplex {
            wire::push(&mut dict, "duplex", wire::owned(duplex.as_str()));
        }
        if self.auto_negotiate {
            wire::push(&mut dict, "auto-negotiate", wire::owned(true));
        }
        if let Some(mac) = &self.mac_address {
            wire::push(&mut dict, "mac-address", wire::owned(mac.as_str()));
        }
        if let Some(mac) = &self.cloned_mac_address {
            wire::push(&mut dict, "cloned-mac-address", wire::owned(mac.as_str()));
        }
        if self.mtu != 0 {
            wire::push(&mut dict, "mtu", wire::owned(self.mtu));
        }
        if self.wake_on_lan != 1 {
            wire::push(&mut dict, "wake-on-lan", wire::owned(self.wake_on_lan));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.port = wire::opt_str(n, dict, "port")?;
        self.speed = wire::opt_u32(n, dict, "speed")?.unwrap_or(0);
        self.duplex = wire::opt_str(n, dict, "duplex")?;
        self.auto_negotiate = wire::opt_bool(n, dict, "auto-negotiate")?.unwrap_or(false);
        self.mac_address = wire::opt_str(n, dict, "mac-address")?;
        self.cloned_mac_address = wire::opt_str(n, dict, "cloned-mac-address")?;
        self.mtu = wire::opt_u32(n, dict, "mtu")?.unwrap_or(0);
        self.wake_on_lan = wire::opt_u32(n, dict, "wake-on-lan")?.unwrap_or(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_speed_without_duplex_is_normalizable() {
        let conn = Connection::new();
        let mut setting = WiredSetting::default();
        setting.speed = 1000;
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.duplex = Some("full".into());
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_invalid_duplex_rejected() {
        let conn = Connection::new();
        let mut setting = WiredSetting::default();
        setting.duplex = Some("sideways".into());
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_cloned_mac_special_values() {
        let conn = Connection::new();
        let mut setting = WiredSetting::default();
        setting.cloned_mac_address = Some("random".into());
        assert!(setting.verify(&conn).is_success());
        setting.mac_address = Some("random".into());
        assert!(setting.verify(&conn).is_failure());
    }
}
