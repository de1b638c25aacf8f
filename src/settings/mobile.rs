// Network Manager - Mobile Broadband Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `gsm`, `cdma` and `bluetooth` settings, plus the `serial` and
//! `ppp` auxiliaries that modem connections carry.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, SecretFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::is_valid_bdaddr;
use crate::wire::{self, PropertyDict, WireValue};

use super::SettingData;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GsmSetting {
    pub number: Option<String>,
    pub apn: Option<String>,
    pub username: Option<String>,
    /// Network password; a secret.
    pub password: Option<String>,
    pub password_flags: SecretFlags,
    /// Let ModemManager pick APN/username/password from its database.
    pub auto_config: bool,
}

impl GsmSetting {
    pub const NAME: &'static str = "gsm";

    const PROPERTIES: [&'static str; 6] = [
        "apn",
        "auto-config",
        "number",
        "password",
        "password-flags",
        "username",
    ];

    /// Explicit credentials make auto-config meaningless.
    pub fn auto_config_conflict(&self) -> bool {
        self.auto_config
            && (self.apn.is_some() || self.username.is_some() || self.password.is_some())
    }
}

impl SettingData for GsmSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Gsm
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if let Some(apn) = &self.apn {
            if apn.len() > 64
                || !apn
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || ".-_".contains(c))
            {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "apn",
                    format!("invalid APN: {}", apn),
                ));
            }
        }
        if self.auto_config_conflict() {
            return VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "auto-config",
                "ignored when explicit APN or credentials are set",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(number) = &self.number {
                wire::push(&mut dict, "number", wire::owned(number.as_str()));
            }
            if let Some(apn) = &self.apn {
                wire::push(&mut dict, "apn", wire::owned(apn.as_str()));
            }
            if let Some(username) = &self.username {
                wire::push(&mut dict, "username", wire::owned(username.as_str()));
            }
            if self.password_flags != SecretFlags::NONE {
                wire::push(&mut dict, "password-flags", wire::owned(self.password_flags.bits()));
            }
            if self.auto_config {
                wire::push(&mut dict, "auto-config", wire::owned(true));
            }
        }
        if options.includes_secrets() {
            if let Some(password) = &self.password {
                wire::push(&mut dict, "password", wire::owned(password.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.number = wire::opt_str(n, dict, "number")?;
        self.apn = wire::opt_str(n, dict, "apn")?;
        self.username = wire::opt_str(n, dict, "username")?;
        self.password = wire::opt_str(n, dict, "password")?;
        self.password_flags = wire::opt_u32(n, dict, "password-flags")?
            .map(SecretFlags::from_bits_truncate)
            .unwrap_or(SecretFlags::NONE);
        self.auto_config = wire::opt_bool(n, dict, "auto-config")?.unwrap_or(false);
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.password_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "password" && self.password.is_some()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        name == "password" && self.password.take().is_some()
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "password" {
            return Ok(false);
        }
        let password: String = value
            .downcast_ref::<String>()
            .map_err(|_| Error::invalid_property(Self::NAME, name, "secret must be a string"))?;
        let changed = self.password.as_deref() != Some(password.as_str());
        self.password = Some(password);
        Ok(changed)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CdmaSetting {
    pub number: Option<String>,
    pub username: Option<String>,
    /// Network password; a secret.
    pub password: Option<String>,
    pub password_flags: SecretFlags,
}

impl CdmaSetting {
    pub const NAME: &'static str = "cdma";

    const PROPERTIES: [&'static str; 4] = ["number", "password", "password-flags", "username"];
}

impl SettingData for CdmaSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Cdma
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(number) = &self.number {
                wire::push(&mut dict, "number", wire::owned(number.as_str()));
            }
            if let Some(username) = &self.username {
                wire::push(&mut dict, "username", wire::owned(username.as_str()));
            }
            if self.password_flags != SecretFlags::NONE {
                wire::push(&mut dict, "password-flags", wire::owned(self.password_flags.bits()));
            }
        }
        if options.includes_secrets() {
            if let Some(password) = &self.password {
                wire::push(&mut dict, "password", wire::owned(password.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.number = wire::opt_str(n, dict, "number")?;
        self.username = wire::opt_str(n, dict, "username")?;
        self.password = wire::opt_str(n, dict, "password")?;
        self.password_flags = wire::opt_u32(n, dict, "password-flags")?
            .map(SecretFlags::from_bits_truncate)
            .unwrap_or(SecretFlags::NONE);
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.password_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "password" && self.password.is_some()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        name == "password" && self.password.take().is_some()
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "password" {
            return Ok(false);
        }
        let password: String = value
            .downcast_ref::<String>()
            .map_err(|_| Error::invalid_property(Self::NAME, name, "secret must be a string"))?;
        let changed = self.password.as_deref() != Some(password.as_str());
        self.password = Some(password);
        Ok(changed)
    }
}

/// Bluetooth connection types.
pub const BT_TYPE_DUN: &str = "dun";
pub const BT_TYPE_PANU: &str = "panu";
pub const BT_TYPE_NAP: &str = "nap";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BluetoothSetting {
    pub bdaddr: Option<String>,
    pub bt_type: Option<String>,
}

impl BluetoothSetting {
    pub const NAME: &'static str = "bluetooth";

    const PROPERTIES: [&'static str; 2] = ["bdaddr", "type"];
}

impl SettingData for BluetoothSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Bluetooth
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, connection: &Connection) -> VerifyResult {
        match &self.bdaddr {
            None => {
                return VerifyResult::Failure(Error::missing_property(Self::NAME, "bdaddr"));
            }
            Some(addr) if !is_valid_bdaddr(addr) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "bdaddr",
                    format!("invalid device address: {}", addr),
                ));
            }
            Some(_) => {}
        }

        match self.bt_type.as_deref() {
            None => {
                return VerifyResult::Normalizable(Error::missing_property(Self::NAME, "type"));
            }
            Some(BT_TYPE_DUN) => {
                if !connection.has_setting(SettingKind::Gsm)
                    && !connection.has_setting(SettingKind::Cdma)
                {
                    return VerifyResult::Failure(Error::missing_setting(GsmSetting::NAME));
                }
            }
            Some(BT_TYPE_NAP) => {
                if !connection.has_setting(SettingKind::Bridge) {
                    return VerifyResult::Normalizable(Error::missing_setting("bridge"));
                }
            }
            Some(BT_TYPE_PANU) => {}
            Some(other) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "type",
                    format!("unknown type: {}", other),
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
        if let Some(bdaddr) = &self.bdaddr {
            wire::push(&mut dict, "bdaddr", wire::owned(bdaddr.as_str()));
        }
        if let Some(bt_type) = &self.bt_type {
            wire::push(&mut dict, "type", wire::owned(bt_type.as_str()));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.bdaddr = wire::opt_str(n, dict, "bdaddr")?;
        self.bt_type = wire::opt_str(n, dict, "type")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SerialSetting {
    pub baud: u32,
    pub bits: u32,
    pub parity: Option<String>,
    pub stopbits: u32,
}

impl Default for SerialSetting {
    fn default() -> Self {
        Self {
            baud: 57600,
            bits: 8,
            parity: None,
            stopbits: 1,
        }
    }
}

impl SerialSetting {
    pub const NAME: &'static str = "serial";

    const PROPERTIES: [&'static str; 4] = ["baud", "bits", "parity", "stopbits"];
}

impl SettingData for SerialSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Serial
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if !(5..=8).contains(&self.bits) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "bits",
                "out of range [5, 8]",
            ));
        }
        if let Some(parity) = &self.parity {
            if !["even", "none", "odd"].contains(&parity.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "parity",
                    format!("unknown parity: {}", parity),
                ));
            }
        }
        if !(1..=2).contains(&self.stopbits) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "stopbits",
                "out of range [1, 2]",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if self.baud != 57600 {
            wire::push(&mut dict, "baud", wire::owned(self.baud));
        }
        if self.bits != 8 {
            wire::push(&mut dict, "bits", wire::owned(self.bits));
        }
        if let Some(parity) = &self.parity {
            wire::push(&mut dict, "parity", wire::owned(parity.as_str()));
        }
        if self.stopbits != 1 {
            wire::push(&mut dict, "stopbits", wire::owned(self.stopbits));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.baud = wire::opt_u32(n, dict, "baud")?.unwrap_or(57600);
        self.bits = wire::opt_u32(n, dict, "bits")?.unwrap_or(8);
        self.parity = wire::opt_str(n, dict, "parity")?;
        self.stopbits = wire::opt_u32(n, dict, "stopbits")?.unwrap_or(1);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PppSetting {
    pub noauth: bool,
    pub mru: u32,
    pub mtu: u32,
    pub lcp_echo_interval: u32,
    pub lcp_echo_failure: u32,
}

impl Default for PppSetting {
    fn default() -> Self {
        Self {
            noauth: true,
            mru: 0,
            mtu: 0,
            lcp_echo_interval: 0,
            lcp_echo_failure: 0,
        }
    }
}

impl PppSetting {
    pub const NAME: &'static str = "ppp";

    const PROPERTIES: [&'static str; 5] = [
        "lcp-echo-failure",
        "lcp-echo-interval",
        "mru",
        "mtu",
        "noauth",
    ];
}

impl SettingData for PppSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Ppp
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if !self.noauth {
            wire::push(&mut dict, "noauth", wire::owned(false));
        }
        if self.mru != 0 {
            wire::push(&mut dict, "mru", wire::owned(self.mru));
        }
        if self.mtu != 0 {
            wire::push(&mut dict, "mtu", wire::owned(self.mtu));
        }
        if self.lcp_echo_interval != 0 {
            wire::push(&mut dict, "lcp-echo-interval", wire::owned(self.lcp_echo_interval));
        }
        if self.lcp_echo_failure != 0 {
            wire::push(&mut dict, "lcp-echo-failure", wire::owned(self.lcp_echo_failure));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.noauth = wire::opt_bool(n, dict, "noauth")?.unwrap_or(true);
        self.mru = wire::opt_u32(n, dict, "mru")?.unwrap_or(0);
        self.mtu = wire::opt_u32(n, dict, "mtu")?.unwrap_or(0);
        self.lcp_echo_interval = wire::opt_u32(n, dict, "lcp-echo-interval")?.unwrap_or(0);
        self.lcp_echo_failure = wire::opt_u32(n, dict, "lcp-echo-failure")?.unwrap_or(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::settings::Setting;

    #[test]
    fn test_gsm_auto_config_conflict() {
        let conn = Connection::new();
        let mut setting = GsmSetting::default();
        setting.auto_config = true;
        assert!(setting.verify(&conn).is_success());
        setting.apn = Some("internet".into());
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_gsm_apn_charset() {
        let conn = Connection::new();
        let mut setting = GsmSetting::default();
        setting.apn = Some("internet.example".into());
        assert!(setting.verify(&conn).is_success());
        setting.apn = Some("bad apn!".into());
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_bluetooth_dun_needs_modem_setting() {
        let mut conn = Connection::new();
        let setting = BluetoothSetting {
            bdaddr: Some("AA:BB:CC:DD:EE:FF".into()),
            bt_type: Some(BT_TYPE_DUN.into()),
        };
        assert!(setting.verify(&conn).is_failure());
        conn.add_setting(Setting::Gsm(GsmSetting::default()));
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_bluetooth_type_inference_pending() {
        let conn = Connection::new();
        let setting = BluetoothSetting {
            bdaddr: Some("AA:BB:CC:DD:EE:FF".into()),
            bt_type: None,
        };
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_serial_bounds() {
        let conn = Connection::new();
        let mut setting = SerialSetting::default();
        assert!(setting.verify(&conn).is_success());
        setting.bits = 4;
        assert!(setting.verify(&conn).is_failure());
    }
}
