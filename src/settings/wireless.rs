// Network Manager - Wireless Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `802-11-wireless` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::normalize_mac_address;
use crate::wire::{self, PropertyDict};

use super::SettingData;

const MODES: [&str; 4] = ["adhoc", "ap", "infrastructure", "mesh"];
const BANDS: [&str; 2] = ["a", "bg"];

/// `mac-address-randomization` values.
pub const MAC_RANDOMIZATION_DEFAULT: u32 = 0;
pub const MAC_RANDOMIZATION_NEVER: u32 = 1;
pub const MAC_RANDOMIZATION_ALWAYS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WirelessSetting {
    /// Raw SSID bytes, 1..=32 octets.
    pub ssid: Vec<u8>,
    pub mode: Option<String>,
    pub band: Option<String>,
    pub channel: u32,
    pub bssid: Option<String>,
    /// Legacy bitrate cap in kbit/s; nonzero values are reset.
    pub rate: u32,
    /// Legacy transmit power; nonzero values are reset.
    pub tx_power: u32,
    pub mac_address: Option<String>,
    pub cloned_mac_address: Option<String>,
    pub mac_address_randomization: u32,
    pub hidden: bool,
    pub mtu: u32,
    pub powersave: u32,
}

impl WirelessSetting {
    pub const NAME: &'static str = "802-11-wireless";

    const PROPERTIES: [&'static str; 13] = [
        "band",
        "bssid",
        "channel",
        "cloned-mac-address",
        "hidden",
        "mac-address",
        "mac-address-randomization",
        "mode",
        "mtu",
        "powersave",
        "rate",
        "ssid",
        "tx-power",
    ];
}

impl SettingData for WirelessSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Wireless
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        let mut result = VerifyResult::Success;

        if self.ssid.is_empty() {
            return VerifyResult::Failure(Error::missing_property(Self::NAME, "ssid"));
        }
        if self.ssid.len() > 32 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "ssid",
                "longer than 32 octets",
            ));
        }

        if let Some(mode) = &self.mode {
            if !MODES.contains(&mode.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "mode",
                    format!("unknown mode: {}", mode),
                ));
            }
        }

        if let Some(band) = &self.band {
            if !BANDS.contains(&band.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "band",
                    format!("unknown band: {}", band),
                ));
            }
        }
        if self.channel != 0 && self.band.is_none() {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "channel",
                "requires the band property",
            ));
        }

        if let Some(bssid) = &self.bssid {
            if normalize_mac_address(bssid).is_none() {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "bssid",
                    format!("invalid BSSID: {}", bssid),
                ));
            }
        }
        if let Some(mac) = &self.mac_address {
            if normalize_mac_address(mac).is_none() {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "mac-address",
                    format!("invalid MAC address: {}", mac),
                ));
            }
        }

        if self.mac_address_randomization > MAC_RANDOMIZATION_ALWAYS {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "mac-address-randomization",
                "unknown value",
            ));
        }

        // Legacy knobs no backend honors anymore.
        if self.rate != 0 || self.tx_power != 0 {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "rate",
                "legacy rate/tx-power must be zero",
            )));
        }

        let cloned_random = self.cloned_mac_address.as_deref() == Some("random");
        if cloned_random != (self.mac_address_randomization == MAC_RANDOMIZATION_ALWAYS) {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "mac-address-randomization",
                "inconsistent with cloned-mac-address",
            )));
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if !self.ssid.is_empty() {
            wire::push(&mut dict, "ssid", wire::owned(self.ssid.clone()));
        }
        if let Some(mode) = &self.mode {
            wire::push(&mut dict, "mode", wire::owned(mode.as_str()));
        }
        if let Some(band) = &self.band {
            wire::push(&mut dict, "band", wire::owned(band.as_str()));
        }
        if self.channel != 0 {
            wire::push(&mut dict, "channel", wire::owned(self.channel));
        }
        if let Some(bssid) = &self.bssid {
            wire::push(&mut dict, "bssid", wire::owned(bssid.as_str()));
        }
        if self.rate != 0 {
            wire::push(&mut dict, "rate", wire::owned(self.rate));
        }
        if self.tx_power != 0 {
            wire::push(&mut dict, "tx-power", wire::owned(self.tx_power));
        }
        if let Some(mac) = &self.mac_address {
            wire::push(&mut dict, "mac-address", wire::owned(mac.as_str()));
        }
        if let Some(mac) = &self.cloned_mac_address {
            wire::push(&mut dict, "cloned-mac-address", wire::owned(mac.as_str()));
        }
        if self.mac_address_randomization != MAC_RANDOMIZATION_DEFAULT {
            wire::push(
                &mut dict,
                "mac-address-randomization",
                wire::owned(self.mac_address_randomization),
            );
        }
        if self.hidden {
            wire::push(&mut dict, "hidden", wire::owned(true));
        }
        if self.mtu != 0 {
            wire::push(&mut dict, "mtu", wire::owned(self.mtu));
        }
        if self.powersave != 0 {
            wire::push(&mut dict, "powersave", wire::owned(self.powersave));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.ssid = wire::opt_bytes(n, dict, "ssid")?.unwrap_or_default();
        self.mode = wire::opt_str(n, dict, "mode")?;
        self.band = wire::opt_str(n, dict, "band")?;
        self.channel = wire::opt_u32(n, dict, "channel")?.unwrap_or(0);
        self.bssid = wire::opt_str(n, dict, "bssid")?;
        self.rate = wire::opt_u32(n, dict, "rate")?.unwrap_or(0);
        self.tx_power = wire::opt_u32(n, dict, "tx-power")?.unwrap_or(0);
        self.mac_address = wire::opt_str(n, dict, "mac-address")?;
        self.cloned_mac_address = wire::opt_str(n, dict, "cloned-mac-address")?;
        self.mac_address_randomization =
            wire::opt_u32(n, dict, "mac-address-randomization")?.unwrap_or(0);
        self.hidden = wire::opt_bool(n, dict, "hidden")?.unwrap_or(false);
        self.mtu = wire::opt_u32(n, dict, "mtu")?.unwrap_or(0);
        self.powersave = wire::opt_u32(n, dict, "powersave")?.unwrap_or(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    fn with_ssid() -> WirelessSetting {
        WirelessSetting {
            ssid: b"corp-net".to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ssid_required() {
        let conn = Connection::new();
        let setting = WirelessSetting::default();
        assert!(setting.verify(&conn).is_failure());
        assert!(with_ssid().verify(&conn).is_success());
    }

    #[test]
    fn test_channel_requires_band() {
        let conn = Connection::new();
        let mut setting = with_ssid();
        setting.channel = 11;
        assert!(setting.verify(&conn).is_failure());
        setting.band = Some("bg".into());
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_legacy_rate_is_normalizable() {
        let conn = Connection::new();
        let mut setting = with_ssid();
        setting.rate = 54000;
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_randomization_consistency() {
        let conn = Connection::new();
        let mut setting = with_ssid();
        setting.mac_address_randomization = MAC_RANDOMIZATION_ALWAYS;
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.cloned_mac_address = Some("random".into());
        assert!(setting.verify(&conn).is_success());
    }
}
