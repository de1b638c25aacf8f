// Network Manager - Bond Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `bond` and `bond-port` settings.
//!
//! Bond configuration is a free-form option map mirroring the kernel
//! bonding module parameters; only the mode and per-mode option
//! compatibility are validated here.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

/// Kernel bonding modes, indexed by their numeric value.
pub const BOND_MODES: [&str; 7] = [
    "balance-rr",
    "active-backup",
    "balance-xor",
    "broadcast",
    "802.3ad",
    "balance-tlb",
    "balance-alb",
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BondSetting {
    /// Option map, kept sorted by key.
    pub options: Vec<(String, String)>,
}

impl BondSetting {
    pub const NAME: &'static str = "bond";

    const PROPERTIES: [&'static str; 1] = ["options"];

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_option(&mut self, key: &str, value: Option<&str>) {
        self.options.retain(|(k, _)| k != key);
        if let Some(value) = value {
            self.options.push((key.to_string(), value.to_string()));
            self.options.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
    }

    /// The mode, defaulting to balance-rr like the kernel.
    pub fn mode(&self) -> &str {
        self.option("mode").unwrap_or("balance-rr")
    }

    /// Canonical name for a mode given by name or numeric string.
    pub fn canonical_mode(mode: &str) -> Option<&'static str> {
        if let Ok(index) = mode.parse::<usize>() {
            return BOND_MODES.get(index).copied();
        }
        BOND_MODES.iter().find(|m| **m == mode).copied()
    }

    /// Options that make no sense under the given mode.
    pub fn incompatible_options(mode: &str) -> &'static [&'static str] {
        match mode {
            "active-backup" => &[],
            "802.3ad" | "balance-tlb" | "balance-alb" => {
                &["primary", "arp_interval", "arp_ip_target"]
            }
            _ => &["primary"],
        }
    }
}

impl SettingData for BondSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Bond
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        let mut result = VerifyResult::Success;

        if let Some(mode) = self.option("mode") {
            match Self::canonical_mode(mode) {
                None => {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        "options",
                        format!("invalid bond mode: {}", mode),
                    ));
                }
                Some(canonical) if canonical != mode => {
                    // Numeric modes are accepted and rewritten.
                    result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                        Self::NAME,
                        "options",
                        format!("bond mode '{}' should be '{}'", mode, canonical),
                    )));
                }
                Some(_) => {}
            }
        }

        let mode = Self::canonical_mode(self.mode()).unwrap_or("balance-rr");
        for option in Self::incompatible_options(mode) {
            if self.option(option).is_some() {
                result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                    Self::NAME,
                    "options",
                    format!("option '{}' not compatible with mode {}", option, mode),
                )));
            }
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() && !self.options.is_empty() {
            wire::push(&mut dict, "options", wire::string_map_value(&self.options));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.options = wire::opt_string_map(Self::NAME, dict, "options")?.unwrap_or_default();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BondPortSetting {
    pub queue_id: u32,
    pub prio: i32,
}

impl BondPortSetting {
    pub const NAME: &'static str = "bond-port";

    const PROPERTIES: [&'static str; 2] = ["prio", "queue-id"];
}

impl SettingData for BondPortSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::BondPort
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if self.queue_id != 0 {
            wire::push(&mut dict, "queue-id", wire::owned(self.queue_id));
        }
        if self.prio != 0 {
            wire::push(&mut dict, "prio", wire::owned(self.prio));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.queue_id = wire::opt_u32(n, dict, "queue-id")?.unwrap_or(0);
        self.prio = wire::opt_i32(n, dict, "prio")?.unwrap_or(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_canonical_mode() {
        assert_eq!(BondSetting::canonical_mode("1"), Some("active-backup"));
        assert_eq!(BondSetting::canonical_mode("802.3ad"), Some("802.3ad"));
        assert_eq!(BondSetting::canonical_mode("7"), None);
        assert_eq!(BondSetting::canonical_mode("round-robin"), None);
    }

    #[test]
    fn test_numeric_mode_is_normalizable() {
        let conn = Connection::new();
        let mut setting = BondSetting::default();
        setting.set_option("mode", Some("1"));
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.set_option("mode", Some("nonsense"));
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_incompatible_options_flagged() {
        let conn = Connection::new();
        let mut setting = BondSetting::default();
        setting.set_option("mode", Some("balance-rr"));
        setting.set_option("primary", Some("eth0"));
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.set_option("mode", Some("active-backup"));
        assert!(setting.verify(&conn).is_success());
    }
}
