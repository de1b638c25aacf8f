// Network Manager - SR-IOV Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `sriov` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::normalize_mac_address;
use crate::wire::{self, PropertyDict};

use super::SettingData;

/// One virtual function configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SriovVf {
    pub index: u32,
    pub mac: Option<String>,
    pub spoof_check: Option<bool>,
    pub trust: Option<bool>,
}

impl SriovVf {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            mac: None,
            spoof_check: None,
            trust: None,
        }
    }

    fn to_wire(&self) -> PropertyDict {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "index", wire::owned(self.index));
        if let Some(mac) = &self.mac {
            wire::push(&mut dict, "mac", wire::owned(mac.as_str()));
        }
        if let Some(spoof_check) = self.spoof_check {
            wire::push(&mut dict, "spoof-check", wire::owned(spoof_check));
        }
        if let Some(trust) = self.trust {
            wire::push(&mut dict, "trust", wire::owned(trust));
        }
        dict
    }

    fn from_wire(setting: &str, dict: &PropertyDict) -> Result<Self> {
        Ok(Self {
            index: wire::opt_u32(setting, dict, "index")?
                .ok_or_else(|| Error::missing_property(setting, "vfs"))?,
            mac: wire::opt_str(setting, dict, "mac")?,
            spoof_check: wire::opt_bool(setting, dict, "spoof-check")?,
            trust: wire::opt_bool(setting, dict, "trust")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SriovSetting {
    pub total_vfs: u32,
    /// Per-VF overrides, kept sorted by index.
    pub vfs: Vec<SriovVf>,
}

impl SriovSetting {
    pub const NAME: &'static str = "sriov";

    const PROPERTIES: [&'static str; 2] = ["total-vfs", "vfs"];

    pub fn vfs_sorted(&self) -> bool {
        self.vfs.windows(2).all(|w| w[0].index <= w[1].index)
    }
}

impl SettingData for SriovSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Sriov
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        for (i, vf) in self.vfs.iter().enumerate() {
            if self.vfs[..i].iter().any(|other| other.index == vf.index) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "vfs",
                    format!("duplicate VF index {}", vf.index),
                ));
            }
            if let Some(mac) = &vf.mac {
                if normalize_mac_address(mac).is_none() {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        "vfs",
                        format!("invalid MAC address: {}", mac),
                    ));
                }
            }
        }
        if !self.vfs_sorted() {
            return VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "vfs",
                "VF list not sorted",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if self.total_vfs != 0 {
            wire::push(&mut dict, "total-vfs", wire::owned(self.total_vfs));
        }
        if !self.vfs.is_empty() {
            let data: Vec<PropertyDict> = self.vfs.iter().map(SriovVf::to_wire).collect();
            wire::push(&mut dict, "vfs", wire::dict_array_value(&data));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.total_vfs = wire::opt_u32(n, dict, "total-vfs")?.unwrap_or(0);
        self.vfs = match wire::opt_dict_array(n, dict, "vfs")? {
            None => Vec::new(),
            Some(dicts) => dicts
                .iter()
                .map(|d| SriovVf::from_wire(n, d))
                .collect::<Result<_>>()?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_duplicate_vf_index_rejected() {
        let conn = Connection::new();
        let mut setting = SriovSetting::default();
        setting.vfs = vec![SriovVf::new(1), SriovVf::new(1)];
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_unsorted_vfs_normalizable() {
        let conn = Connection::new();
        let mut setting = SriovSetting::default();
        setting.vfs = vec![SriovVf::new(3), SriovVf::new(1)];
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.vfs.sort_by_key(|vf| vf.index);
        assert!(setting.verify(&conn).is_success());
    }
}
