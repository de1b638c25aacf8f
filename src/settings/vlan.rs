// Network Manager - VLAN Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `vlan` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VlanSetting {
    /// Parent device or connection uuid.
    pub parent: Option<String>,
    pub id: u32,
    pub flags: u32,
}

impl VlanSetting {
    pub const NAME: &'static str = "vlan";

    const PROPERTIES: [&'static str; 3] = ["flags", "id", "parent"];
}

impl SettingData for VlanSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Vlan
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, connection: &Connection) -> VerifyResult {
        if self.id > 4094 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "id",
                "out of range [0, 4094]",
            ));
        }
        // Without a parent the interface itself must pin the device.
        if self.parent.is_none() {
            let has_ifname = connection
                .setting_connection()
                .is_some_and(|s| s.interface_name.is_some());
            if !has_ifname {
                return VerifyResult::Failure(Error::missing_property(Self::NAME, "parent"));
            }
        }
        if self.flags > 0xF {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "flags",
                "unknown flag bits",
            ));
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(parent) = &self.parent {
            wire::push(&mut dict, "parent", wire::owned(parent.as_str()));
        }
        if self.id != 0 {
            wire::push(&mut dict, "id", wire::owned(self.id));
        }
        if self.flags != 0 {
            wire::push(&mut dict, "flags", wire::owned(self.flags));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.parent = wire::opt_str(n, dict, "parent")?;
        self.id = wire::opt_u32(n, dict, "id")?.unwrap_or(0);
        self.flags = wire::opt_u32(n, dict, "flags")?.unwrap_or(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_vlan_id_range() {
        let conn = Connection::new();
        let mut setting = VlanSetting::default();
        setting.parent = Some("eth0".into());
        setting.id = 100;
        assert!(setting.verify(&conn).is_success());
        setting.id = 4095;
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_parent_required_without_ifname() {
        let conn = Connection::new();
        let setting = VlanSetting {
            id: 7,
            ..Default::default()
        };
        assert!(setting.verify(&conn).is_failure());
    }
}
