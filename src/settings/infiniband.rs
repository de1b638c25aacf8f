// Network Manager - InfiniBand Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `infiniband` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::is_valid_ifname;
use crate::wire::{self, PropertyDict};

use super::SettingData;

/// Largest MTU for datagram transport mode.
pub const MTU_DATAGRAM_MAX: u32 = 2044;
/// Largest MTU for connected transport mode.
pub const MTU_CONNECTED_MAX: u32 = 65520;

#[derive(Debug, Clone, PartialEq)]
pub struct InfinibandSetting {
    /// `datagram` or `connected`.
    pub transport_mode: Option<String>,
    pub mtu: u32,
    /// Partition key; -1 means none.
    pub p_key: i32,
    pub parent: Option<String>,
}

impl Default for InfinibandSetting {
    fn default() -> Self {
        Self {
            transport_mode: None,
            mtu: 0,
            p_key: -1,
            parent: None,
        }
    }
}

impl InfinibandSetting {
    pub const NAME: &'static str = "infiniband";

    const PROPERTIES: [&'static str; 4] = ["mtu", "p-key", "parent", "transport-mode"];

    /// MTU ceiling for the configured transport mode.
    pub fn mtu_max(&self) -> u32 {
        if self.transport_mode.as_deref() == Some("connected") {
            MTU_CONNECTED_MAX
        } else {
            MTU_DATAGRAM_MAX
        }
    }

    /// The interface name implied by parent + partition key.
    pub fn virtual_interface_name(&self) -> Option<String> {
        let parent = self.parent.as_deref()?;
        if self.p_key < 0 {
            return None;
        }
        Some(format!("{}.{:04x}", parent, self.p_key))
    }
}

impl SettingData for InfinibandSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Infiniband
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, connection: &Connection) -> VerifyResult {
        let mut result = VerifyResult::Success;

        match self.transport_mode.as_deref() {
            None => {
                return VerifyResult::Failure(Error::missing_property(
                    Self::NAME,
                    "transport-mode",
                ));
            }
            Some("datagram") | Some("connected") => {}
            Some(other) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "transport-mode",
                    format!("unknown transport mode: {}", other),
                ));
            }
        }

        if !(-1..=0xFFFF).contains(&self.p_key) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "p-key",
                "out of range [-1, 0xffff]",
            ));
        }
        if self.p_key >= 0 && self.parent.is_none() {
            return VerifyResult::Failure(Error::missing_property(Self::NAME, "parent"));
        }
        if let Some(parent) = &self.parent {
            if !is_valid_ifname(parent) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "parent",
                    format!("not a valid interface name: {}", parent),
                ));
            }
        }

        if self.mtu > self.mtu_max() {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "mtu",
                format!("above {} for this transport mode", self.mtu_max()),
            )));
        }

        if let Some(virtual_name) = self.virtual_interface_name() {
            let mismatch = connection
                .setting_connection()
                .and_then(|s| s.interface_name.as_deref())
                .is_some_and(|name| name != virtual_name);
            if mismatch {
                result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                    Self::NAME,
                    "parent",
                    format!("interface name must be {}", virtual_name),
                )));
            }
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(mode) = &self.transport_mode {
            wire::push(&mut dict, "transport-mode", wire::owned(mode.as_str()));
        }
        if self.mtu != 0 {
            wire::push(&mut dict, "mtu", wire::owned(self.mtu));
        }
        if self.p_key != -1 {
            wire::push(&mut dict, "p-key", wire::owned(self.p_key));
        }
        if let Some(parent) = &self.parent {
            wire::push(&mut dict, "parent", wire::owned(parent.as_str()));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.transport_mode = wire::opt_str(n, dict, "transport-mode")?;
        self.mtu = wire::opt_u32(n, dict, "mtu")?.unwrap_or(0);
        self.p_key = wire::opt_i32(n, dict, "p-key")?.unwrap_or(-1);
        self.parent = wire::opt_str(n, dict, "parent")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    fn datagram() -> InfinibandSetting {
        InfinibandSetting {
            transport_mode: Some("datagram".into()),
            p_key: -1,
            ..Default::default()
        }
    }

    #[test]
    fn test_transport_mode_required() {
        let conn = Connection::new();
        let mut setting = InfinibandSetting::default();
        assert!(setting.verify(&conn).is_failure());
        setting.transport_mode = Some("datagram".into());
        assert!(setting.verify(&conn).is_success());
        setting.transport_mode = Some("warp".into());
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_mtu_clamp_is_normalizable() {
        let conn = Connection::new();
        let mut setting = datagram();
        setting.mtu = 9000;
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.transport_mode = Some("connected".into());
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_pkey_requires_parent() {
        let conn = Connection::new();
        let mut setting = datagram();
        setting.p_key = 0x8001;
        assert!(setting.verify(&conn).is_failure());
        setting.parent = Some("ib0".into());
        assert!(setting.verify(&conn).is_success());
        assert_eq!(setting.virtual_interface_name().as_deref(), Some("ib0.8001"));
    }
}
