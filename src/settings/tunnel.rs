// Network Manager - IP Tunnel Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `ip-tunnel` setting.

use std::net::IpAddr;

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

const MODES: [&str; 8] = [
    "gre", "gretap", "ip6gre", "ip6gretap", "ip6tnl", "ipip", "sit", "vti",
];

/// Tunnel modes carrying Ethernet frames; only these keep a wired setting.
pub const TAP_MODES: [&str; 2] = ["gretap", "ip6gretap"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IpTunnelSetting {
    pub mode: Option<String>,
    pub local: Option<String>,
    pub remote: Option<String>,
    pub parent: Option<String>,
    pub ttl: u32,
}

impl IpTunnelSetting {
    pub const NAME: &'static str = "ip-tunnel";

    const PROPERTIES: [&'static str; 5] = ["local", "mode", "parent", "remote", "ttl"];

    /// Whether the tunnel is an Ethernet (tap) tunnel.
    pub fn is_tap_mode(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| TAP_MODES.contains(&m))
    }
}

impl SettingData for IpTunnelSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::IpTunnel
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, connection: &Connection) -> VerifyResult {
        match self.mode.as_deref() {
            None => {
                return VerifyResult::Failure(Error::missing_property(Self::NAME, "mode"));
            }
            Some(mode) if !MODES.contains(&mode) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "mode",
                    format!("unknown tunnel mode: {}", mode),
                ));
            }
            Some(_) => {}
        }

        match &self.remote {
            None => {
                return VerifyResult::Failure(Error::missing_property(Self::NAME, "remote"));
            }
            Some(remote) if remote.parse::<IpAddr>().is_err() => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "remote",
                    format!("invalid address: {}", remote),
                ));
            }
            Some(_) => {}
        }

        if let Some(local) = &self.local {
            if local.parse::<IpAddr>().is_err() {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "local",
                    format!("invalid address: {}", local),
                ));
            }
        }

        if self.ttl > 255 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "ttl",
                "out of range [0, 255]",
            ));
        }

        // Layer-3 tunnels have no use for an Ethernet setting.
        if !self.is_tap_mode() && connection.has_setting(SettingKind::Wired) {
            return VerifyResult::Normalizable(Error::invalid_setting(
                "802-3-ethernet",
                "not allowed for layer-3 tunnel modes",
            ));
        }

        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if !options.includes_plain() {
            return dict;
        }
        if let Some(mode) = &self.mode {
            wire::push(&mut dict, "mode", wire::owned(mode.as_str()));
        }
        if let Some(local) = &self.local {
            wire::push(&mut dict, "local", wire::owned(local.as_str()));
        }
        if let Some(remote) = &self.remote {
            wire::push(&mut dict, "remote", wire::owned(remote.as_str()));
        }
        if let Some(parent) = &self.parent {
            wire::push(&mut dict, "parent", wire::owned(parent.as_str()));
        }
        if self.ttl != 0 {
            wire::push(&mut dict, "ttl", wire::owned(self.ttl));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.mode = wire::opt_str(n, dict, "mode")?;
        self.local = wire::opt_str(n, dict, "local")?;
        self.remote = wire::opt_str(n, dict, "remote")?;
        self.parent = wire::opt_str(n, dict, "parent")?;
        self.ttl = wire::opt_u32(n, dict, "ttl")?.unwrap_or(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::settings::Setting;
    use crate::settings::wired::WiredSetting;

    fn ipip() -> IpTunnelSetting {
        IpTunnelSetting {
            mode: Some("ipip".into()),
            remote: Some("192.0.2.1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_and_remote_required() {
        let conn = Connection::new();
        assert!(IpTunnelSetting::default().verify(&conn).is_failure());
        assert!(ipip().verify(&conn).is_success());
    }

    #[test]
    fn test_wired_setting_dropped_for_l3_modes() {
        let mut conn = Connection::new();
        conn.add_setting(Setting::Wired(WiredSetting::default()));
        let setting = ipip();
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        // gretap carries Ethernet, so the wired setting may stay.
        let mut tap = setting;
        tap.mode = Some("gretap".into());
        assert!(tap.verify(&conn).is_success());
    }
}
