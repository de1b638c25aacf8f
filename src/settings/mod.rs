// Network Manager - Setting Variants
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The polymorphic setting layer.
//!
//! Every network technology and cross-cutting concern gets one concrete
//! setting struct implementing the [`SettingData`] capability trait;
//! the closed [`Setting`] enum ties them together for storage inside a
//! connection. Settings are pure data: no I/O, no back-reference to the
//! owning connection (cross-setting checks receive it read-only).

pub mod bond;
pub mod bridge;
pub mod connection;
pub mod infiniband;
pub mod ip_config;
pub mod macsec;
pub mod mobile;
pub mod ovs;
pub mod security;
pub mod simple;
pub mod sriov;
pub mod team;
pub mod tunnel;
pub mod user;
pub mod vlan;
pub mod vpn;
pub mod wired;
pub mod wireguard;
pub mod wireless;

pub use bond::{BondPortSetting, BondSetting};
pub use bridge::{BridgePortSetting, BridgeSetting, BridgeVlan};
pub use connection::ConnectionSetting;
pub use infiniband::InfinibandSetting;
pub use ip_config::{IpConfigSetting, ProxySetting};
pub use macsec::MacsecSetting;
pub use mobile::{BluetoothSetting, CdmaSetting, GsmSetting, PppSetting, SerialSetting};
pub use ovs::{OvsBridgeSetting, OvsInterfaceSetting, OvsPortSetting};
pub use security::{Ieee8021xSetting, WirelessSecuritySetting};
pub use simple::{
    DummySetting, GenericSetting, LoopbackSetting, SixlowpanSetting, TunSetting, VethSetting,
    VrfSetting, WpanSetting,
};
pub use sriov::{SriovSetting, SriovVf};
pub use team::{TeamPortSetting, TeamSetting};
pub use tunnel::IpTunnelSetting;
pub use user::UserSetting;
pub use vlan::VlanSetting;
pub use vpn::VpnSetting;
pub use wired::WiredSetting;
pub use wireguard::{WireguardPeer, WireguardSetting};
pub use wireless::WirelessSetting;

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{CompareFlags, DiffKind, ParseFlags, SecretFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict, WireValue};

/// Capability set implemented by every concrete setting.
///
/// All methods are pure data transforms; cross-setting checks read the
/// sibling settings through the `&Connection` argument only.
pub trait SettingData {
    fn kind(&self) -> SettingKind;

    /// Property names accepted on the wire, used for strict decoding.
    fn known_properties(&self) -> &'static [&'static str];

    /// Verify this setting, with read-only access to its siblings.
    fn verify(&self, _connection: &Connection) -> VerifyResult {
        VerifyResult::Success
    }

    /// Serialize to a wire property dict. Defaulted properties are
    /// omitted so the encoding is canonical.
    fn to_wire(&self, options: ToWireOptions) -> PropertyDict;

    /// Replace this setting's properties from a wire dict.
    fn update_from_wire(&mut self, dict: &PropertyDict, flags: ParseFlags) -> Result<()>;

    // ========================================
    // Secrets
    // ========================================

    /// Names of secret-valued properties.
    fn secret_properties(&self) -> &'static [&'static str] {
        &[]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        SecretFlags::NONE
    }

    fn has_secret(&self, _name: &str) -> bool {
        false
    }

    /// Clear one secret; returns whether anything was cleared.
    fn clear_secret(&mut self, _name: &str) -> bool {
        false
    }

    /// Set one secret from a wire value; returns whether it changed.
    /// Non-secret names are ignored.
    fn set_secret(&mut self, _name: &str, _value: &WireValue) -> Result<bool> {
        Ok(false)
    }

    /// Secrets that must be requested before activation. With
    /// `check_rerequest`, never-saved secrets are reported even when a
    /// value is currently present.
    fn need_secrets(&self, _check_rerequest: bool) -> Vec<&'static str> {
        Vec::new()
    }
}

/// One setting of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Connection(ConnectionSetting),
    Wired(WiredSetting),
    Wireless(WirelessSetting),
    WirelessSecurity(WirelessSecuritySetting),
    Ieee8021x(Ieee8021xSetting),
    Ipv4(IpConfigSetting),
    Ipv6(IpConfigSetting),
    Proxy(ProxySetting),
    Bond(BondSetting),
    BondPort(BondPortSetting),
    Bridge(BridgeSetting),
    BridgePort(BridgePortSetting),
    Team(TeamSetting),
    TeamPort(TeamPortSetting),
    Vlan(VlanSetting),
    Infiniband(InfinibandSetting),
    Gsm(GsmSetting),
    Cdma(CdmaSetting),
    Bluetooth(BluetoothSetting),
    OvsBridge(OvsBridgeSetting),
    OvsPort(OvsPortSetting),
    OvsInterface(OvsInterfaceSetting),
    IpTunnel(IpTunnelSetting),
    Macsec(MacsecSetting),
    Sriov(SriovSetting),
    Wireguard(WireguardSetting),
    Dummy(DummySetting),
    Vrf(VrfSetting),
    Wpan(WpanSetting),
    Sixlowpan(SixlowpanSetting),
    Tun(TunSetting),
    Veth(VethSetting),
    Loopback(LoopbackSetting),
    Generic(GenericSetting),
    Vpn(VpnSetting),
    Serial(SerialSetting),
    Ppp(PppSetting),
    User(UserSetting),
}

impl Setting {
    /// Shared view of the capability trait.
    pub fn data(&self) -> &dyn SettingData {
        match self {
            Self::Connection(s) => s,
            Self::Wired(s) => s,
            Self::Wireless(s) => s,
            Self::WirelessSecurity(s) => s,
            Self::Ieee8021x(s) => s,
            Self::Ipv4(s) => s,
            Self::Ipv6(s) => s,
            Self::Proxy(s) => s,
            Self::Bond(s) => s,
            Self::BondPort(s) => s,
            Self::Bridge(s) => s,
            Self::BridgePort(s) => s,
            Self::Team(s) => s,
            Self::TeamPort(s) => s,
            Self::Vlan(s) => s,
            Self::Infiniband(s) => s,
            Self::Gsm(s) => s,
            Self::Cdma(s) => s,
            Self::Bluetooth(s) => s,
            Self::OvsBridge(s) => s,
            Self::OvsPort(s) => s,
            Self::OvsInterface(s) => s,
            Self::IpTunnel(s) => s,
            Self::Macsec(s) => s,
            Self::Sriov(s) => s,
            Self::Wireguard(s) => s,
            Self::Dummy(s) => s,
            Self::Vrf(s) => s,
            Self::Wpan(s) => s,
            Self::Sixlowpan(s) => s,
            Self::Tun(s) => s,
            Self::Veth(s) => s,
            Self::Loopback(s) => s,
            Self::Generic(s) => s,
            Self::Vpn(s) => s,
            Self::Serial(s) => s,
            Self::Ppp(s) => s,
            Self::User(s) => s,
        }
    }

    /// Mutable view of the capability trait.
    pub fn data_mut(&mut self) -> &mut dyn SettingData {
        match self {
            Self::Connection(s) => s,
            Self::Wired(s) => s,
            Self::Wireless(s) => s,
            Self::WirelessSecurity(s) => s,
            Self::Ieee8021x(s) => s,
            Self::Ipv4(s) => s,
            Self::Ipv6(s) => s,
            Self::Proxy(s) => s,
            Self::Bond(s) => s,
            Self::BondPort(s) => s,
            Self::Bridge(s) => s,
            Self::BridgePort(s) => s,
            Self::Team(s) => s,
            Self::TeamPort(s) => s,
            Self::Vlan(s) => s,
            Self::Infiniband(s) => s,
            Self::Gsm(s) => s,
            Self::Cdma(s) => s,
            Self::Bluetooth(s) => s,
            Self::OvsBridge(s) => s,
            Self::OvsPort(s) => s,
            Self::OvsInterface(s) => s,
            Self::IpTunnel(s) => s,
            Self::Macsec(s) => s,
            Self::Sriov(s) => s,
            Self::Wireguard(s) => s,
            Self::Dummy(s) => s,
            Self::Vrf(s) => s,
            Self::Wpan(s) => s,
            Self::Sixlowpan(s) => s,
            Self::Tun(s) => s,
            Self::Veth(s) => s,
            Self::Loopback(s) => s,
            Self::Generic(s) => s,
            Self::Vpn(s) => s,
            Self::Serial(s) => s,
            Self::Ppp(s) => s,
            Self::User(s) => s,
        }
    }

    pub fn kind(&self) -> SettingKind {
        self.data().kind()
    }

    /// Wire name of the setting.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn verify(&self, connection: &Connection) -> VerifyResult {
        self.data().verify(connection)
    }

    pub fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        self.data().to_wire(options)
    }

    /// Decode wire properties into this setting.
    ///
    /// Under strict parsing duplicate and unknown property names are
    /// rejected before the per-property decode runs.
    pub fn update_from_wire(&mut self, dict: &PropertyDict, flags: ParseFlags) -> Result<()> {
        if flags.contains(ParseFlags::STRICT) {
            if let Some(key) = wire::duplicate_key(dict) {
                return Err(Error::invalid_property(
                    self.name(),
                    key,
                    "duplicate property",
                ));
            }
            if let Some(key) = wire::unknown_key(dict, self.data().known_properties()) {
                return Err(Error::invalid_property(self.name(), key, "unknown property"));
            }
        }
        self.data_mut().update_from_wire(dict, flags)
    }

    /// Per-property difference against another setting of the same kind.
    ///
    /// Differences are computed over the wire encodings, so the result
    /// names wire properties and honors the canonical skip-defaults
    /// encoding.
    pub fn diff(&self, other: &Setting, flags: CompareFlags) -> Vec<(String, DiffKind)> {
        debug_assert_eq!(self.kind(), other.kind(), "diff across setting kinds");

        let options = if flags.contains(CompareFlags::IGNORE_SECRETS) {
            ToWireOptions::NoSecrets
        } else {
            ToWireOptions::All
        };
        let mut dict_a = self.to_wire(options);
        let mut dict_b = other.to_wire(options);

        if self.kind() == SettingKind::Connection {
            let skip = |dict: &mut PropertyDict| {
                dict.retain(|(key, _)| {
                    !(flags.contains(CompareFlags::IGNORE_ID) && key == "id"
                        || flags.contains(CompareFlags::IGNORE_TIMESTAMP) && key == "timestamp")
                });
            };
            skip(&mut dict_a);
            skip(&mut dict_b);
        }

        let mut keys: Vec<&String> = dict_a.iter().chain(dict_b.iter()).map(|(k, _)| k).collect();
        keys.sort();
        keys.dedup();

        let mut out = Vec::new();
        for key in keys {
            let value_a = wire::lookup(&dict_a, key);
            let value_b = wire::lookup(&dict_b, key);
            let equal = match (value_a, value_b) {
                (None, None) => true,
                (Some(a), Some(b)) => wire::values_equal(a, b),
                _ => false,
            };
            if equal {
                continue;
            }
            let mut diff = DiffKind::empty();
            if value_a.is_some() {
                diff |= DiffKind::IN_A;
            }
            if value_b.is_some() {
                diff |= DiffKind::IN_B;
            }
            out.push((key.clone(), diff));
        }
        out
    }

    /// Structural equality under the given comparison flags.
    pub fn compare(&self, other: &Setting, flags: CompareFlags) -> bool {
        self.kind() == other.kind() && self.diff(other, flags).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_names_the_property() {
        let mut a = IpConfigSetting::with_method(crate::ip::Family::V4, "auto");
        let b = a.clone();
        a.dns = vec!["1.1.1.1".into()];
        let a = Setting::Ipv4(a);
        let b = Setting::Ipv4(b);
        let diff = a.diff(&b, CompareFlags::EXACT);
        assert_eq!(diff, vec![("dns".to_string(), DiffKind::IN_A)]);
        assert!(!a.compare(&b, CompareFlags::EXACT));
    }

    #[test]
    fn test_diff_both_sides() {
        let mut a = ConnectionSetting::default();
        a.id = Some("one".into());
        let mut b = ConnectionSetting::default();
        b.id = Some("two".into());
        let diff = Setting::Connection(a).diff(&Setting::Connection(b), CompareFlags::EXACT);
        assert_eq!(diff, vec![("id".to_string(), DiffKind::IN_A | DiffKind::IN_B)]);
    }

    #[test]
    fn test_compare_ignore_flags() {
        let mut a = ConnectionSetting::default();
        a.id = Some("one".into());
        a.timestamp = 100;
        let mut b = a.clone();
        b.id = Some("two".into());
        b.timestamp = 200;
        let a = Setting::Connection(a);
        let b = Setting::Connection(b);
        assert!(!a.compare(&b, CompareFlags::EXACT));
        assert!(a.compare(&b, CompareFlags::IGNORE_ID | CompareFlags::IGNORE_TIMESTAMP));
    }

    #[test]
    fn test_strict_rejects_unknown_property() {
        let mut setting = Setting::Proxy(ProxySetting::default());
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "bogus", wire::owned(1u32));
        assert!(setting
            .update_from_wire(&dict, ParseFlags::STRICT)
            .is_err());
        assert!(setting.update_from_wire(&dict, ParseFlags::empty()).is_ok());
    }

    #[test]
    fn test_compare_ignore_secrets() {
        let mut a = WirelessSecuritySetting::default();
        a.key_mgmt = Some("wpa-psk".into());
        let mut b = a.clone();
        b.psk = Some("hunter22".into());
        let a = Setting::WirelessSecurity(a);
        let b = Setting::WirelessSecurity(b);
        assert!(!a.compare(&b, CompareFlags::EXACT));
        assert!(a.compare(&b, CompareFlags::IGNORE_SECRETS));
    }
}
