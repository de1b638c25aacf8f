// Network Manager - Setting Registry
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Static registry of setting kinds.
//!
//! Every supported setting kind gets a dense discriminant (used to index
//! the connection's fixed-size slot array), a wire name, a priority, and
//! a constructor. Lookups by name are binary searches over a name-sorted
//! table; the priority traversal order drives verification and the
//! secrets lifecycle.

use once_cell::sync::Lazy;

use crate::ip::Family;
use crate::settings::{self, Setting};

/// Verification/iteration priority of a setting kind.
///
/// Lower values come first; ties break on the wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingPriority {
    /// The `connection` setting itself.
    Connection = 1,
    /// Base hardware/technology settings; their names double as
    /// connection types.
    HwBase = 2,
    /// Hardware settings that never name a connection type.
    HwNonBase = 3,
    /// Hardware-adjacent auxiliaries.
    HwAux = 4,
    /// Technology-independent auxiliaries.
    Aux = 5,
    /// Address-family configuration.
    Ip = 6,
    /// Free-form user annotations.
    User = 10,
}

/// Dense discriminant enumerating every supported setting kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum SettingKind {
    Connection = 0,
    Wired,
    Wireless,
    WirelessSecurity,
    Ieee8021x,
    Ipv4,
    Ipv6,
    Proxy,
    Bond,
    BondPort,
    Bridge,
    BridgePort,
    Team,
    TeamPort,
    Vlan,
    Infiniband,
    Gsm,
    Cdma,
    Bluetooth,
    OvsBridge,
    OvsPort,
    OvsInterface,
    IpTunnel,
    Macsec,
    Sriov,
    Wireguard,
    Dummy,
    Vrf,
    Wpan,
    Sixlowpan,
    Tun,
    Veth,
    Loopback,
    Generic,
    Vpn,
    Serial,
    Ppp,
    User,
}

/// Number of setting kinds; sizes the connection's slot array.
pub const KIND_COUNT: usize = 38;

impl SettingKind {
    pub const ALL: [SettingKind; KIND_COUNT] = [
        Self::Connection,
        Self::Wired,
        Self::Wireless,
        Self::WirelessSecurity,
        Self::Ieee8021x,
        Self::Ipv4,
        Self::Ipv6,
        Self::Proxy,
        Self::Bond,
        Self::BondPort,
        Self::Bridge,
        Self::BridgePort,
        Self::Team,
        Self::TeamPort,
        Self::Vlan,
        Self::Infiniband,
        Self::Gsm,
        Self::Cdma,
        Self::Bluetooth,
        Self::OvsBridge,
        Self::OvsPort,
        Self::OvsInterface,
        Self::IpTunnel,
        Self::Macsec,
        Self::Sriov,
        Self::Wireguard,
        Self::Dummy,
        Self::Vrf,
        Self::Wpan,
        Self::Sixlowpan,
        Self::Tun,
        Self::Veth,
        Self::Loopback,
        Self::Generic,
        Self::Vpn,
        Self::Serial,
        Self::Ppp,
        Self::User,
    ];

    /// Array index of the kind.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        by_kind(self).name
    }

    pub fn priority(self) -> SettingPriority {
        by_kind(self).priority
    }

    /// Whether the kind's name is a valid `connection.type` value.
    pub fn is_base_type(self) -> bool {
        self.priority() == SettingPriority::HwBase
    }
}

/// Registry entry for one setting kind.
pub struct Descriptor {
    pub name: &'static str,
    pub kind: SettingKind,
    pub priority: SettingPriority,
    pub new: fn() -> Setting,
}

const fn desc(
    name: &'static str,
    kind: SettingKind,
    priority: SettingPriority,
    new: fn() -> Setting,
) -> Descriptor {
    Descriptor {
        name,
        kind,
        priority,
        new,
    }
}

/// The registry table, sorted by wire name for binary search.
static DESCRIPTORS: [Descriptor; KIND_COUNT] = [
    desc("6lowpan", SettingKind::Sixlowpan, SettingPriority::HwBase, || {
        Setting::Sixlowpan(settings::SixlowpanSetting::default())
    }),
    desc("802-11-wireless", SettingKind::Wireless, SettingPriority::HwBase, || {
        Setting::Wireless(settings::WirelessSetting::default())
    }),
    desc(
        "802-11-wireless-security",
        SettingKind::WirelessSecurity,
        SettingPriority::HwNonBase,
        || Setting::WirelessSecurity(settings::WirelessSecuritySetting::default()),
    ),
    desc("802-1x", SettingKind::Ieee8021x, SettingPriority::HwAux, || {
        Setting::Ieee8021x(settings::Ieee8021xSetting::default())
    }),
    desc("802-3-ethernet", SettingKind::Wired, SettingPriority::HwBase, || {
        Setting::Wired(settings::WiredSetting::default())
    }),
    desc("bluetooth", SettingKind::Bluetooth, SettingPriority::HwBase, || {
        Setting::Bluetooth(settings::BluetoothSetting::default())
    }),
    desc("bond", SettingKind::Bond, SettingPriority::HwBase, || {
        Setting::Bond(settings::BondSetting::default())
    }),
    desc("bond-port", SettingKind::BondPort, SettingPriority::Aux, || {
        Setting::BondPort(settings::BondPortSetting::default())
    }),
    desc("bridge", SettingKind::Bridge, SettingPriority::HwBase, || {
        Setting::Bridge(settings::BridgeSetting::default())
    }),
    desc("bridge-port", SettingKind::BridgePort, SettingPriority::Aux, || {
        Setting::BridgePort(settings::BridgePortSetting::default())
    }),
    desc("cdma", SettingKind::Cdma, SettingPriority::HwBase, || {
        Setting::Cdma(settings::CdmaSetting::default())
    }),
    desc("connection", SettingKind::Connection, SettingPriority::Connection, || {
        Setting::Connection(settings::ConnectionSetting::default())
    }),
    desc("dummy", SettingKind::Dummy, SettingPriority::HwBase, || {
        Setting::Dummy(settings::DummySetting)
    }),
    desc("generic", SettingKind::Generic, SettingPriority::HwBase, || {
        Setting::Generic(settings::GenericSetting)
    }),
    desc("gsm", SettingKind::Gsm, SettingPriority::HwBase, || {
        Setting::Gsm(settings::GsmSetting::default())
    }),
    desc("infiniband", SettingKind::Infiniband, SettingPriority::HwBase, || {
        Setting::Infiniband(settings::InfinibandSetting::default())
    }),
    desc("ip-tunnel", SettingKind::IpTunnel, SettingPriority::HwBase, || {
        Setting::IpTunnel(settings::IpTunnelSetting::default())
    }),
    desc("ipv4", SettingKind::Ipv4, SettingPriority::Ip, || {
        Setting::Ipv4(settings::IpConfigSetting::new(Family::V4))
    }),
    desc("ipv6", SettingKind::Ipv6, SettingPriority::Ip, || {
        Setting::Ipv6(settings::IpConfigSetting::new(Family::V6))
    }),
    desc("loopback", SettingKind::Loopback, SettingPriority::HwBase, || {
        Setting::Loopback(settings::LoopbackSetting::default())
    }),
    desc("macsec", SettingKind::Macsec, SettingPriority::HwBase, || {
        Setting::Macsec(settings::MacsecSetting::default())
    }),
    desc("ovs-bridge", SettingKind::OvsBridge, SettingPriority::HwBase, || {
        Setting::OvsBridge(settings::OvsBridgeSetting::default())
    }),
    desc(
        "ovs-interface",
        SettingKind::OvsInterface,
        SettingPriority::HwBase,
        || Setting::OvsInterface(settings::OvsInterfaceSetting::default()),
    ),
    desc("ovs-port", SettingKind::OvsPort, SettingPriority::HwBase, || {
        Setting::OvsPort(settings::OvsPortSetting::default())
    }),
    desc("ppp", SettingKind::Ppp, SettingPriority::Aux, || {
        Setting::Ppp(settings::PppSetting::default())
    }),
    desc("proxy", SettingKind::Proxy, SettingPriority::Ip, || {
        Setting::Proxy(settings::ProxySetting::default())
    }),
    desc("serial", SettingKind::Serial, SettingPriority::Aux, || {
        Setting::Serial(settings::SerialSetting::default())
    }),
    desc("sriov", SettingKind::Sriov, SettingPriority::Aux, || {
        Setting::Sriov(settings::SriovSetting::default())
    }),
    desc("team", SettingKind::Team, SettingPriority::HwBase, || {
        Setting::Team(settings::TeamSetting::default())
    }),
    desc("team-port", SettingKind::TeamPort, SettingPriority::Aux, || {
        Setting::TeamPort(settings::TeamPortSetting::default())
    }),
    desc("tun", SettingKind::Tun, SettingPriority::HwBase, || {
        Setting::Tun(settings::TunSetting::default())
    }),
    desc("user", SettingKind::User, SettingPriority::User, || {
        Setting::User(settings::UserSetting::default())
    }),
    desc("veth", SettingKind::Veth, SettingPriority::HwBase, || {
        Setting::Veth(settings::VethSetting::default())
    }),
    desc("vlan", SettingKind::Vlan, SettingPriority::HwBase, || {
        Setting::Vlan(settings::VlanSetting::default())
    }),
    desc("vpn", SettingKind::Vpn, SettingPriority::HwBase, || {
        Setting::Vpn(settings::VpnSetting::default())
    }),
    desc("vrf", SettingKind::Vrf, SettingPriority::HwBase, || {
        Setting::Vrf(settings::VrfSetting::default())
    }),
    desc("wireguard", SettingKind::Wireguard, SettingPriority::HwBase, || {
        Setting::Wireguard(settings::WireguardSetting::default())
    }),
    desc("wpan", SettingKind::Wpan, SettingPriority::HwBase, || {
        Setting::Wpan(settings::WpanSetting::default())
    }),
];

/// Index from discriminant to descriptor, fixed at startup.
static BY_KIND: Lazy<[&'static Descriptor; KIND_COUNT]> = Lazy::new(|| {
    let mut table: [Option<&'static Descriptor>; KIND_COUNT] = [None; KIND_COUNT];
    for descriptor in &DESCRIPTORS {
        table[descriptor.kind.index()] = Some(descriptor);
    }
    table.map(|d| d.expect("every kind has a descriptor"))
});

/// Kinds in verification/secrets traversal order: by priority, ties
/// broken by wire name.
static PRIORITY_ORDER: Lazy<[SettingKind; KIND_COUNT]> = Lazy::new(|| {
    let mut kinds = SettingKind::ALL;
    kinds.sort_by_key(|kind| (kind.priority(), kind.name()));
    kinds
});

/// Look up a descriptor by wire name.
pub fn by_name(name: &str) -> Option<&'static Descriptor> {
    DESCRIPTORS
        .binary_search_by(|d| d.name.cmp(name))
        .ok()
        .map(|i| &DESCRIPTORS[i])
}

/// Look up the descriptor of a kind.
pub fn by_kind(kind: SettingKind) -> &'static Descriptor {
    BY_KIND[kind.index()]
}

/// Priority-ordered traversal of all kinds.
pub fn priority_order() -> &'static [SettingKind; KIND_COUNT] {
    &PRIORITY_ORDER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table_is_sorted() {
        for pair in DESCRIPTORS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_every_kind_is_reachable() {
        for kind in SettingKind::ALL {
            let descriptor = by_kind(kind);
            assert_eq!(descriptor.kind, kind);
            assert_eq!(by_name(descriptor.name).map(|d| d.kind), Some(kind));
            // The constructor builds a setting of the right kind.
            assert_eq!((descriptor.new)().kind(), kind);
        }
        assert!(by_name("no-such-setting").is_none());
    }

    #[test]
    fn test_priority_order() {
        let order = priority_order();
        assert_eq!(order[0], SettingKind::Connection);
        assert_eq!(order[KIND_COUNT - 1], SettingKind::User);
        for pair in order.windows(2) {
            assert!(
                (pair[0].priority(), pair[0].name()) < (pair[1].priority(), pair[1].name())
            );
        }
        // Base types come before their security layers.
        let position = |kind: SettingKind| order.iter().position(|k| *k == kind).unwrap_or(0);
        assert!(position(SettingKind::Wireless) < position(SettingKind::WirelessSecurity));
        assert!(position(SettingKind::WirelessSecurity) < position(SettingKind::Ieee8021x));
        assert!(position(SettingKind::Ieee8021x) < position(SettingKind::Ipv4));
    }

    #[test]
    fn test_base_type_names() {
        assert!(SettingKind::Wireless.is_base_type());
        assert!(SettingKind::Bond.is_base_type());
        assert!(!SettingKind::Connection.is_base_type());
        assert!(!SettingKind::Ipv4.is_base_type());
        assert!(!SettingKind::WirelessSecurity.is_base_type());
        assert_eq!(SettingKind::Wireless.name(), "802-11-wireless");
    }
}
