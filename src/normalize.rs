// Network Manager - Normalization Pipeline
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The fixed, ordered pipeline of repair passes that turns a softly
//! invalid connection into a valid one.
//!
//! The pass order encodes inter-pass dependencies (type inference must
//! run before port-type inference, which must run before port-setting
//! pruning); it is part of the observable behavior and must not be
//! reordered. Each pass reports whether it changed the connection.

use tracing::debug;
use uuid::Uuid;

use crate::connection::Connection;
use crate::registry::{self, SettingKind};
use crate::settings::{ConnectionSetting, IpConfigSetting, Setting};
use crate::settings::connection::PORT_TYPES;
use crate::settings::ip_config::SEND_HOSTNAME_DEFAULT;
use crate::settings::mobile::{BT_TYPE_DUN, BT_TYPE_NAP, BT_TYPE_PANU};
use crate::settings::wireless::MAC_RANDOMIZATION_ALWAYS;
use crate::settings::BondSetting;

/// Run every pass in order; returns whether anything changed.
pub(crate) fn run(connection: &mut Connection) -> bool {
    let passes: [fn(&mut Connection) -> bool; 22] = [
        normalize_uuid,
        normalize_connection_type,
        normalize_port_type,
        normalize_secondaries,
        normalize_ping_addresses,
        normalize_read_only,
        normalize_companion_settings,
        normalize_port_role_settings,
        normalize_ip_settings,
        normalize_ethernet_link,
        normalize_infiniband,
        normalize_bond_mode,
        normalize_bond_options,
        normalize_wireless,
        normalize_macsec,
        normalize_team_config,
        normalize_bluetooth_type,
        normalize_ovs_interface,
        normalize_tunnel_wired,
        normalize_sorted_lists,
        normalize_gsm_auto_config,
        normalize_8021x_empty_strings,
    ];

    let mut modified = false;
    for pass in passes {
        modified |= pass(connection);
    }
    if modified {
        debug!(id = connection.id().unwrap_or(""), "normalized connection");
    }
    modified
}

/// Generate a missing uuid, canonicalize a malformed one.
fn normalize_uuid(connection: &mut Connection) -> bool {
    let mut changed = !connection.has_setting(SettingKind::Connection);
    connection.ensure_setting(SettingKind::Connection);
    let Some(s_con) = connection.setting_connection_mut() else {
        return changed;
    };
    match &s_con.uuid {
        None => {
            s_con.uuid = Some(Uuid::new_v4().to_string());
            changed = true;
        }
        Some(uuid) if !ConnectionSetting::uuid_is_canonical(uuid) => {
            s_con.uuid = Some(match Uuid::try_parse(uuid) {
                Ok(parsed) => parsed.to_string(),
                Err(_) => Uuid::new_v4().to_string(),
            });
            changed = true;
        }
        Some(_) => {}
    }
    changed
}

/// Infer a missing type from the single present base setting, or
/// inject the base setting a declared type demands. Also derives a
/// missing id.
fn normalize_connection_type(connection: &mut Connection) -> bool {
    let mut changed = false;

    let inferred = connection.single_base_type();
    if let Some(s_con) = connection.setting_connection_mut() {
        if s_con.connection_type.is_none() {
            if let Some(kind) = inferred {
                s_con.connection_type = Some(kind.name().to_string());
                changed = true;
            }
        }
    }

    let type_name = connection.connection_type().map(str::to_string);
    if let Some(type_name) = &type_name {
        if let Some(descriptor) = registry::by_name(type_name) {
            if descriptor.kind.is_base_type() && !connection.has_setting(descriptor.kind) {
                connection.add_setting((descriptor.new)());
                changed = true;
            }
        }
    }

    if let Some(s_con) = connection.setting_connection_mut() {
        if s_con.id.is_none() {
            if let Some(type_name) = type_name {
                s_con.id = Some(type_name);
                changed = true;
            }
        }
    }

    changed
}

/// Infer a missing port-type from the present port-role settings;
/// ambiguity means no inference.
fn normalize_port_type(connection: &mut Connection) -> bool {
    let needs_inference = connection
        .setting_connection()
        .is_some_and(|s| s.controller.is_some() && s.port_type.is_none());
    if !needs_inference {
        return false;
    }

    let Some(port_type) = connection.detect_port_type() else {
        return false;
    };
    debug_assert!(PORT_TYPES.contains(&port_type));
    if let Some(s_con) = connection.setting_connection_mut() {
        s_con.port_type = Some(port_type.to_string());
        return true;
    }
    false
}

/// De-duplicate the secondaries list and drop malformed uuids.
fn normalize_secondaries(connection: &mut Connection) -> bool {
    let Some(s_con) = connection.setting_connection_mut() else {
        return false;
    };
    let before = s_con.secondaries.len();
    let mut seen: Vec<String> = Vec::new();
    s_con.secondaries.retain(|uuid| {
        let keep = Uuid::try_parse(uuid).is_ok() && !seen.contains(uuid);
        if keep {
            seen.push(uuid.clone());
        }
        keep
    });
    s_con.secondaries.len() != before
}

fn normalize_ping_addresses(connection: &mut Connection) -> bool {
    let Some(s_con) = connection.setting_connection_mut() else {
        return false;
    };
    let before = s_con.ip_ping_addresses.len();
    let mut seen: Vec<String> = Vec::new();
    s_con.ip_ping_addresses.retain(|address| {
        let keep = !seen.contains(address);
        if keep {
            seen.push(address.clone());
        }
        keep
    });
    s_con.ip_ping_addresses.len() != before
}

fn normalize_read_only(connection: &mut Connection) -> bool {
    let Some(s_con) = connection.setting_connection_mut() else {
        return false;
    };
    if s_con.read_only {
        s_con.read_only = false;
        true
    } else {
        false
    }
}

/// Inject companion settings the connection type requires: a wired
/// setting for vlan/bridge, a bridge setting for NAP bluetooth.
fn normalize_companion_settings(connection: &mut Connection) -> bool {
    let mut changed = false;
    match connection.connection_type() {
        Some("vlan") | Some("bridge") => {
            if !connection.has_setting(SettingKind::Wired) {
                connection.ensure_setting(SettingKind::Wired);
                changed = true;
            }
        }
        _ => {}
    }
    let nap = matches!(
        connection.setting(SettingKind::Bluetooth),
        Some(Setting::Bluetooth(bt)) if bt.bt_type.as_deref() == Some(BT_TYPE_NAP)
    );
    if nap && !connection.has_setting(SettingKind::Bridge) {
        connection.ensure_setting(SettingKind::Bridge);
        changed = true;
    }
    changed
}

/// Drop port-role settings inconsistent with the resolved port-type.
fn normalize_port_role_settings(connection: &mut Connection) -> bool {
    let port_type = connection
        .setting_connection()
        .and_then(|s| s.port_type.clone());
    let mut changed = false;
    for (kind, required) in [
        (SettingKind::BridgePort, "bridge"),
        (SettingKind::BondPort, "bond"),
        (SettingKind::TeamPort, "team"),
    ] {
        if port_type.as_deref() != Some(required) && connection.has_setting(kind) {
            connection.remove_setting(kind);
            changed = true;
        }
    }
    changed
}

/// Default IP method for the connection type.
fn default_ip_method(connection_type: Option<&str>) -> &'static str {
    match connection_type {
        Some("wireguard") | Some("dummy") => "disabled",
        _ => "auto",
    }
}

/// Inject, remove and repair the address-family settings.
fn normalize_ip_settings(connection: &mut Connection) -> bool {
    let mut changed = false;
    let connection_type = connection.connection_type().map(str::to_string);
    let method = default_ip_method(connection_type.as_deref());

    for kind in [SettingKind::Ipv4, SettingKind::Ipv6, SettingKind::Proxy] {
        let supported = connection.supports_address_family(kind);
        let present = connection.has_setting(kind);
        if supported && !present {
            let setting = match kind {
                SettingKind::Ipv4 => {
                    Setting::Ipv4(IpConfigSetting::with_method(crate::ip::Family::V4, method))
                }
                SettingKind::Ipv6 => {
                    Setting::Ipv6(IpConfigSetting::with_method(crate::ip::Family::V6, method))
                }
                _ => (registry::by_kind(kind).new)(),
            };
            connection.add_setting(setting);
            changed = true;
        } else if !supported && present {
            connection.remove_setting(kind);
            changed = true;
        }
    }

    for kind in [SettingKind::Ipv4, SettingKind::Ipv6] {
        let setting = match connection.setting_mut(kind) {
            Some(Setting::Ipv4(s)) | Some(Setting::Ipv6(s)) => s,
            _ => continue,
        };
        if setting.method.is_none() {
            setting.method = Some(method.to_string());
            changed = true;
        }
        if setting.never_default && setting.gateway.is_some() {
            setting.gateway = None;
            changed = true;
        }
        if setting.method_is_off() && !setting.may_fail {
            setting.may_fail = true;
            changed = true;
        }
        if setting.method.as_deref() == Some("shared") && setting.addresses.len() > 1 {
            setting.addresses.truncate(1);
            changed = true;
        }
        if setting.send_hostname_conflict() {
            setting.dhcp_send_hostname = Some(setting.dhcp_send_hostname_v2 != SEND_HOSTNAME_DEFAULT
                && setting.dhcp_send_hostname_v2 != 0);
            changed = true;
        }
    }

    changed
}

/// Speed and duplex are meaningful only together.
fn normalize_ethernet_link(connection: &mut Connection) -> bool {
    let Some(Setting::Wired(wired)) = connection.setting_mut(SettingKind::Wired) else {
        return false;
    };
    if !wired.auto_negotiate && (wired.speed != 0) != wired.duplex.is_some() {
        wired.speed = 0;
        wired.duplex = None;
        true
    } else {
        false
    }
}

/// Clamp the MTU to the transport mode's ceiling and sync the
/// interface name with the partition's virtual name.
fn normalize_infiniband(connection: &mut Connection) -> bool {
    let mut changed = false;
    let mut virtual_name = None;
    if let Some(Setting::Infiniband(ib)) = connection.setting_mut(SettingKind::Infiniband) {
        let max = ib.mtu_max();
        if ib.mtu > max {
            ib.mtu = max;
            changed = true;
        }
        virtual_name = ib.virtual_interface_name();
    }
    if let Some(virtual_name) = virtual_name {
        if let Some(s_con) = connection.setting_connection_mut() {
            if s_con.interface_name.is_some() && s_con.interface_name.as_deref() != Some(&virtual_name) {
                s_con.interface_name = Some(virtual_name);
                changed = true;
            }
        }
    }
    changed
}

/// Rewrite numeric bond modes to their canonical names.
fn normalize_bond_mode(connection: &mut Connection) -> bool {
    let Some(Setting::Bond(bond)) = connection.setting_mut(SettingKind::Bond) else {
        return false;
    };
    let Some(mode) = bond.option("mode").map(str::to_string) else {
        return false;
    };
    match BondSetting::canonical_mode(&mode) {
        Some(canonical) if canonical != mode => {
            bond.set_option("mode", Some(canonical));
            true
        }
        _ => false,
    }
}

/// Prune bond options unsupported by the active mode.
fn normalize_bond_options(connection: &mut Connection) -> bool {
    let Some(Setting::Bond(bond)) = connection.setting_mut(SettingKind::Bond) else {
        return false;
    };
    let mode = BondSetting::canonical_mode(bond.mode()).unwrap_or("balance-rr");
    let mut changed = false;
    for option in BondSetting::incompatible_options(mode) {
        if bond.option(option).is_some() {
            bond.set_option(option, None);
            changed = true;
        }
    }
    changed
}

/// Reset legacy wireless knobs and canonicalize MAC randomization.
fn normalize_wireless(connection: &mut Connection) -> bool {
    let Some(Setting::Wireless(wifi)) = connection.setting_mut(SettingKind::Wireless) else {
        return false;
    };
    let mut changed = false;
    if wifi.rate != 0 {
        wifi.rate = 0;
        changed = true;
    }
    if wifi.tx_power != 0 {
        wifi.tx_power = 0;
        changed = true;
    }
    let cloned_random = wifi.cloned_mac_address.as_deref() == Some("random");
    if cloned_random && wifi.mac_address_randomization != MAC_RANDOMIZATION_ALWAYS {
        wifi.mac_address_randomization = MAC_RANDOMIZATION_ALWAYS;
        changed = true;
    } else if !cloned_random && wifi.mac_address_randomization == MAC_RANDOMIZATION_ALWAYS {
        wifi.cloned_mac_address = Some("random".to_string());
        changed = true;
    }
    changed
}

/// Drop a stale MKA key on non-PSK MACsec connections.
fn normalize_macsec(connection: &mut Connection) -> bool {
    let Some(Setting::Macsec(macsec)) = connection.setting_mut(SettingKind::Macsec) else {
        return false;
    };
    if !macsec.is_psk_mode() && macsec.mka_cak.is_some() {
        macsec.mka_cak = None;
        true
    } else {
        false
    }
}

/// Unset empty team configuration strings.
fn normalize_team_config(connection: &mut Connection) -> bool {
    let mut changed = false;
    if let Some(Setting::Team(team)) = connection.setting_mut(SettingKind::Team) {
        if team.config.as_deref() == Some("") {
            team.config = None;
            changed = true;
        }
    }
    if let Some(Setting::TeamPort(port)) = connection.setting_mut(SettingKind::TeamPort) {
        if port.config.as_deref() == Some("") {
            port.config = None;
            changed = true;
        }
    }
    changed
}

/// Infer the bluetooth profile: DUN with a modem setting, NAP with a
/// bridge, PANU otherwise.
fn normalize_bluetooth_type(connection: &mut Connection) -> bool {
    let inferred = if connection.has_setting(SettingKind::Gsm)
        || connection.has_setting(SettingKind::Cdma)
    {
        BT_TYPE_DUN
    } else if connection.has_setting(SettingKind::Bridge) {
        BT_TYPE_NAP
    } else {
        BT_TYPE_PANU
    };
    let Some(Setting::Bluetooth(bt)) = connection.setting_mut(SettingKind::Bluetooth) else {
        return false;
    };
    if bt.bt_type.is_none() {
        bt.bt_type = Some(inferred.to_string());
        true
    } else {
        false
    }
}

/// Re-verify the OVS interface type, defaulting to `internal`.
fn normalize_ovs_interface(connection: &mut Connection) -> bool {
    let Some(Setting::OvsInterface(ovs)) = connection.setting_mut(SettingKind::OvsInterface)
    else {
        return false;
    };
    if ovs.interface_type.is_none() {
        ovs.interface_type = Some("internal".to_string());
        true
    } else {
        false
    }
}

/// Layer-3 tunnels drop their Ethernet setting.
fn normalize_tunnel_wired(connection: &mut Connection) -> bool {
    let is_l3_tunnel = matches!(
        connection.setting(SettingKind::IpTunnel),
        Some(Setting::IpTunnel(tunnel)) if !tunnel.is_tap_mode()
    );
    if is_l3_tunnel && connection.has_setting(SettingKind::Wired) {
        connection.remove_setting(SettingKind::Wired);
        true
    } else {
        false
    }
}

/// Sort SR-IOV VFs, bridge VLAN lists, and OVS trunk lists.
fn normalize_sorted_lists(connection: &mut Connection) -> bool {
    let mut changed = false;
    if let Some(Setting::Sriov(sriov)) = connection.setting_mut(SettingKind::Sriov) {
        if !sriov.vfs_sorted() {
            sriov.vfs.sort_by_key(|vf| vf.index);
            changed = true;
        }
    }
    if let Some(Setting::Bridge(bridge)) = connection.setting_mut(SettingKind::Bridge) {
        if !crate::settings::bridge::vlans_sorted(&bridge.vlans) {
            bridge.vlans.sort_by_key(|v| v.vid_start);
            changed = true;
        }
    }
    if let Some(Setting::BridgePort(port)) = connection.setting_mut(SettingKind::BridgePort) {
        if !crate::settings::bridge::vlans_sorted(&port.vlans) {
            port.vlans.sort_by_key(|v| v.vid_start);
            changed = true;
        }
    }
    if let Some(Setting::OvsPort(port)) = connection.setting_mut(SettingKind::OvsPort) {
        if !port.trunks_sorted() {
            port.trunks.sort();
            changed = true;
        }
    }
    changed
}

/// Explicit credentials win over GSM auto-configuration.
fn normalize_gsm_auto_config(connection: &mut Connection) -> bool {
    let Some(Setting::Gsm(gsm)) = connection.setting_mut(SettingKind::Gsm) else {
        return false;
    };
    if gsm.auto_config_conflict() {
        gsm.auto_config = false;
        true
    } else {
        false
    }
}

/// Unset empty-string 802.1x properties.
fn normalize_8021x_empty_strings(connection: &mut Connection) -> bool {
    let Some(Setting::Ieee8021x(dot1x)) = connection.setting_mut(SettingKind::Ieee8021x) else {
        return false;
    };
    let mut changed = false;
    for field in [
        &mut dot1x.identity,
        &mut dot1x.anonymous_identity,
        &mut dot1x.domain_suffix_match,
    ] {
        if field.as_deref() == Some("") {
            *field = None;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifyResult;
    use crate::settings::{BridgePortSetting, GsmSetting, WirelessSetting};

    /// The canonical scenario: a connection holding only a wireless
    /// setting normalizes into a complete Wi-Fi profile.
    #[test]
    fn test_wireless_only_connection_normalizes() {
        let mut connection = Connection::new();
        let mut wifi = WirelessSetting::default();
        wifi.ssid = b"corp-net".to_vec();
        connection.add_setting(Setting::Wireless(wifi));

        assert!(matches!(connection.verify(), VerifyResult::Normalizable(_)));
        assert!(connection.normalize().unwrap());

        assert!(connection.verify().is_success());
        assert_eq!(connection.connection_type(), Some("802-11-wireless"));
        let uuid = connection.uuid().expect("uuid was generated");
        assert!(ConnectionSetting::uuid_is_canonical(uuid));
        assert_eq!(connection.setting_ip4().unwrap().method.as_deref(), Some("auto"));
        assert_eq!(connection.setting_ip6().unwrap().method.as_deref(), Some("auto"));
        assert!(connection.setting_proxy().is_some());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut connection = Connection::new();
        let mut wifi = WirelessSetting::default();
        wifi.ssid = b"corp-net".to_vec();
        connection.add_setting(Setting::Wireless(wifi));

        assert!(connection.normalize().unwrap());
        assert_eq!(connection.normalize().unwrap(), false);
    }

    #[test]
    fn test_uuid_canonicalization_preserves_value() {
        let mut connection = Connection::new_simple("office", "802-3-ethernet").unwrap();
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.uuid = Some("2F283F08-7D4C-42F1-A472-47120DBF7E76".into());
        }
        connection.normalize().unwrap();
        assert_eq!(
            connection.uuid(),
            Some("2f283f08-7d4c-42f1-a472-47120dbf7e76")
        );
    }

    #[test]
    fn test_garbage_uuid_is_regenerated() {
        let mut connection = Connection::new_simple("office", "802-3-ethernet").unwrap();
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.uuid = Some("not-a-uuid".into());
        }
        connection.normalize().unwrap();
        assert!(ConnectionSetting::uuid_is_canonical(connection.uuid().unwrap()));
    }

    #[test]
    fn test_type_injection_adds_base_setting() {
        let mut connection = Connection::new();
        let mut s_con = ConnectionSetting::default();
        s_con.id = Some("wired".into());
        s_con.uuid = Some(Uuid::new_v4().to_string());
        s_con.connection_type = Some("802-3-ethernet".into());
        connection.add_setting(Setting::Connection(s_con));

        assert!(matches!(connection.verify(), VerifyResult::Normalizable(_)));
        connection.normalize().unwrap();
        assert!(connection.has_setting(SettingKind::Wired));
        assert!(connection.verify().is_success());
    }

    #[test]
    fn test_port_connection_loses_ip_settings() {
        let mut connection = Connection::new_simple("port0", "802-3-ethernet").unwrap();
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.controller = Some("br0".into());
            s_con.port_type = Some("bridge".into());
        }
        connection.add_setting(Setting::BridgePort(BridgePortSetting::default()));
        connection.add_setting((registry::by_kind(SettingKind::Ipv4).new)());

        // An IP setting on a port is an actual (but repairable) error.
        assert!(matches!(
            connection.verify(),
            VerifyResult::NormalizableError(_)
        ));
        connection.normalize().unwrap();
        assert!(!connection.has_setting(SettingKind::Ipv4));
        assert!(connection.has_setting(SettingKind::BridgePort));
        assert!(connection.verify().is_success());
    }

    #[test]
    fn test_port_type_inference_and_pruning() {
        let mut connection = Connection::new_simple("port0", "802-3-ethernet").unwrap();
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.controller = Some("br0".into());
        }
        connection.add_setting(Setting::BridgePort(BridgePortSetting::default()));
        connection.normalize().unwrap();
        assert_eq!(
            connection.setting_connection().unwrap().port_type.as_deref(),
            Some("bridge")
        );

        // A stray bond-port setting on a bridge port gets dropped.
        connection.add_setting((registry::by_kind(SettingKind::BondPort).new)());
        assert!(matches!(connection.verify(), VerifyResult::Normalizable(_)));
        connection.normalize().unwrap();
        assert!(!connection.has_setting(SettingKind::BondPort));
    }

    #[test]
    fn test_vrf_port_keeps_ip_settings() {
        let mut connection = Connection::new_simple("vrf-port", "802-3-ethernet").unwrap();
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.controller = Some("vrf0".into());
            s_con.port_type = Some("vrf".into());
        }
        connection.normalize().unwrap();
        assert!(connection.has_setting(SettingKind::Ipv4));
        assert!(connection.verify().is_success());
    }

    #[test]
    fn test_wireguard_defaults_to_disabled_method() {
        let mut connection = Connection::new_simple("wg0", "wireguard").unwrap();
        connection.normalize().unwrap();
        assert_eq!(
            connection.setting_ip4().unwrap().method.as_deref(),
            Some("disabled")
        );
        // need_secrets still reports the missing private key.
        assert_eq!(connection.need_secrets(false).unwrap().0, "wireguard");
    }

    #[test]
    fn test_gateway_cleared_with_never_default() {
        let mut connection = Connection::new_simple("eth", "802-3-ethernet").unwrap();
        connection.normalize().unwrap();
        if let Some(Setting::Ipv4(ip4)) = connection.setting_mut(SettingKind::Ipv4) {
            ip4.method = Some("manual".into());
            ip4.addresses
                .push(crate::ip::IpAddress::new(crate::ip::Family::V4, "10.0.0.2", 24).unwrap());
            ip4.gateway = Some("10.0.0.1".into());
            ip4.never_default = true;
        }
        connection.normalize().unwrap();
        assert!(connection.setting_ip4().unwrap().gateway.is_none());
    }

    #[test]
    fn test_secondaries_dedup() {
        let mut connection = Connection::new_simple("eth", "802-3-ethernet").unwrap();
        let uuid = Uuid::new_v4().to_string();
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.secondaries = vec![uuid.clone(), "garbage".into(), uuid.clone()];
        }
        connection.normalize().unwrap();
        assert_eq!(
            connection.setting_connection().unwrap().secondaries,
            vec![uuid]
        );
    }

    #[test]
    fn test_bond_mode_and_options() {
        let mut connection = Connection::new_simple("bond0", "bond").unwrap();
        if let Some(Setting::Bond(bond)) = connection.setting_mut(SettingKind::Bond) {
            bond.set_option("mode", Some("0"));
            bond.set_option("primary", Some("eth0"));
        }
        connection.normalize().unwrap();
        let Some(Setting::Bond(bond)) = connection.setting(SettingKind::Bond) else {
            panic!("bond setting vanished");
        };
        assert_eq!(bond.option("mode"), Some("balance-rr"));
        assert_eq!(bond.option("primary"), None);
    }

    #[test]
    fn test_bluetooth_dun_inference() {
        let mut connection = Connection::new_simple("bt", "bluetooth").unwrap();
        if let Some(Setting::Bluetooth(bt)) = connection.setting_mut(SettingKind::Bluetooth) {
            bt.bdaddr = Some("AA:BB:CC:DD:EE:FF".into());
        }
        connection.add_setting(Setting::Gsm(GsmSetting::default()));
        connection.normalize().unwrap();
        let Some(Setting::Bluetooth(bt)) = connection.setting(SettingKind::Bluetooth) else {
            panic!("bluetooth setting vanished");
        };
        assert_eq!(bt.bt_type.as_deref(), Some(BT_TYPE_DUN));
    }

    #[test]
    fn test_bluetooth_panu_fallback() {
        let mut connection = Connection::new_simple("bt", "bluetooth").unwrap();
        if let Some(Setting::Bluetooth(bt)) = connection.setting_mut(SettingKind::Bluetooth) {
            bt.bdaddr = Some("AA:BB:CC:DD:EE:FF".into());
        }
        connection.normalize().unwrap();
        let Some(Setting::Bluetooth(bt)) = connection.setting(SettingKind::Bluetooth) else {
            panic!("bluetooth setting vanished");
        };
        assert_eq!(bt.bt_type.as_deref(), Some(BT_TYPE_PANU));
    }

    #[test]
    fn test_tunnel_drops_wired() {
        let mut connection = Connection::new_simple("tun0", "ip-tunnel").unwrap();
        if let Some(Setting::IpTunnel(tunnel)) = connection.setting_mut(SettingKind::IpTunnel) {
            tunnel.mode = Some("ipip".into());
            tunnel.remote = Some("192.0.2.1".into());
        }
        connection.add_setting((registry::by_kind(SettingKind::Wired).new)());
        connection.normalize().unwrap();
        assert!(!connection.has_setting(SettingKind::Wired));
        assert!(connection.verify().is_success());
    }

    #[test]
    fn test_vlan_gains_wired_companion() {
        let mut connection = Connection::new_simple("vlan7", "vlan").unwrap();
        if let Some(Setting::Vlan(vlan)) = connection.setting_mut(SettingKind::Vlan) {
            vlan.parent = Some("eth0".into());
            vlan.id = 7;
        }
        connection.normalize().unwrap();
        assert!(connection.has_setting(SettingKind::Wired));
        assert!(connection.verify().is_success());
    }

    #[test]
    fn test_infiniband_interface_name_sync() {
        let mut connection = Connection::new_simple("ib", "infiniband").unwrap();
        if let Some(Setting::Infiniband(ib)) = connection.setting_mut(SettingKind::Infiniband) {
            ib.transport_mode = Some("datagram".into());
            ib.p_key = 0x8001;
            ib.parent = Some("ib0".into());
            ib.mtu = 9000;
        }
        if let Some(s_con) = connection.setting_connection_mut() {
            s_con.interface_name = Some("ib7".into());
        }
        connection.normalize().unwrap();
        assert_eq!(connection.interface_name(), Some("ib0.8001"));
        let Some(Setting::Infiniband(ib)) = connection.setting(SettingKind::Infiniband) else {
            panic!("infiniband setting vanished");
        };
        assert_eq!(ib.mtu, crate::settings::infiniband::MTU_DATAGRAM_MAX);
    }
}
