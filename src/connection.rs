// Network Manager - Connection Aggregate
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The connection aggregate: at most one setting per kind, plus the
//! verify → normalize → re-verify pipeline, diffing, and the secrets
//! lifecycle.
//!
//! Mutating operations report their effect in the return value ("did
//! anything change"); there are no observer callbacks, so re-entrancy
//! hazards cannot arise.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result, VerifyResult};
use crate::flags::{CompareFlags, DiffKind, ParseFlags, SecretFlags, ToWireOptions};
use crate::normalize;
use crate::registry::{self, SettingKind, KIND_COUNT};
use crate::settings::{ConnectionSetting, IpConfigSetting, ProxySetting, Setting, WiredSetting, WirelessSetting};
use crate::wire::{self, ConnectionDict, PropertyDict};

/// A connection profile: an ordered, fixed-size collection of at most
/// one setting per kind.
///
/// Slot `i` always holds a setting whose kind maps to discriminant `i`.
/// The `path` is an opaque caller-assigned identifier and is not part
/// of the wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    path: Option<String>,
    settings: [Option<Setting>; KIND_COUNT],
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Create an empty connection.
    pub fn new() -> Self {
        Self {
            path: None,
            settings: std::array::from_fn(|_| None),
        }
    }

    /// Create a minimal valid connection: id, fresh uuid, type, and the
    /// type's base setting.
    pub fn new_simple(id: &str, connection_type: &str) -> Result<Self> {
        let descriptor = registry::by_name(connection_type)
            .filter(|d| d.kind.is_base_type())
            .ok_or_else(|| {
                Error::invalid_property(
                    "connection",
                    "type",
                    format!("unknown connection type: {}", connection_type),
                )
            })?;
        let mut connection = Self::new();
        let mut s_con = ConnectionSetting::default();
        s_con.id = Some(id.to_string());
        s_con.uuid = Some(Uuid::new_v4().to_string());
        s_con.connection_type = Some(connection_type.to_string());
        connection.add_setting(Setting::Connection(s_con));
        connection.add_setting((descriptor.new)());
        Ok(connection)
    }

    /// Decode a connection from its wire dictionary.
    pub fn from_dbus(dict: &ConnectionDict, flags: ParseFlags) -> Result<Self> {
        let mut connection = Self::new();
        connection.replace_settings(dict, flags)?;
        Ok(connection)
    }

    /// Opaque caller-assigned identifier.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<&str>) {
        self.path = path.map(str::to_string);
    }

    // ========================================
    // Slot access
    // ========================================

    pub fn setting(&self, kind: SettingKind) -> Option<&Setting> {
        self.settings[kind.index()].as_ref()
    }

    pub fn setting_mut(&mut self, kind: SettingKind) -> Option<&mut Setting> {
        self.settings[kind.index()].as_mut()
    }

    pub fn has_setting(&self, kind: SettingKind) -> bool {
        self.settings[kind.index()].is_some()
    }

    /// Replace (or add) a setting; the previous occupant of the slot is
    /// dropped. Returns whether the connection changed.
    pub fn add_setting(&mut self, setting: Setting) -> bool {
        let slot = &mut self.settings[setting.kind().index()];
        let changed = slot.as_ref() != Some(&setting);
        *slot = Some(setting);
        changed
    }

    /// Remove a setting; returns whether something was removed.
    pub fn remove_setting(&mut self, kind: SettingKind) -> bool {
        self.settings[kind.index()].take().is_some()
    }

    /// Get the setting of a kind, injecting a default one if absent.
    pub(crate) fn ensure_setting(&mut self, kind: SettingKind) -> &mut Setting {
        let slot = &mut self.settings[kind.index()];
        slot.get_or_insert_with(|| (registry::by_kind(kind).new)())
    }

    pub fn setting_connection(&self) -> Option<&ConnectionSetting> {
        match self.setting(SettingKind::Connection) {
            Some(Setting::Connection(s)) => Some(s),
            _ => None,
        }
    }

    pub fn setting_connection_mut(&mut self) -> Option<&mut ConnectionSetting> {
        match self.setting_mut(SettingKind::Connection) {
            Some(Setting::Connection(s)) => Some(s),
            _ => None,
        }
    }

    pub fn setting_ip4(&self) -> Option<&IpConfigSetting> {
        match self.setting(SettingKind::Ipv4) {
            Some(Setting::Ipv4(s)) => Some(s),
            _ => None,
        }
    }

    pub fn setting_ip6(&self) -> Option<&IpConfigSetting> {
        match self.setting(SettingKind::Ipv6) {
            Some(Setting::Ipv6(s)) => Some(s),
            _ => None,
        }
    }

    pub fn setting_proxy(&self) -> Option<&ProxySetting> {
        match self.setting(SettingKind::Proxy) {
            Some(Setting::Proxy(s)) => Some(s),
            _ => None,
        }
    }

    pub fn setting_wired(&self) -> Option<&WiredSetting> {
        match self.setting(SettingKind::Wired) {
            Some(Setting::Wired(s)) => Some(s),
            _ => None,
        }
    }

    pub fn setting_wireless(&self) -> Option<&WirelessSetting> {
        match self.setting(SettingKind::Wireless) {
            Some(Setting::Wireless(s)) => Some(s),
            _ => None,
        }
    }

    // ========================================
    // Identity conveniences
    // ========================================

    pub fn id(&self) -> Option<&str> {
        self.setting_connection().and_then(|s| s.id.as_deref())
    }

    pub fn uuid(&self) -> Option<&str> {
        self.setting_connection().and_then(|s| s.uuid.as_deref())
    }

    pub fn connection_type(&self) -> Option<&str> {
        self.setting_connection()
            .and_then(|s| s.connection_type.as_deref())
    }

    pub fn interface_name(&self) -> Option<&str> {
        self.setting_connection()
            .and_then(|s| s.interface_name.as_deref())
    }

    pub fn is_type(&self, type_name: &str) -> bool {
        self.connection_type() == Some(type_name)
    }

    // ========================================
    // Wire codec
    // ========================================

    /// Serialize to the `a{sa{sv}}` wire dictionary.
    ///
    /// Present settings serialize even when every property is at its
    /// default; under `OnlySecrets` settings without secrets are
    /// skipped entirely.
    pub fn to_dbus(&self, options: ToWireOptions) -> ConnectionDict {
        let mut out = ConnectionDict::new();
        for kind in registry::priority_order() {
            if let Some(setting) = self.setting(*kind) {
                let dict = setting.to_wire(options);
                if options == ToWireOptions::OnlySecrets && dict.is_empty() {
                    continue;
                }
                out.push((setting.name().to_string(), dict));
            }
        }
        out
    }

    /// Replace all settings from a wire dictionary.
    ///
    /// Duplicate setting names are an error under `STRICT`, otherwise
    /// the last occurrence wins. Unknown setting names are an error
    /// unless `BEST_EFFORT` skips them. With `NORMALIZE`, a failed
    /// normalization leaves the connection mutated; this is documented
    /// non-atomic behavior.
    pub fn replace_settings(&mut self, dict: &ConnectionDict, flags: ParseFlags) -> Result<bool> {
        if !flags.is_valid() {
            return Err(Error::Failed(
                "STRICT and BEST_EFFORT are mutually exclusive".into(),
            ));
        }
        let strict = flags.contains(ParseFlags::STRICT);
        let best_effort = flags.contains(ParseFlags::BEST_EFFORT);

        let mut staged: Vec<(SettingKind, Setting)> = Vec::new();
        for (name, props) in dict {
            let Some(descriptor) = registry::by_name(name) else {
                if best_effort {
                    debug!(setting = name.as_str(), "skipping unknown setting");
                    continue;
                }
                return Err(Error::invalid_setting(name.clone(), "unknown setting name"));
            };
            if let Some(pos) = staged.iter().position(|(kind, _)| *kind == descriptor.kind) {
                if strict {
                    return Err(Error::invalid_setting(name.clone(), "duplicate setting name"));
                }
                staged.remove(pos);
            }
            let mut setting = (descriptor.new)();
            match setting.update_from_wire(props, flags) {
                Ok(()) => staged.push((descriptor.kind, setting)),
                Err(e) => {
                    if best_effort {
                        warn!(setting = name.as_str(), error = %e, "skipping unparsable setting");
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        self.settings = std::array::from_fn(|_| None);
        for (kind, setting) in staged {
            self.settings[kind.index()] = Some(setting);
        }

        if flags.contains(ParseFlags::NORMALIZE) {
            self.normalize()?;
        }
        Ok(true)
    }

    // ========================================
    // Verification
    // ========================================

    /// Verify the connection.
    ///
    /// Settings are verified in priority order; the first hard failure
    /// stops immediately. Soft results accumulate: a higher severity
    /// wins, the first encountered wins within a severity. Cross-setting
    /// address-family checks run last.
    pub fn verify(&self) -> VerifyResult {
        let mut result = VerifyResult::Success;

        if !self.has_setting(SettingKind::Connection) {
            // Repairable only when the type can be inferred from a
            // single present base setting.
            if self.single_base_type().is_none() {
                return VerifyResult::Failure(Error::missing_setting(ConnectionSetting::NAME));
            }
            result = result.merge(VerifyResult::Normalizable(Error::missing_setting(
                ConnectionSetting::NAME,
            )));
        }

        for kind in registry::priority_order() {
            if let Some(setting) = self.setting(*kind) {
                match setting.verify(self) {
                    VerifyResult::Failure(e) => return VerifyResult::Failure(e),
                    other => result = result.merge(other),
                }
            }
        }

        // A connection's type decides which address-family settings it
        // must (or must not) carry. Absence is historically tolerated,
        // presence where unsupported is an actual error.
        for kind in [SettingKind::Ipv4, SettingKind::Ipv6, SettingKind::Proxy] {
            let supported = self.supports_address_family(kind);
            let present = self.has_setting(kind);
            if supported && !present {
                result = result.merge(VerifyResult::Normalizable(Error::missing_setting(
                    kind.name(),
                )));
            } else if !supported && present {
                result = result.merge(VerifyResult::NormalizableError(
                    Error::ConnectionTypeIncompatible {
                        setting: kind.name().to_string(),
                        connection_type: self.connection_type().unwrap_or("unknown").to_string(),
                    },
                ));
            }
        }

        // Companion settings required by the connection type.
        match self.connection_type() {
            Some("vlan") | Some("bridge") => {
                if !self.has_setting(SettingKind::Wired) {
                    result = result.merge(VerifyResult::Normalizable(Error::missing_setting(
                        WiredSetting::NAME,
                    )));
                }
            }
            _ => {}
        }

        // Port-role settings must match the resolved port type.
        let port_type = self
            .setting_connection()
            .and_then(|s| s.port_type.as_deref());
        for (kind, required) in [
            (SettingKind::BridgePort, "bridge"),
            (SettingKind::BondPort, "bond"),
            (SettingKind::TeamPort, "team"),
        ] {
            if self.has_setting(kind) && port_type != Some(required) {
                result = result.merge(VerifyResult::Normalizable(Error::invalid_setting(
                    kind.name(),
                    format!("requires port-type {}", required),
                )));
            }
        }

        result
    }

    /// Port-type detectable from the present port-role settings, if
    /// unambiguous; used for port-type inference.
    pub(crate) fn detect_port_type(&self) -> Option<&'static str> {
        let candidates: Vec<&'static str> = [
            (SettingKind::BridgePort, "bridge"),
            (SettingKind::BondPort, "bond"),
            (SettingKind::TeamPort, "team"),
            (SettingKind::OvsInterface, "ovs-port"),
            (SettingKind::OvsPort, "ovs-bridge"),
        ]
        .iter()
        .filter(|(kind, _)| self.has_setting(*kind))
        .map(|(_, port_type)| *port_type)
        .collect();
        match candidates[..] {
            [port_type] => Some(port_type),
            _ => None,
        }
    }

    /// The single present base-type setting, if exactly one exists;
    /// used for connection-type inference.
    pub(crate) fn single_base_type(&self) -> Option<SettingKind> {
        let mut found = None;
        for kind in SettingKind::ALL {
            if kind.is_base_type() && self.has_setting(kind) {
                if found.is_some() {
                    return None;
                }
                found = Some(kind);
            }
        }
        found
    }

    /// Whether the connection's type wants the given address-family
    /// setting (`Ipv4`, `Ipv6` or `Proxy`).
    pub(crate) fn supports_address_family(&self, concern: SettingKind) -> bool {
        let Some(s_con) = self.setting_connection() else {
            return true;
        };
        if s_con.controller.is_some() {
            // Ports carry no IP configuration of their own, except VRF
            // ports which route independently.
            return s_con.port_type.as_deref() == Some("vrf");
        }
        match s_con.connection_type.as_deref() {
            Some("wpan") => false,
            Some("6lowpan") => concern == SettingKind::Ipv6,
            _ => true,
        }
    }

    /// Repair a softly-invalid connection.
    ///
    /// Legal only after [`verify`](Self::verify) returned a soft result:
    /// an already-valid connection is a no-op `Ok(false)`, a hard
    /// failure is returned as the error. Returns whether any pass
    /// modified the connection.
    pub fn normalize(&mut self) -> Result<bool> {
        match self.verify() {
            VerifyResult::Success => return Ok(false),
            VerifyResult::Failure(e) => return Err(e),
            VerifyResult::Normalizable(_) | VerifyResult::NormalizableError(_) => {}
        }

        let modified = normalize::run(self);

        match self.verify() {
            VerifyResult::Success => Ok(modified),
            other => {
                // The input was proven normalizable; not converging is a
                // defect in the pipeline itself, not bad input.
                let err = other
                    .error()
                    .cloned()
                    .unwrap_or_else(|| Error::Failed("unknown verification state".into()));
                debug_assert!(
                    false,
                    "normalization did not converge to a valid connection: {}",
                    err
                );
                Err(Error::Failed(format!(
                    "connection failed to normalize: {}",
                    err
                )))
            }
        }
    }

    // ========================================
    // Comparison and diffing
    // ========================================

    /// Structural equality under comparison flags; early exit on the
    /// first mismatch.
    pub fn compare(&self, other: &Connection, flags: CompareFlags) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        for kind in SettingKind::ALL {
            match (self.setting(kind), other.setting(kind)) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    if !a.compare(b, flags) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Per-setting, per-property differences in both directions.
    ///
    /// Returns `None` when the connections compare equal. A setting
    /// present on one side only reports all its wire properties plus
    /// its `name`.
    pub fn diff(
        &self,
        other: &Connection,
        flags: CompareFlags,
    ) -> Option<BTreeMap<String, BTreeMap<String, DiffKind>>> {
        let mut out: BTreeMap<String, BTreeMap<String, DiffKind>> = BTreeMap::new();
        for kind in SettingKind::ALL {
            let entries: Vec<(String, DiffKind)> = match (self.setting(kind), other.setting(kind)) {
                (None, None) => continue,
                (Some(a), Some(b)) => a.diff(b, flags),
                (Some(a), None) => one_sided(a, DiffKind::IN_A, flags),
                (None, Some(b)) => one_sided(b, DiffKind::IN_B, flags),
            };
            if !entries.is_empty() {
                out.insert(kind.name().to_string(), entries.into_iter().collect());
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    // ========================================
    // Secrets lifecycle
    // ========================================

    /// Update secrets from a connection-shaped wire dictionary.
    ///
    /// With a setting name, only that setting's entry applies (the
    /// setting must exist). With `None`, every named setting must
    /// already exist (checked up front); per-setting failures do not
    /// stop the remaining settings, and the first error is surfaced.
    /// Returns whether any secret actually changed.
    pub fn update_secrets(
        &mut self,
        setting_name: Option<&str>,
        secrets: &ConnectionDict,
    ) -> Result<bool> {
        match setting_name {
            Some(name) => {
                let kind = registry::by_name(name)
                    .map(|d| d.kind)
                    .filter(|kind| self.has_setting(*kind))
                    .ok_or_else(|| Error::SettingNotFound(name.to_string()))?;
                match secrets.iter().rev().find(|(n, _)| n == name) {
                    None => Ok(false),
                    Some((_, props)) => self.apply_setting_secrets(kind, props),
                }
            }
            None => {
                for (name, _) in secrets {
                    let known = registry::by_name(name)
                        .is_some_and(|d| self.has_setting(d.kind));
                    if !known {
                        return Err(Error::SettingNotFound(name.clone()));
                    }
                }
                let mut first_err = None;
                let mut changed = false;
                for (name, props) in secrets {
                    let Some(descriptor) = registry::by_name(name) else {
                        continue;
                    };
                    match self.apply_setting_secrets(descriptor.kind, props) {
                        Ok(c) => changed |= c,
                        Err(e) => {
                            if first_err.is_none() {
                                first_err = Some(e);
                            }
                        }
                    }
                }
                match first_err {
                    Some(e) => Err(e),
                    None => Ok(changed),
                }
            }
        }
    }

    fn apply_setting_secrets(&mut self, kind: SettingKind, props: &PropertyDict) -> Result<bool> {
        let setting = self.settings[kind.index()]
            .as_mut()
            .ok_or_else(|| Error::SettingNotFound(kind.name().to_string()))?;
        let secret_names = setting.data().secret_properties();
        let mut changed = false;
        for (key, value) in props {
            if secret_names.contains(&key.as_str()) {
                changed |= setting.data_mut().set_secret(key, value)?;
            }
        }
        Ok(changed)
    }

    /// First setting (in priority order) that still needs secrets,
    /// with the names of the missing secrets.
    pub fn need_secrets(
        &self,
        check_rerequest: bool,
    ) -> Option<(&'static str, Vec<&'static str>)> {
        for kind in registry::priority_order() {
            if let Some(setting) = self.setting(*kind) {
                let hints = setting.data().need_secrets(check_rerequest);
                if !hints.is_empty() {
                    return Some((kind.name(), hints));
                }
            }
        }
        None
    }

    /// Clear every secret; returns whether anything was cleared.
    pub fn clear_secrets(&mut self) -> bool {
        self.clear_secrets_filtered(|_, _, _| true)
    }

    /// Clear the secrets selected by the predicate
    /// `(setting name, secret name, flags) -> clear?`.
    pub fn clear_secrets_filtered<F>(&mut self, filter: F) -> bool
    where
        F: Fn(&str, &str, SecretFlags) -> bool,
    {
        let mut cleared = false;
        for kind in SettingKind::ALL {
            if let Some(setting) = self.settings[kind.index()].as_mut() {
                for name in setting.data().secret_properties() {
                    let flags = setting.data().secret_flags(name);
                    if filter(kind.name(), name, flags) {
                        cleared |= setting.data_mut().clear_secret(name);
                    }
                }
            }
        }
        cleared
    }

    /// Clear all secrets except those whose flags intersect
    /// `keep_flags`. An empty `keep_flags` keeps only secrets whose
    /// flags are exactly none (system-owned).
    pub fn clear_secrets_by_flags(&mut self, keep_flags: SecretFlags) -> bool {
        if keep_flags == SecretFlags::NONE {
            self.clear_secrets_filtered(|_, _, flags| flags != SecretFlags::NONE)
        } else {
            self.clear_secrets_filtered(|_, _, flags| !flags.intersects(keep_flags))
        }
    }
}

fn one_sided(
    setting: &Setting,
    side: DiffKind,
    flags: CompareFlags,
) -> Vec<(String, DiffKind)> {
    let options = if flags.contains(CompareFlags::IGNORE_SECRETS) {
        ToWireOptions::NoSecrets
    } else {
        ToWireOptions::All
    };
    let mut entries: Vec<(String, DiffKind)> = setting
        .to_wire(options)
        .into_iter()
        .map(|(key, _)| (key, side))
        .collect();
    entries.push(("name".to_string(), side));
    entries.sort();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{GsmSetting, WirelessSecuritySetting};

    fn wifi_connection() -> Connection {
        let mut connection = Connection::new_simple("office", "802-11-wireless").unwrap();
        if let Some(Setting::Wireless(wifi)) = connection.setting_mut(SettingKind::Wireless) {
            wifi.ssid = b"office".to_vec();
        }
        connection.normalize().unwrap();
        connection
    }

    #[test]
    fn test_add_remove_setting() {
        let mut connection = Connection::new();
        assert!(connection.add_setting(Setting::Proxy(ProxySetting::default())));
        // Adding an identical setting changes nothing.
        assert!(!connection.add_setting(Setting::Proxy(ProxySetting::default())));
        assert!(connection.has_setting(SettingKind::Proxy));
        assert!(connection.remove_setting(SettingKind::Proxy));
        assert!(!connection.remove_setting(SettingKind::Proxy));
    }

    #[test]
    fn test_new_simple_is_normalizable_to_success() {
        let connection = wifi_connection();
        assert!(connection.verify().is_success());
        assert!(connection.uuid().is_some());
        assert!(connection.is_type("802-11-wireless"));
        assert_eq!(connection.setting_ip4().unwrap().method.as_deref(), Some("auto"));
    }

    #[test]
    fn test_replace_settings_duplicate_strict() {
        let dict: ConnectionDict = vec![
            ("connection".into(), PropertyDict::new()),
            ("connection".into(), PropertyDict::new()),
        ];
        let mut connection = Connection::new();
        let err = connection
            .replace_settings(&dict, ParseFlags::STRICT)
            .unwrap_err();
        assert_eq!(
            err,
            Error::invalid_setting("connection", "duplicate setting name")
        );
    }

    #[test]
    fn test_replace_settings_duplicate_last_wins() {
        let mut first = PropertyDict::new();
        wire::push(&mut first, "id", wire::owned("first"));
        let mut second = PropertyDict::new();
        wire::push(&mut second, "id", wire::owned("second"));
        let dict: ConnectionDict = vec![
            ("connection".into(), first),
            ("connection".into(), second),
        ];
        let mut connection = Connection::new();
        assert!(connection.replace_settings(&dict, ParseFlags::empty()).unwrap());
        assert_eq!(connection.id(), Some("second"));
    }

    #[test]
    fn test_replace_settings_unknown_name() {
        let dict: ConnectionDict = vec![("flux-capacitor".into(), PropertyDict::new())];
        let mut connection = Connection::new();
        assert!(connection
            .replace_settings(&dict, ParseFlags::STRICT)
            .is_err());
        assert!(connection
            .replace_settings(&dict, ParseFlags::empty())
            .is_err());
        // Best effort skips it.
        assert!(connection
            .replace_settings(&dict, ParseFlags::BEST_EFFORT)
            .unwrap());
        assert!(!connection.has_setting(SettingKind::Connection));
    }

    #[test]
    fn test_replace_settings_flag_exclusion() {
        let mut connection = Connection::new();
        let err = connection
            .replace_settings(&ConnectionDict::new(), ParseFlags::STRICT | ParseFlags::BEST_EFFORT)
            .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_verify_hard_failure_stops() {
        let mut connection = wifi_connection();
        if let Some(Setting::Wireless(wifi)) = connection.setting_mut(SettingKind::Wireless) {
            wifi.ssid = Vec::new();
        }
        let result = connection.verify();
        assert!(result.is_failure());
        assert!(result
            .error()
            .unwrap()
            .to_string()
            .contains("802-11-wireless.ssid"));
    }

    #[test]
    fn test_normalize_on_valid_connection_is_noop() {
        let mut connection = wifi_connection();
        assert_eq!(connection.normalize().unwrap(), false);
    }

    #[test]
    fn test_normalize_on_hard_failure_returns_error() {
        let mut connection = wifi_connection();
        if let Some(Setting::Wireless(wifi)) = connection.setting_mut(SettingKind::Wireless) {
            wifi.ssid = vec![0u8; 40];
        }
        assert!(connection.normalize().is_err());
    }

    #[test]
    fn test_compare_and_diff_self() {
        let connection = wifi_connection();
        assert!(connection.compare(&connection.clone(), CompareFlags::EXACT));
        assert!(connection.diff(&connection.clone(), CompareFlags::EXACT).is_none());
    }

    #[test]
    fn test_diff_extra_dns_server() {
        let a = {
            let mut c = wifi_connection();
            if let Some(Setting::Ipv4(ip4)) = c.setting_mut(SettingKind::Ipv4) {
                ip4.dns = vec!["1.1.1.1".into()];
            }
            c
        };
        let mut b = a.clone();
        if let Some(Setting::Ipv4(ip4)) = b.setting_mut(SettingKind::Ipv4) {
            ip4.dns.clear();
        }
        assert!(!a.compare(&b, CompareFlags::EXACT));
        let diff = a.diff(&b, CompareFlags::EXACT).unwrap();
        assert_eq!(diff.len(), 1);
        let ipv4 = diff.get("ipv4").unwrap();
        assert_eq!(ipv4.get("dns"), Some(&DiffKind::IN_A));
    }

    #[test]
    fn test_diff_missing_setting_reports_side() {
        let a = wifi_connection();
        let mut b = a.clone();
        b.remove_setting(SettingKind::Proxy);
        let diff = a.diff(&b, CompareFlags::EXACT).unwrap();
        let proxy = diff.get("proxy").unwrap();
        assert_eq!(proxy.get("name"), Some(&DiffKind::IN_A));
        let diff = b.diff(&a, CompareFlags::EXACT).unwrap();
        assert_eq!(diff.get("proxy").unwrap().get("name"), Some(&DiffKind::IN_B));
    }

    #[test]
    fn test_dbus_round_trip() {
        let mut connection = wifi_connection();
        if let Some(Setting::Ipv4(ip4)) = connection.setting_mut(SettingKind::Ipv4) {
            ip4.dns = vec!["9.9.9.9".into()];
            ip4.routing_rules = vec![crate::ip::RoutingRule::from_string(
                "priority 10 from 10.0.0.0/24 table 50",
            )
            .unwrap()];
        }
        assert!(connection.verify().is_success());
        let dict = connection.to_dbus(ToWireOptions::All);
        let back = Connection::from_dbus(&dict, ParseFlags::STRICT).unwrap();
        assert!(connection.compare(&back, CompareFlags::EXACT));
    }

    #[test]
    fn test_update_secrets_single_setting() {
        let mut connection = wifi_connection();
        let mut sec = WirelessSecuritySetting::default();
        sec.key_mgmt = Some("wpa-psk".into());
        connection.add_setting(Setting::WirelessSecurity(sec));

        let mut props = PropertyDict::new();
        wire::push(&mut props, "psk", wire::owned("hunter22"));
        let payload: ConnectionDict = vec![("802-11-wireless-security".into(), props)];

        let changed = connection
            .update_secrets(Some("802-11-wireless-security"), &payload)
            .unwrap();
        assert!(changed);
        // Applying the same payload again changes nothing.
        let changed = connection
            .update_secrets(Some("802-11-wireless-security"), &payload)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_update_secrets_full_mode_checks_up_front() {
        let mut connection = wifi_connection();
        let mut props = PropertyDict::new();
        wire::push(&mut props, "psk", wire::owned("hunter22"));
        // The security setting is absent, so the whole call fails and
        // nothing is applied.
        let payload: ConnectionDict = vec![("802-11-wireless-security".into(), props)];
        let err = connection.update_secrets(None, &payload).unwrap_err();
        assert_eq!(err, Error::SettingNotFound("802-11-wireless-security".into()));
    }

    #[test]
    fn test_update_secrets_full_mode_collects_errors() {
        let mut connection = wifi_connection();
        let mut sec = WirelessSecuritySetting::default();
        sec.key_mgmt = Some("wpa-psk".into());
        connection.add_setting(Setting::WirelessSecurity(sec));
        connection.add_setting(Setting::Gsm(GsmSetting::default()));

        // The gsm secret has the wrong type and fails; the psk is still
        // applied and the first error is surfaced.
        let mut bad = PropertyDict::new();
        wire::push(&mut bad, "password", wire::owned(7u32));
        let mut good = PropertyDict::new();
        wire::push(&mut good, "psk", wire::owned("hunter22"));
        let payload: ConnectionDict =
            vec![("gsm".into(), bad), ("802-11-wireless-security".into(), good)];

        let err = connection.update_secrets(None, &payload).unwrap_err();
        assert!(err.to_string().contains("gsm.password"));
        match connection.setting(SettingKind::WirelessSecurity) {
            Some(Setting::WirelessSecurity(s)) => {
                assert_eq!(s.psk.as_deref(), Some("hunter22"));
            }
            _ => panic!("missing security setting"),
        }
    }

    #[test]
    fn test_need_secrets_priority_order() {
        let mut connection = wifi_connection();
        let mut sec = WirelessSecuritySetting::default();
        sec.key_mgmt = Some("wpa-psk".into());
        connection.add_setting(Setting::WirelessSecurity(sec));
        let (setting, hints) = connection.need_secrets(false).unwrap();
        assert_eq!(setting, "802-11-wireless-security");
        assert_eq!(hints, vec!["psk"]);
    }

    #[test]
    fn test_clear_secrets_by_flags() {
        let mut connection = wifi_connection();
        let mut sec = WirelessSecuritySetting::default();
        sec.key_mgmt = Some("wpa-psk".into());
        sec.psk = Some("hunter22".into());
        sec.psk_flags = SecretFlags::AGENT_OWNED;
        connection.add_setting(Setting::WirelessSecurity(sec));

        // Keeping agent-owned secrets leaves the psk alone.
        assert!(!connection.clear_secrets_by_flags(SecretFlags::AGENT_OWNED));
        // Keeping only system-owned secrets clears it.
        assert!(connection.clear_secrets_by_flags(SecretFlags::NONE));
        assert!(connection.need_secrets(false).is_some());
        // Nothing left to clear.
        assert!(!connection.clear_secrets());
    }
}
