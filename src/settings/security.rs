// Network Manager - Security Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `802-11-wireless-security` and `802-1x` settings, the two
//! security layers that carry Wi-Fi and port-authentication secrets.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, SecretFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::validate::is_printable_ascii;
use crate::wire::{self, PropertyDict, WireValue};

use super::SettingData;

const KEY_MGMT_VALUES: [&str; 6] = ["ieee8021x", "none", "owe", "sae", "wpa-eap", "wpa-psk"];
const AUTH_ALG_VALUES: [&str; 3] = ["leap", "open", "shared"];
const PROTO_VALUES: [&str; 2] = ["rsn", "wpa"];
const PAIRWISE_VALUES: [&str; 2] = ["ccmp", "tkip"];
const GROUP_VALUES: [&str; 4] = ["ccmp", "tkip", "wep104", "wep40"];

/// Key-management schemes that require a pre-shared key.
const PSK_KEY_MGMT: [&str; 2] = ["sae", "wpa-psk"];

fn check_values(
    setting: &str,
    property: &str,
    values: &[String],
    allowed: &[&str],
) -> Option<Error> {
    values
        .iter()
        .find(|v| !allowed.contains(&v.as_str()))
        .map(|v| Error::invalid_property(setting, property, format!("unknown value: {}", v)))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WirelessSecuritySetting {
    pub key_mgmt: Option<String>,
    pub auth_alg: Option<String>,
    pub proto: Vec<String>,
    pub pairwise: Vec<String>,
    pub group: Vec<String>,
    /// Pre-shared key; a secret.
    pub psk: Option<String>,
    pub psk_flags: SecretFlags,
}

impl WirelessSecuritySetting {
    pub const NAME: &'static str = "802-11-wireless-security";

    const PROPERTIES: [&'static str; 7] = [
        "auth-alg",
        "group",
        "key-mgmt",
        "pairwise",
        "proto",
        "psk",
        "psk-flags",
    ];

    fn psk_is_valid(psk: &str) -> bool {
        match psk.len() {
            64 => psk.chars().all(|c| c.is_ascii_hexdigit()),
            8..=63 => is_printable_ascii(psk),
            _ => false,
        }
    }

    fn requires_psk(&self) -> bool {
        self.key_mgmt
            .as_deref()
            .is_some_and(|k| PSK_KEY_MGMT.contains(&k))
    }
}

impl SettingData for WirelessSecuritySetting {
    fn kind(&self) -> SettingKind {
        SettingKind::WirelessSecurity
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        let Some(key_mgmt) = &self.key_mgmt else {
            return VerifyResult::Failure(Error::missing_property(Self::NAME, "key-mgmt"));
        };
        if !KEY_MGMT_VALUES.contains(&key_mgmt.as_str()) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "key-mgmt",
                format!("unknown value: {}", key_mgmt),
            ));
        }
        if let Some(auth_alg) = &self.auth_alg {
            if !AUTH_ALG_VALUES.contains(&auth_alg.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "auth-alg",
                    format!("unknown value: {}", auth_alg),
                ));
            }
        }
        for (property, values, allowed) in [
            ("proto", &self.proto, &PROTO_VALUES[..]),
            ("pairwise", &self.pairwise, &PAIRWISE_VALUES[..]),
            ("group", &self.group, &GROUP_VALUES[..]),
        ] {
            if let Some(err) = check_values(Self::NAME, property, values, allowed) {
                return VerifyResult::Failure(err);
            }
        }
        if let Some(psk) = &self.psk {
            if !Self::psk_is_valid(psk) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "psk",
                    "must be 8-63 printable characters or 64 hex digits",
                ));
            }
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(key_mgmt) = &self.key_mgmt {
                wire::push(&mut dict, "key-mgmt", wire::owned(key_mgmt.as_str()));
            }
            if let Some(auth_alg) = &self.auth_alg {
                wire::push(&mut dict, "auth-alg", wire::owned(auth_alg.as_str()));
            }
            if !self.proto.is_empty() {
                wire::push(&mut dict, "proto", wire::owned(self.proto.clone()));
            }
            if !self.pairwise.is_empty() {
                wire::push(&mut dict, "pairwise", wire::owned(self.pairwise.clone()));
            }
            if !self.group.is_empty() {
                wire::push(&mut dict, "group", wire::owned(self.group.clone()));
            }
            if self.psk_flags != SecretFlags::NONE {
                wire::push(&mut dict, "psk-flags", wire::owned(self.psk_flags.bits()));
            }
        }
        if options.includes_secrets() {
            if let Some(psk) = &self.psk {
                wire::push(&mut dict, "psk", wire::owned(psk.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.key_mgmt = wire::opt_str(n, dict, "key-mgmt")?;
        self.auth_alg = wire::opt_str(n, dict, "auth-alg")?;
        self.proto = wire::opt_string_list(n, dict, "proto")?.unwrap_or_default();
        self.pairwise = wire::opt_string_list(n, dict, "pairwise")?.unwrap_or_default();
        self.group = wire::opt_string_list(n, dict, "group")?.unwrap_or_default();
        self.psk = wire::opt_str(n, dict, "psk")?;
        self.psk_flags = wire::opt_u32(n, dict, "psk-flags")?
            .map(SecretFlags::from_bits_truncate)
            .unwrap_or(SecretFlags::NONE);
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["psk"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.psk_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "psk" && self.psk.is_some()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        name == "psk" && self.psk.take().is_some()
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "psk" {
            return Ok(false);
        }
        let psk: String = value
            .downcast_ref::<String>()
            .map_err(|_| Error::invalid_property(Self::NAME, name, "secret must be a string"))?;
        let changed = self.psk.as_deref() != Some(psk.as_str());
        self.psk = Some(psk);
        Ok(changed)
    }

    fn need_secrets(&self, check_rerequest: bool) -> Vec<&'static str> {
        if !self.requires_psk() || self.psk_flags.contains(SecretFlags::NOT_REQUIRED) {
            return Vec::new();
        }
        let missing = self.psk.is_none();
        let rerequest = check_rerequest && self.psk_flags.contains(SecretFlags::NOT_SAVED);
        if missing || rerequest {
            vec!["psk"]
        } else {
            Vec::new()
        }
    }
}

const EAP_METHODS: [&str; 7] = ["fast", "leap", "md5", "peap", "pwd", "tls", "ttls"];
const PHASE2_METHODS: [&str; 7] = ["chap", "gtc", "md5", "mschap", "mschapv2", "pap", "tls"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ieee8021xSetting {
    pub eap: Vec<String>,
    pub identity: Option<String>,
    pub anonymous_identity: Option<String>,
    pub domain_suffix_match: Option<String>,
    pub phase2_auth: Option<String>,
    /// Authentication password; a secret.
    pub password: Option<String>,
    pub password_flags: SecretFlags,
}

impl Ieee8021xSetting {
    pub const NAME: &'static str = "802-1x";

    const PROPERTIES: [&'static str; 7] = [
        "anonymous-identity",
        "domain-suffix-match",
        "eap",
        "identity",
        "password",
        "password-flags",
        "phase2-auth",
    ];

    /// String properties that normalization clears when empty.
    pub fn empty_clearable(&self) -> [(&'static str, bool); 3] {
        [
            ("identity", self.identity.as_deref() == Some("")),
            (
                "anonymous-identity",
                self.anonymous_identity.as_deref() == Some(""),
            ),
            (
                "domain-suffix-match",
                self.domain_suffix_match.as_deref() == Some(""),
            ),
        ]
    }
}

impl SettingData for Ieee8021xSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Ieee8021x
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        let mut result = VerifyResult::Success;

        if self.eap.is_empty() {
            return VerifyResult::Failure(Error::missing_property(Self::NAME, "eap"));
        }
        if let Some(err) = check_values(Self::NAME, "eap", &self.eap, &EAP_METHODS) {
            return VerifyResult::Failure(err);
        }
        if let Some(phase2) = &self.phase2_auth {
            if !PHASE2_METHODS.contains(&phase2.as_str()) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "phase2-auth",
                    format!("unknown value: {}", phase2),
                ));
            }
        }

        if self.empty_clearable().iter().any(|(_, empty)| *empty) {
            result = result.merge(VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "identity",
                "empty string properties must be unset",
            )));
        }

        result
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if !self.eap.is_empty() {
                wire::push(&mut dict, "eap", wire::owned(self.eap.clone()));
            }
            if let Some(identity) = &self.identity {
                wire::push(&mut dict, "identity", wire::owned(identity.as_str()));
            }
            if let Some(anon) = &self.anonymous_identity {
                wire::push(&mut dict, "anonymous-identity", wire::owned(anon.as_str()));
            }
            if let Some(domain) = &self.domain_suffix_match {
                wire::push(&mut dict, "domain-suffix-match", wire::owned(domain.as_str()));
            }
            if let Some(phase2) = &self.phase2_auth {
                wire::push(&mut dict, "phase2-auth", wire::owned(phase2.as_str()));
            }
            if self.password_flags != SecretFlags::NONE {
                wire::push(&mut dict, "password-flags", wire::owned(self.password_flags.bits()));
            }
        }
        if options.includes_secrets() {
            if let Some(password) = &self.password {
                wire::push(&mut dict, "password", wire::owned(password.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.eap = wire::opt_string_list(n, dict, "eap")?.unwrap_or_default();
        self.identity = wire::opt_str(n, dict, "identity")?;
        self.anonymous_identity = wire::opt_str(n, dict, "anonymous-identity")?;
        self.domain_suffix_match = wire::opt_str(n, dict, "domain-suffix-match")?;
        self.phase2_auth = wire::opt_str(n, dict, "phase2-auth")?;
        self.password = wire::opt_str(n, dict, "password")?;
        self.password_flags = wire::opt_u32(n, dict, "password-flags")?
            .map(SecretFlags::from_bits_truncate)
            .unwrap_or(SecretFlags::NONE);
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.password_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "password" && self.password.is_some()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        name == "password" && self.password.take().is_some()
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "password" {
            return Ok(false);
        }
        let password: String = value
            .downcast_ref::<String>()
            .map_err(|_| Error::invalid_property(Self::NAME, name, "secret must be a string"))?;
        let changed = self.password.as_deref() != Some(password.as_str());
        self.password = Some(password);
        Ok(changed)
    }

    fn need_secrets(&self, check_rerequest: bool) -> Vec<&'static str> {
        if self.password_flags.contains(SecretFlags::NOT_REQUIRED) {
            return Vec::new();
        }
        let missing = self.password.is_none();
        let rerequest = check_rerequest && self.password_flags.contains(SecretFlags::NOT_SAVED);
        if missing || rerequest {
            vec!["password"]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_key_mgmt_required() {
        let conn = Connection::new();
        let setting = WirelessSecuritySetting::default();
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_psk_validation() {
        assert!(WirelessSecuritySetting::psk_is_valid("hunter22"));
        assert!(WirelessSecuritySetting::psk_is_valid(&"a".repeat(63)));
        assert!(WirelessSecuritySetting::psk_is_valid(&"0f".repeat(32)));
        assert!(!WirelessSecuritySetting::psk_is_valid("short"));
        assert!(!WirelessSecuritySetting::psk_is_valid(&"zz".repeat(32)));
    }

    #[test]
    fn test_need_secrets_for_psk() {
        let mut setting = WirelessSecuritySetting {
            key_mgmt: Some("wpa-psk".into()),
            ..Default::default()
        };
        assert_eq!(setting.need_secrets(false), vec!["psk"]);
        setting.psk = Some("hunter22".into());
        assert!(setting.need_secrets(false).is_empty());
        // A never-saved secret is re-requested on demand.
        setting.psk_flags = SecretFlags::NOT_SAVED;
        assert_eq!(setting.need_secrets(true), vec!["psk"]);
        assert!(setting.need_secrets(false).is_empty());
        // An optional secret is never requested.
        setting.psk = None;
        setting.psk_flags = SecretFlags::NOT_REQUIRED;
        assert!(setting.need_secrets(false).is_empty());
    }

    #[test]
    fn test_8021x_empty_strings_normalizable() {
        let conn = Connection::new();
        let mut setting = Ieee8021xSetting {
            eap: vec!["peap".into()],
            identity: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
        setting.identity = Some("user@example.com".into());
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_secrets_skipped_without_secrets_option() {
        let setting = WirelessSecuritySetting {
            key_mgmt: Some("wpa-psk".into()),
            psk: Some("hunter22".into()),
            ..Default::default()
        };
        let full = setting.to_wire(ToWireOptions::All);
        assert!(wire::lookup(&full, "psk").is_some());
        let plain = setting.to_wire(ToWireOptions::NoSecrets);
        assert!(wire::lookup(&plain, "psk").is_none());
        let secret = setting.to_wire(ToWireOptions::OnlySecrets);
        assert_eq!(secret.len(), 1);
    }
}
