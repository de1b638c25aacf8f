// Network Manager - VPN Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `vpn` setting. Plugin-specific configuration is an opaque
//! string map; the secrets map travels separately.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, SecretFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict, WireValue};

use super::SettingData;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VpnSetting {
    /// D-Bus service name of the VPN plugin.
    pub service_type: Option<String>,
    pub user_name: Option<String>,
    /// Plugin configuration, kept sorted by key.
    pub data: Vec<(String, String)>,
    /// Plugin secrets, kept sorted by key.
    pub secrets: Vec<(String, String)>,
    pub secrets_flags: SecretFlags,
}

impl VpnSetting {
    pub const NAME: &'static str = "vpn";

    const PROPERTIES: [&'static str; 4] = ["data", "secrets", "service-type", "user-name"];
}

impl SettingData for VpnSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Vpn
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        match self.service_type.as_deref() {
            None | Some("") => {
                VerifyResult::Failure(Error::missing_property(Self::NAME, "service-type"))
            }
            Some(_) => VerifyResult::Success,
        }
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(service_type) = &self.service_type {
                wire::push(&mut dict, "service-type", wire::owned(service_type.as_str()));
            }
            if let Some(user_name) = &self.user_name {
                wire::push(&mut dict, "user-name", wire::owned(user_name.as_str()));
            }
            if !self.data.is_empty() {
                wire::push(&mut dict, "data", wire::string_map_value(&self.data));
            }
        }
        if options.includes_secrets() && !self.secrets.is_empty() {
            wire::push(&mut dict, "secrets", wire::string_map_value(&self.secrets));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.service_type = wire::opt_str(n, dict, "service-type")?;
        self.user_name = wire::opt_str(n, dict, "user-name")?;
        self.data = wire::opt_string_map(n, dict, "data")?.unwrap_or_default();
        self.secrets = wire::opt_string_map(n, dict, "secrets")?.unwrap_or_default();
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["secrets"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.secrets_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "secrets" && !self.secrets.is_empty()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        if name == "secrets" && !self.secrets.is_empty() {
            self.secrets.clear();
            true
        } else {
            false
        }
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "secrets" {
            return Ok(false);
        }
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "secrets", value.clone());
        let incoming = wire::opt_string_map(Self::NAME, &dict, "secrets")?
            .ok_or_else(|| Error::invalid_property(Self::NAME, name, "must be a string map"))?;
        let mut changed = false;
        for (key, val) in incoming {
            let existing = self.secrets.iter().position(|(k, _)| *k == key);
            match existing {
                Some(i) if self.secrets[i].1 == val => {}
                Some(i) => {
                    self.secrets[i].1 = val;
                    changed = true;
                }
                None => {
                    self.secrets.push((key, val));
                    changed = true;
                }
            }
        }
        self.secrets.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_service_type_required() {
        let conn = Connection::new();
        assert!(VpnSetting::default().verify(&conn).is_failure());
        let setting = VpnSetting {
            service_type: Some("org.freedesktop.NetworkManager.openvpn".into()),
            ..Default::default()
        };
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_set_secret_merges_map() {
        let mut setting = VpnSetting::default();
        setting.secrets = vec![("password".into(), "old".into())];
        let value = wire::string_map_value(&[("password".to_string(), "new".to_string())]);
        assert!(setting.set_secret("secrets", &value).unwrap());
        assert_eq!(setting.secrets, vec![("password".to_string(), "new".to_string())]);
        // Idempotent on second application.
        assert!(!setting.set_secret("secrets", &value).unwrap());
    }
}
