// Network Manager - WireGuard Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `wireguard` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, SecretFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict, WireValue};

use super::SettingData;

/// Length of a base64-encoded Curve25519 key.
const KEY_LENGTH: usize = 44;

fn key_is_valid(key: &str) -> bool {
    key.len() == KEY_LENGTH
        && key.ends_with('=')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WireguardPeer {
    pub public_key: String,
    pub endpoint: Option<String>,
    pub allowed_ips: Vec<String>,
}

impl WireguardPeer {
    fn to_wire(&self) -> PropertyDict {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "public-key", wire::owned(self.public_key.as_str()));
        if let Some(endpoint) = &self.endpoint {
            wire::push(&mut dict, "endpoint", wire::owned(endpoint.as_str()));
        }
        if !self.allowed_ips.is_empty() {
            wire::push(&mut dict, "allowed-ips", wire::owned(self.allowed_ips.clone()));
        }
        dict
    }

    fn from_wire(setting: &str, dict: &PropertyDict) -> Result<Self> {
        Ok(Self {
            public_key: wire::req_str(setting, dict, "public-key")?,
            endpoint: wire::opt_str(setting, dict, "endpoint")?,
            allowed_ips: wire::opt_string_list(setting, dict, "allowed-ips")?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WireguardSetting {
    /// Interface private key; a secret.
    pub private_key: Option<String>,
    pub private_key_flags: SecretFlags,
    pub listen_port: u32,
    pub fwmark: u32,
    pub peers: Vec<WireguardPeer>,
}

impl WireguardSetting {
    pub const NAME: &'static str = "wireguard";

    const PROPERTIES: [&'static str; 5] = [
        "fwmark",
        "listen-port",
        "peers",
        "private-key",
        "private-key-flags",
    ];
}

impl SettingData for WireguardSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Wireguard
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        if let Some(key) = &self.private_key {
            if !key_is_valid(key) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "private-key",
                    "not a valid base64 key",
                ));
            }
        }
        if self.listen_port > 65535 {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "listen-port",
                "out of range [0, 65535]",
            ));
        }
        for peer in &self.peers {
            if !key_is_valid(&peer.public_key) {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "peers",
                    format!("invalid public key: {}", peer.public_key),
                ));
            }
            for allowed in &peer.allowed_ips {
                let (addr, prefix) = allowed.split_once('/').unwrap_or((allowed.as_str(), ""));
                let addr_ok = addr.parse::<std::net::IpAddr>().is_ok();
                let prefix_ok = prefix.is_empty() || prefix.parse::<u8>().map_or(false, |p| p <= 128);
                if !addr_ok || !prefix_ok {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        "peers",
                        format!("invalid allowed-ip: {}", allowed),
                    ));
                }
            }
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if self.private_key_flags != SecretFlags::NONE {
                wire::push(
                    &mut dict,
                    "private-key-flags",
                    wire::owned(self.private_key_flags.bits()),
                );
            }
            if self.listen_port != 0 {
                wire::push(&mut dict, "listen-port", wire::owned(self.listen_port));
            }
            if self.fwmark != 0 {
                wire::push(&mut dict, "fwmark", wire::owned(self.fwmark));
            }
            if !self.peers.is_empty() {
                let data: Vec<PropertyDict> =
                    self.peers.iter().map(WireguardPeer::to_wire).collect();
                wire::push(&mut dict, "peers", wire::dict_array_value(&data));
            }
        }
        if options.includes_secrets() {
            if let Some(key) = &self.private_key {
                wire::push(&mut dict, "private-key", wire::owned(key.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.private_key = wire::opt_str(n, dict, "private-key")?;
        self.private_key_flags = wire::opt_u32(n, dict, "private-key-flags")?
            .map(SecretFlags::from_bits_truncate)
            .unwrap_or(SecretFlags::NONE);
        self.listen_port = wire::opt_u32(n, dict, "listen-port")?.unwrap_or(0);
        self.fwmark = wire::opt_u32(n, dict, "fwmark")?.unwrap_or(0);
        self.peers = match wire::opt_dict_array(n, dict, "peers")? {
            None => Vec::new(),
            Some(dicts) => dicts
                .iter()
                .map(|d| WireguardPeer::from_wire(n, d))
                .collect::<Result<_>>()?,
        };
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["private-key"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.private_key_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "private-key" && self.private_key.is_some()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        name == "private-key" && self.private_key.take().is_some()
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "private-key" {
            return Ok(false);
        }
        let key: String = value
            .downcast_ref::<String>()
            .map_err(|_| Error::invalid_property(Self::NAME, name, "secret must be a string"))?;
        let changed = self.private_key.as_deref() != Some(key.as_str());
        self.private_key = Some(key);
        Ok(changed)
    }

    fn need_secrets(&self, check_rerequest: bool) -> Vec<&'static str> {
        if self.private_key_flags.contains(SecretFlags::NOT_REQUIRED) {
            return Vec::new();
        }
        let missing = self.private_key.is_none();
        let rerequest =
            check_rerequest && self.private_key_flags.contains(SecretFlags::NOT_SAVED);
        if missing || rerequest {
            vec!["private-key"]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    const KEY: &str = "YAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";

    #[test]
    fn test_key_validation() {
        assert!(key_is_valid(KEY));
        assert!(!key_is_valid("tooshort"));
        assert!(!key_is_valid(&"a".repeat(44)));
    }

    #[test]
    fn test_peer_validation() {
        let conn = Connection::new();
        let mut setting = WireguardSetting::default();
        setting.peers.push(WireguardPeer {
            public_key: KEY.into(),
            endpoint: Some("vpn.example.com:51820".into()),
            allowed_ips: vec!["10.0.0.0/24".into()],
        });
        assert!(setting.verify(&conn).is_success());
        setting.peers[0].allowed_ips.push("not-an-ip".into());
        assert!(setting.verify(&conn).is_failure());
    }

    #[test]
    fn test_need_secrets() {
        let setting = WireguardSetting::default();
        assert_eq!(setting.need_secrets(false), vec!["private-key"]);
    }
}
