// Network Manager - MACsec Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `macsec` setting.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, SecretFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict, WireValue};

use super::SettingData;

/// MKA CAK length in hex characters.
pub const CAK_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct MacsecSetting {
    /// `psk` or `eap`.
    pub mode: Option<String>,
    /// MKA connectivity association key; a secret.
    pub mka_cak: Option<String>,
    pub mka_cak_flags: SecretFlags,
    /// MKA connectivity association key name.
    pub mka_ckn: Option<String>,
    pub parent: Option<String>,
    pub port: u32,
    pub encrypt: bool,
}

impl Default for MacsecSetting {
    fn default() -> Self {
        Self {
            mode: None,
            mka_cak: None,
            mka_cak_flags: SecretFlags::NONE,
            mka_ckn: None,
            parent: None,
            port: 1,
            encrypt: true,
        }
    }
}

impl MacsecSetting {
    pub const NAME: &'static str = "macsec";

    const PROPERTIES: [&'static str; 7] = [
        "encrypt",
        "mka-cak",
        "mka-cak-flags",
        "mka-ckn",
        "mode",
        "parent",
        "port",
    ];

    pub fn is_psk_mode(&self) -> bool {
        self.mode.as_deref() == Some("psk")
    }
}

impl SettingData for MacsecSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Macsec
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        match self.mode.as_deref() {
            None => {
                return VerifyResult::Failure(Error::missing_property(Self::NAME, "mode"));
            }
            Some("psk") | Some("eap") => {}
            Some(other) => {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "mode",
                    format!("unknown mode: {}", other),
                ));
            }
        }

        if self.parent.is_none() {
            return VerifyResult::Failure(Error::missing_property(Self::NAME, "parent"));
        }
        if !(1..=65534).contains(&self.port) {
            return VerifyResult::Failure(Error::invalid_property(
                Self::NAME,
                "port",
                "out of range [1, 65534]",
            ));
        }

        if self.is_psk_mode() {
            if self.mka_ckn.is_none() {
                return VerifyResult::Failure(Error::missing_property(Self::NAME, "mka-ckn"));
            }
            if let Some(cak) = &self.mka_cak {
                if cak.len() != CAK_LENGTH || !cak.chars().all(|c| c.is_ascii_hexdigit()) {
                    return VerifyResult::Failure(Error::invalid_property(
                        Self::NAME,
                        "mka-cak",
                        "must be 32 hex characters",
                    ));
                }
            }
        } else if self.mka_cak.is_some() {
            // A stale PSK secret on an EAP connection gets cleared.
            return VerifyResult::Normalizable(Error::invalid_property(
                Self::NAME,
                "mka-cak",
                "only used in psk mode",
            ));
        }

        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() {
            if let Some(mode) = &self.mode {
                wire::push(&mut dict, "mode", wire::owned(mode.as_str()));
            }
            if self.mka_cak_flags != SecretFlags::NONE {
                wire::push(&mut dict, "mka-cak-flags", wire::owned(self.mka_cak_flags.bits()));
            }
            if let Some(ckn) = &self.mka_ckn {
                wire::push(&mut dict, "mka-ckn", wire::owned(ckn.as_str()));
            }
            if let Some(parent) = &self.parent {
                wire::push(&mut dict, "parent", wire::owned(parent.as_str()));
            }
            if self.port != 1 {
                wire::push(&mut dict, "port", wire::owned(self.port));
            }
            if !self.encrypt {
                wire::push(&mut dict, "encrypt", wire::owned(false));
            }
        }
        if options.includes_secrets() {
            if let Some(cak) = &self.mka_cak {
                wire::push(&mut dict, "mka-cak", wire::owned(cak.as_str()));
            }
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        let n = Self::NAME;
        self.mode = wire::opt_str(n, dict, "mode")?;
        self.mka_cak = wire::opt_str(n, dict, "mka-cak")?;
        self.mka_cak_flags = wire::opt_u32(n, dict, "mka-cak-flags")?
            .map(SecretFlags::from_bits_truncate)
            .unwrap_or(SecretFlags::NONE);
        self.mka_ckn = wire::opt_str(n, dict, "mka-ckn")?;
        self.parent = wire::opt_str(n, dict, "parent")?;
        self.port = wire::opt_u32(n, dict, "port")?.unwrap_or(1);
        self.encrypt = wire::opt_bool(n, dict, "encrypt")?.unwrap_or(true);
        Ok(())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["mka-cak"]
    }

    fn secret_flags(&self, _name: &str) -> SecretFlags {
        self.mka_cak_flags
    }

    fn has_secret(&self, name: &str) -> bool {
        name == "mka-cak" && self.mka_cak.is_some()
    }

    fn clear_secret(&mut self, name: &str) -> bool {
        name == "mka-cak" && self.mka_cak.take().is_some()
    }

    fn set_secret(&mut self, name: &str, value: &WireValue) -> Result<bool> {
        if name != "mka-cak" {
            return Ok(false);
        }
        let cak: String = value
            .downcast_ref::<String>()
            .map_err(|_| Error::invalid_property(Self::NAME, name, "secret must be a string"))?;
        let changed = self.mka_cak.as_deref() != Some(cak.as_str());
        self.mka_cak = Some(cak);
        Ok(changed)
    }

    fn need_secrets(&self, check_rerequest: bool) -> Vec<&'static str> {
        if !self.is_psk_mode() || self.mka_cak_flags.contains(SecretFlags::NOT_REQUIRED) {
            return Vec::new();
        }
        let missing = self.mka_cak.is_none();
        let rerequest = check_rerequest && self.mka_cak_flags.contains(SecretFlags::NOT_SAVED);
        if missing || rerequest {
            vec!["mka-cak"]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    fn psk() -> MacsecSetting {
        MacsecSetting {
            mode: Some("psk".into()),
            mka_ckn: Some("6162".into()),
            parent: Some("eth0".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_psk_mode_requirements() {
        let conn = Connection::new();
        assert!(psk().verify(&conn).is_success());
        let mut setting = psk();
        setting.mka_ckn = None;
        assert!(setting.verify(&conn).is_failure());
        setting = psk();
        setting.mka_cak = Some("tooshort".into());
        assert!(setting.verify(&conn).is_failure());
        setting.mka_cak = Some("00112233445566778899aabbccddeeff".into());
        assert!(setting.verify(&conn).is_success());
    }

    #[test]
    fn test_eap_mode_with_cak_is_normalizable() {
        let conn = Connection::new();
        let mut setting = psk();
        setting.mode = Some("eap".into());
        setting.mka_cak = Some("00112233445566778899aabbccddeeff".into());
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_need_secrets() {
        let setting = psk();
        assert_eq!(setting.need_secrets(false), vec!["mka-cak"]);
        let mut with_cak = psk();
        with_cak.mka_cak = Some("00112233445566778899aabbccddeeff".into());
        assert!(with_cak.need_secrets(false).is_empty());
    }
}
