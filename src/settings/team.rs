// Network Manager - Team Settings
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `team` and `team-port` settings. Team configuration is an opaque
//! JSON blob handed to teamd; only well-formedness is checked here.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

fn verify_config(setting: &str, config: &Option<String>) -> VerifyResult {
    match config.as_deref() {
        None => VerifyResult::Success,
        Some("") => VerifyResult::Normalizable(Error::invalid_property(
            setting,
            "config",
            "empty config must be unset",
        )),
        Some(json) => match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) if value.is_object() => VerifyResult::Success,
            Ok(_) => VerifyResult::Failure(Error::invalid_property(
                setting,
                "config",
                "config must be a JSON object",
            )),
            Err(e) => VerifyResult::Failure(Error::invalid_property(
                setting,
                "config",
                format!("invalid JSON: {}", e),
            )),
        },
    }
}

fn config_to_wire(setting_config: &Option<String>, options: ToWireOptions) -> PropertyDict {
    let mut dict = PropertyDict::new();
    if options.includes_plain() {
        if let Some(config) = setting_config {
            wire::push(&mut dict, "config", wire::owned(config.as_str()));
        }
    }
    dict
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeamSetting {
    pub config: Option<String>,
}

impl TeamSetting {
    pub const NAME: &'static str = "team";

    const PROPERTIES: [&'static str; 1] = ["config"];
}

impl SettingData for TeamSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::Team
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        verify_config(Self::NAME, &self.config)
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        config_to_wire(&self.config, options)
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.config = wire::opt_str(Self::NAME, dict, "config")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeamPortSetting {
    pub config: Option<String>,
}

impl TeamPortSetting {
    pub const NAME: &'static str = "team-port";

    const PROPERTIES: [&'static str; 1] = ["config"];
}

impl SettingData for TeamPortSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::TeamPort
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        verify_config(Self::NAME, &self.config)
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        config_to_wire(&self.config, options)
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.config = wire::opt_str(Self::NAME, dict, "config")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_empty_config_is_normalizable() {
        let conn = Connection::new();
        let mut setting = TeamSetting::default();
        assert!(setting.verify(&conn).is_success());
        setting.config = Some(String::new());
        assert!(matches!(setting.verify(&conn), VerifyResult::Normalizable(_)));
    }

    #[test]
    fn test_config_must_be_json_object() {
        let conn = Connection::new();
        let mut setting = TeamPortSetting::default();
        setting.config = Some(r#"{"runner": {"name": "lacp"}}"#.into());
        assert!(setting.verify(&conn).is_success());
        setting.config = Some("[1, 2]".into());
        assert!(setting.verify(&conn).is_failure());
        setting.config = Some("not json".into());
        assert!(setting.verify(&conn).is_failure());
    }
}
