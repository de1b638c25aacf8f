// Network Manager - User Setting
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The `user` setting: free-form key/value annotations that travel
//! with the profile but mean nothing to the daemon.

use crate::connection::Connection;
use crate::error::{Error, Result, VerifyResult};
use crate::flags::{ParseFlags, ToWireOptions};
use crate::registry::SettingKind;
use crate::wire::{self, PropertyDict};

use super::SettingData;

const MAX_KEY_LENGTH: usize = 256;
const MAX_VALUE_LENGTH: usize = 8192;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserSetting {
    /// Annotation map, kept sorted by key.
    pub data: Vec<(String, String)>,
}

impl UserSetting {
    pub const NAME: &'static str = "user";

    const PROPERTIES: [&'static str; 1] = ["data"];
}

impl SettingData for UserSetting {
    fn kind(&self) -> SettingKind {
        SettingKind::User
    }

    fn known_properties(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn verify(&self, _connection: &Connection) -> VerifyResult {
        for (key, value) in &self.data {
            if key.is_empty() || key.len() > MAX_KEY_LENGTH {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "data",
                    format!("invalid key: {:?}", key),
                ));
            }
            if value.len() > MAX_VALUE_LENGTH {
                return VerifyResult::Failure(Error::invalid_property(
                    Self::NAME,
                    "data",
                    format!("value for '{}' too long", key),
                ));
            }
        }
        VerifyResult::Success
    }

    fn to_wire(&self, options: ToWireOptions) -> PropertyDict {
        let mut dict = PropertyDict::new();
        if options.includes_plain() && !self.data.is_empty() {
            wire::push(&mut dict, "data", wire::string_map_value(&self.data));
        }
        dict
    }

    fn update_from_wire(&mut self, dict: &PropertyDict, _flags: ParseFlags) -> Result<()> {
        self.data = wire::opt_string_map(Self::NAME, dict, "data")?.unwrap_or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    #[test]
    fn test_key_and_value_limits() {
        let conn = Connection::new();
        let mut setting = UserSetting::default();
        setting.data = vec![("org.example.tag".into(), "value".into())];
        assert!(setting.verify(&conn).is_success());
        setting.data = vec![(String::new(), "value".into())];
        assert!(setting.verify(&conn).is_failure());
        setting.data = vec![("key".into(), "v".repeat(MAX_VALUE_LENGTH + 1))];
        assert!(setting.verify(&conn).is_failure());
    }
}
