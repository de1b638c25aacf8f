// Network Manager - Flag Words
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Bit-flag words used across the connection model: wire parsing,
//! comparison/diffing, and per-secret storage policy.

use bitflags::bitflags;

bitflags! {
    /// Flags controlling how wire dictionaries are parsed.
    ///
    /// `STRICT` and `BEST_EFFORT` are mutually exclusive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParseFlags: u32 {
        /// Reject unknown settings, unknown properties and duplicates.
        const STRICT = 0x1;
        /// Silently skip entries that cannot be parsed.
        const BEST_EFFORT = 0x2;
        /// Normalize the connection after a successful parse.
        const NORMALIZE = 0x4;
    }
}

impl ParseFlags {
    /// Check the STRICT/BEST_EFFORT exclusion.
    pub fn is_valid(self) -> bool {
        !self.contains(ParseFlags::STRICT | ParseFlags::BEST_EFFORT)
    }
}

bitflags! {
    /// Flags controlling comparison and diffing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompareFlags: u32 {
        /// Ignore the connection id property.
        const IGNORE_ID = 0x1;
        /// Ignore all secret-valued properties.
        const IGNORE_SECRETS = 0x2;
        /// Ignore the connection timestamp property.
        const IGNORE_TIMESTAMP = 0x4;
    }
}

impl CompareFlags {
    /// Exact comparison: no property is ignored.
    pub const EXACT: CompareFlags = CompareFlags::empty();
}

bitflags! {
    /// Per-property result of a diff: which side carries the property
    /// (or a differing value for it).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
    pub struct DiffKind: u32 {
        /// Present (or different) in the first connection.
        const IN_A = 0x1;
        /// Present (or different) in the second connection.
        const IN_B = 0x2;
    }
}

bitflags! {
    /// Storage policy attached to each secret property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SecretFlags: u32 {
        /// A user-session secret agent owns the secret.
        const AGENT_OWNED = 0x1;
        /// The secret is queried each time, never saved.
        const NOT_SAVED = 0x2;
        /// The secret is not required for the connection to work.
        const NOT_REQUIRED = 0x4;
    }
}

impl SecretFlags {
    /// System-owned storage: no special handling.
    pub const NONE: SecretFlags = SecretFlags::empty();
}

/// Options controlling wire serialization of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToWireOptions {
    /// Serialize every property, secrets included.
    #[default]
    All,
    /// Serialize everything except secret-valued properties.
    NoSecrets,
    /// Serialize only secret-valued properties.
    OnlySecrets,
}

impl ToWireOptions {
    pub fn includes_secrets(self) -> bool {
        !matches!(self, Self::NoSecrets)
    }

    pub fn includes_plain(self) -> bool {
        !matches!(self, Self::OnlySecrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_exclusion() {
        assert!(ParseFlags::empty().is_valid());
        assert!(ParseFlags::STRICT.is_valid());
        assert!((ParseFlags::BEST_EFFORT | ParseFlags::NORMALIZE).is_valid());
        assert!(!(ParseFlags::STRICT | ParseFlags::BEST_EFFORT).is_valid());
    }

    #[test]
    fn test_secret_flags_none_is_empty() {
        assert_eq!(SecretFlags::NONE, SecretFlags::empty());
        assert!(SecretFlags::AGENT_OWNED.intersects(SecretFlags::AGENT_OWNED));
    }
}
