// Network Manager - Connection Model Library
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # Network Manager Connection Model
//!
//! This crate is the connection-profile data model shared by the GUI
//! application and the system daemon:
//!
//! - **Connection**: the aggregate profile owning at most one setting
//!   per kind, with verify/normalize/diff and the secrets lifecycle
//! - **Settings**: one typed property group per network technology or
//!   cross-cutting concern
//! - **Registry**: the static table of setting kinds, priorities and
//!   constructors
//! - **IP value types**: addresses, routes and policy routing rules
//!   with string, binary and D-Bus dict encodings
//! - **Wire codec**: the `a{sa{sv}}` dictionary format spoken over
//!   D-Bus
//! - **Error**: shared error types and the verification state machine
//!
//! ## Design Principles
//!
//! 1. **Pure data**: no I/O and no async anywhere; transports and
//!    kernel application live in the consuming daemon
//! 2. **Repairable**: loosely valid profiles are classified by
//!    `verify` and repaired by a fixed `normalize` pipeline
//! 3. **Canonical**: wire encodings omit defaults and round-trip
//!    bit-exactly for valid profiles
//! 4. **Explicit effects**: mutating operations return whether they
//!    changed anything; there are no observer callbacks

pub mod connection;
pub mod error;
pub mod flags;
pub mod ip;
mod normalize;
pub mod registry;
pub mod settings;
pub mod validate;
pub mod wire;

// Re-export main types for convenience
pub use connection::Connection;
pub use error::{Error, Result, VerifyResult};
pub use flags::{CompareFlags, DiffKind, ParseFlags, SecretFlags, ToWireOptions};
pub use ip::{Family, IpAddress, IpRoute, RoutingRule};
pub use registry::{SettingKind, SettingPriority};
pub use settings::{Setting, SettingData};
pub use wire::{ConnectionDict, PropertyDict, WireValue};

/// Crate version for compatibility checking.
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_surface_round_trip() {
        // The whole public pipeline in one breath: build, normalize,
        // serialize, decode, compare.
        let mut connection = Connection::new_simple("wired", "802-3-ethernet")
            .expect("known connection type");
        connection.normalize().expect("normalizable");
        assert!(connection.verify().is_success());

        let dict = connection.to_dbus(ToWireOptions::All);
        let decoded = Connection::from_dbus(&dict, ParseFlags::STRICT).expect("own output parses");
        assert!(connection.compare(&decoded, CompareFlags::EXACT));
        assert!(connection.diff(&decoded, CompareFlags::EXACT).is_none());
    }
}
