// Network Manager - IP Value Types
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Embedded IP value types: addresses, routes, and policy routing rules.
//!
//! These are independent value objects with string, binary, and wire
//! (dictionary) encodings plus domain validation. Settings embed them;
//! they never reference their owner.

pub mod address;
pub mod route;
pub mod rule;

pub use address::IpAddress;
pub use route::IpRoute;
pub use rule::RoutingRule;

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Address family of an IP value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl Family {
    /// Maximum prefix length for the family (32 / 128).
    pub fn max_prefix(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// Kernel address-family constant (`AF_INET` / `AF_INET6`).
    pub fn af(self) -> i32 {
        match self {
            Self::V4 => 2,
            Self::V6 => 10,
        }
    }

    /// Family of a parsed address.
    pub fn of(addr: &IpAddr) -> Self {
        if addr.is_ipv4() {
            Self::V4
        } else {
            Self::V6
        }
    }

    /// Inverse of [`af`](Self::af).
    pub fn from_af(af: i32) -> Option<Self> {
        match af {
            2 => Some(Self::V4),
            10 => Some(Self::V6),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V4 => "ipv4",
            Self::V6 => "ipv6",
        }
    }
}

/// Parse an address string, requiring it to belong to `family`.
pub(crate) fn parse_addr(family: Family, s: &str) -> Option<IpAddr> {
    let addr: IpAddr = s.trim().parse().ok()?;
    (Family::of(&addr) == family).then_some(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_bounds() {
        assert_eq!(Family::V4.max_prefix(), 32);
        assert_eq!(Family::V6.max_prefix(), 128);
        assert_eq!(Family::from_af(2), Some(Family::V4));
        assert_eq!(Family::from_af(10), Some(Family::V6));
        assert_eq!(Family::from_af(7), None);
    }

    #[test]
    fn test_parse_addr_family_check() {
        assert!(parse_addr(Family::V4, "192.168.1.1").is_some());
        assert!(parse_addr(Family::V4, "fe80::1").is_none());
        assert!(parse_addr(Family::V6, "::1").is_some());
        assert!(parse_addr(Family::V6, "bogus").is_none());
    }
}
