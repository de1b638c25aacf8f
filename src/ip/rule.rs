// Network Manager - Policy Routing Rule Value Type
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Policy routing rule value type.
//!
//! A rule exists in three synchronized representations:
//! - the struct itself,
//! - a strongly typed wire dictionary (the `routing-rules` array elements
//!   on the IP-config settings),
//! - an iproute2-like token string used by CLI and text files.
//!
//! Rules are plain value objects until [`seal`](RoutingRule::seal)ed;
//! a sealed rule is immutable and must be cloned to be edited (cloning
//! always yields an unsealed copy).

use std::net::IpAddr;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::flags::ParseFlags;
use crate::validate::is_valid_ifname;
use crate::wire::{self, PropertyDict};

use super::Family;

/// Rule action: look the packet up in a routing table.
pub const RULE_ACTION_TO_TABLE: u8 = 1;
/// Rule action: silently drop.
pub const RULE_ACTION_BLACKHOLE: u8 = 6;
/// Rule action: drop with "network unreachable".
pub const RULE_ACTION_UNREACHABLE: u8 = 7;
/// Rule action: drop with "administratively prohibited".
pub const RULE_ACTION_PROHIBIT: u8 = 8;

/// Parse-only action token; never passes validation.
const ACTION_THROW: u8 = 9;

const SETTING: &str = "routing-rule";

/// Wire attribute value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireKind {
    Bool,
    Byte,
    U16,
    U32,
    I32,
    Str,
}

/// The fixed wire attribute table, sorted by name for binary search.
const WIRE_ATTRS: [(&str, WireKind); 22] = [
    ("action", WireKind::Byte),
    ("dport-end", WireKind::U16),
    ("dport-start", WireKind::U16),
    ("family", WireKind::I32),
    ("from", WireKind::Str),
    ("from-len", WireKind::Byte),
    ("fwmark", WireKind::U32),
    ("fwmask", WireKind::U32),
    ("iifname", WireKind::Str),
    ("invert", WireKind::Bool),
    ("ipproto", WireKind::Byte),
    ("oifname", WireKind::Str),
    ("priority", WireKind::U32),
    ("sport-end", WireKind::U16),
    ("sport-start", WireKind::U16),
    ("suppress-prefixlength", WireKind::I32),
    ("table", WireKind::U32),
    ("to", WireKind::Str),
    ("to-len", WireKind::Byte),
    ("tos", WireKind::Byte),
    ("uid-range-end", WireKind::U32),
    ("uid-range-start", WireKind::U32),
];

fn wire_attr(name: &str) -> Option<WireKind> {
    WIRE_ATTRS
        .binary_search_by(|(n, _)| (*n).cmp(name))
        .ok()
        .map(|i| WIRE_ATTRS[i].1)
}

/// A `from`/`to` selector: either a valid binary address with prefix
/// length, or an unparsed string kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Default)]
struct Endpoint {
    addr: Option<IpAddr>,
    unparsed: Option<String>,
    len: u8,
}

impl Endpoint {
    fn is_empty(&self) -> bool {
        self.addr.is_none() && self.unparsed.is_none()
    }

    fn text(&self) -> Option<String> {
        if let Some(addr) = &self.addr {
            Some(addr.to_string())
        } else {
            self.unparsed.clone()
        }
    }
}

/// A policy routing rule.
#[derive(Debug)]
pub struct RoutingRule {
    sealed: bool,
    family: Family,
    invert: bool,
    priority: Option<u32>,
    tos: u8,
    ipproto: u8,
    fwmark: u32,
    fwmask: u32,
    sport_start: u16,
    sport_end: u16,
    dport_start: u16,
    dport_end: u16,
    uid_range: Option<(u32, u32)>,
    from: Endpoint,
    to: Endpoint,
    iifname: Option<String>,
    oifname: Option<String>,
    action: u8,
    table: u32,
    suppress_prefixlength: Option<i32>,
}

// Cloning always yields a mutable copy; seal status is an ownership
// property, not part of the rule's value.
impl Clone for RoutingRule {
    fn clone(&self) -> Self {
        Self {
            sealed: false,
            family: self.family,
            invert: self.invert,
            priority: self.priority,
            tos: self.tos,
            ipproto: self.ipproto,
            fwmark: self.fwmark,
            fwmask: self.fwmask,
            sport_start: self.sport_start,
            sport_end: self.sport_end,
            dport_start: self.dport_start,
            dport_end: self.dport_end,
            uid_range: self.uid_range,
            from: self.from.clone(),
            to: self.to.clone(),
            iifname: self.iifname.clone(),
            oifname: self.oifname.clone(),
            action: self.action,
            table: self.table,
            suppress_prefixlength: self.suppress_prefixlength,
        }
    }
}

impl PartialEq for RoutingRule {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family
            && self.invert == other.invert
            && self.priority == other.priority
            && self.tos == other.tos
            && self.ipproto == other.ipproto
            && self.fwmark == other.fwmark
            && self.fwmask == other.fwmask
            && self.sport_start == other.sport_start
            && self.sport_end == other.sport_end
            && self.dport_start == other.dport_start
            && self.dport_end == other.dport_end
            && self.uid_range == other.uid_range
            && self.from == other.from
            && self.to == other.to
            && self.iifname == other.iifname
            && self.oifname == other.oifname
            && self.action == other.action
            && self.table == other.table
            && self.suppress_prefixlength == other.suppress_prefixlength
    }
}

impl RoutingRule {
    /// Create an empty rule for the given family.
    pub fn new(family: Family) -> Self {
        Self {
            sealed: false,
            family,
            invert: false,
            priority: None,
            tos: 0,
            ipproto: 0,
            fwmark: 0,
            fwmask: 0,
            sport_start: 0,
            sport_end: 0,
            dport_start: 0,
            dport_end: 0,
            uid_range: None,
            from: Endpoint::default(),
            to: Endpoint::default(),
            iifname: None,
            oifname: None,
            action: RULE_ACTION_TO_TABLE,
            table: 0,
            suppress_prefixlength: None,
        }
    }

    /// Seal the rule; after this every setter is a programming error.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn assert_mutable(&self) {
        assert!(!self.sealed, "attempt to modify a sealed routing rule");
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Option<u32>) {
        self.assert_mutable();
        self.priority = priority;
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.assert_mutable();
        self.invert = invert;
    }

    pub fn tos(&self) -> u8 {
        self.tos
    }

    pub fn set_tos(&mut self, tos: u8) {
        self.assert_mutable();
        self.tos = tos;
    }

    pub fn ipproto(&self) -> u8 {
        self.ipproto
    }

    pub fn set_ipproto(&mut self, ipproto: u8) {
        self.assert_mutable();
        self.ipproto = ipproto;
    }

    pub fn fwmark(&self) -> (u32, u32) {
        (self.fwmark, self.fwmask)
    }

    pub fn set_fwmark(&mut self, fwmark: u32, fwmask: u32) {
        self.assert_mutable();
        self.fwmark = fwmark;
        self.fwmask = fwmask;
    }

    /// Source port range; `(0, 0)` means unset.
    pub fn source_port(&self) -> (u16, u16) {
        (self.sport_start, self.sport_end)
    }

    pub fn set_source_port(&mut self, start: u16, end: u16) {
        self.assert_mutable();
        self.sport_start = start;
        self.sport_end = end;
    }

    /// Destination port range; `(0, 0)` means unset.
    pub fn destination_port(&self) -> (u16, u16) {
        (self.dport_start, self.dport_end)
    }

    pub fn set_destination_port(&mut self, start: u16, end: u16) {
        self.assert_mutable();
        self.dport_start = start;
        self.dport_end = end;
    }

    pub fn uid_range(&self) -> Option<(u32, u32)> {
        self.uid_range
    }

    pub fn set_uid_range(&mut self, range: Option<(u32, u32)>) {
        self.assert_mutable();
        self.uid_range = range;
    }

    /// Source selector as `(address-or-unparsed-text, prefix-length)`.
    pub fn from_selector(&self) -> (Option<String>, u8) {
        (self.from.text(), self.from.len)
    }

    pub fn set_from(&mut self, addr: Option<IpAddr>, len: u8) {
        self.assert_mutable();
        self.from = Endpoint {
            addr,
            unparsed: None,
            len,
        };
    }

    /// Destination selector as `(address-or-unparsed-text, prefix-length)`.
    pub fn to_selector(&self) -> (Option<String>, u8) {
        (self.to.text(), self.to.len)
    }

    pub fn set_to(&mut self, addr: Option<IpAddr>, len: u8) {
        self.assert_mutable();
        self.to = Endpoint {
            addr,
            unparsed: None,
            len,
        };
    }

    pub fn iifname(&self) -> Option<&str> {
        self.iifname.as_deref()
    }

    pub fn set_iifname(&mut self, name: Option<&str>) {
        self.assert_mutable();
        self.iifname = name.map(str::to_string);
    }

    pub fn oifname(&self) -> Option<&str> {
        self.oifname.as_deref()
    }

    pub fn set_oifname(&mut self, name: Option<&str>) {
        self.assert_mutable();
        self.oifname = name.map(str::to_string);
    }

    pub fn action(&self) -> u8 {
        self.action
    }

    pub fn set_action(&mut self, action: u8) {
        self.assert_mutable();
        self.action = action;
    }

    pub fn table(&self) -> u32 {
        self.table
    }

    pub fn set_table(&mut self, table: u32) {
        self.assert_mutable();
        self.table = table;
    }

    pub fn suppress_prefixlength(&self) -> Option<i32> {
        self.suppress_prefixlength
    }

    pub fn set_suppress_prefixlength(&mut self, value: Option<i32>) {
        self.assert_mutable();
        self.suppress_prefixlength = value;
    }

    // ========================================
    // Validation
    // ========================================

    /// Validate the rule. Any violation is a validation error, never a
    /// panic.
    pub fn validate(&self) -> Result<()> {
        if self.priority.is_none() {
            return Err(Error::missing_property(SETTING, "priority"));
        }

        match self.action {
            RULE_ACTION_TO_TABLE => {
                if self.table == 0 {
                    return Err(Error::invalid_property(
                        SETTING,
                        "table",
                        "action to-table requires a nonzero table",
                    ));
                }
            }
            RULE_ACTION_BLACKHOLE | RULE_ACTION_UNREACHABLE | RULE_ACTION_PROHIBIT => {
                if self.table != 0 {
                    return Err(Error::invalid_property(
                        SETTING,
                        "table",
                        "action does not take a table",
                    ));
                }
            }
            other => {
                return Err(Error::invalid_property(
                    SETTING,
                    "action",
                    format!("unsupported action {}", other),
                ));
            }
        }

        self.validate_endpoint("from", &self.from)?;
        self.validate_endpoint("to", &self.to)?;

        for (key, name) in [("iifname", &self.iifname), ("oifname", &self.oifname)] {
            if let Some(name) = name {
                if !is_valid_ifname(name) {
                    return Err(Error::invalid_property(
                        SETTING,
                        key,
                        format!("not a valid interface name: {}", name),
                    ));
                }
            }
        }

        for (key, start, end) in [
            ("sport-start", self.sport_start, self.sport_end),
            ("dport-start", self.dport_start, self.dport_end),
        ] {
            if (start, end) != (0, 0) {
                if start == 0 || start > end || end == u16::MAX {
                    return Err(Error::invalid_property(
                        SETTING,
                        key,
                        format!("invalid port range {}-{}", start, end),
                    ));
                }
            }
        }

        if let Some((start, end)) = self.uid_range {
            if start > end {
                return Err(Error::invalid_property(
                    SETTING,
                    "uid-range-start",
                    format!("invalid uid range {}-{}", start, end),
                ));
            }
        }

        if self.fwmask != 0 && self.fwmark == 0 {
            return Err(Error::invalid_property(
                SETTING,
                "fwmask",
                "fwmask without fwmark",
            ));
        }

        if let Some(v) = self.suppress_prefixlength {
            if self.action != RULE_ACTION_TO_TABLE {
                return Err(Error::invalid_property(
                    SETTING,
                    "suppress-prefixlength",
                    "only allowed with action to-table",
                ));
            }
            let max = i32::from(self.family.max_prefix());
            if !(-1..=max).contains(&v) {
                return Err(Error::invalid_property(
                    SETTING,
                    "suppress-prefixlength",
                    format!("out of range [-1, {}]", max),
                ));
            }
        }

        Ok(())
    }

    fn validate_endpoint(&self, key: &str, ep: &Endpoint) -> Result<()> {
        if let Some(unparsed) = &ep.unparsed {
            return Err(Error::invalid_property(
                SETTING,
                key,
                format!("invalid address: {}", unparsed),
            ));
        }
        match ep.addr {
            None => {
                if ep.len != 0 {
                    return Err(Error::invalid_property(
                        SETTING,
                        key,
                        "prefix length without an address",
                    ));
                }
            }
            Some(addr) => {
                if Family::of(&addr) != self.family {
                    return Err(Error::invalid_property(
                        SETTING,
                        key,
                        "address family mismatch",
                    ));
                }
                if ep.len == 0 || ep.len > self.family.max_prefix() {
                    return Err(Error::invalid_property(
                        SETTING,
                        key,
                        format!("invalid prefix length {}", ep.len),
                    ));
                }
            }
        }
        Ok(())
    }

    // ========================================
    // Wire dictionary codec
    // ========================================

    /// Encode as a `routing-rules` array element.
    pub fn to_dbus(&self) -> PropertyDict {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "family", wire::owned(self.family.af()));
        if let Some(priority) = self.priority {
            wire::push(&mut dict, "priority", wire::owned(priority));
        }
        if self.invert {
            wire::push(&mut dict, "invert", wire::owned(true));
        }
        if self.tos != 0 {
            wire::push(&mut dict, "tos", wire::owned(self.tos));
        }
        if self.ipproto != 0 {
            wire::push(&mut dict, "ipproto", wire::owned(self.ipproto));
        }
        if self.fwmark != 0 || self.fwmask != 0 {
            wire::push(&mut dict, "fwmark", wire::owned(self.fwmark));
            wire::push(&mut dict, "fwmask", wire::owned(self.fwmask));
        }
        if (self.sport_start, self.sport_end) != (0, 0) {
            wire::push(&mut dict, "sport-start", wire::owned(self.sport_start));
            wire::push(&mut dict, "sport-end", wire::owned(self.sport_end));
        }
        if (self.dport_start, self.dport_end) != (0, 0) {
            wire::push(&mut dict, "dport-start", wire::owned(self.dport_start));
            wire::push(&mut dict, "dport-end", wire::owned(self.dport_end));
        }
        if let Some((start, end)) = self.uid_range {
            wire::push(&mut dict, "uid-range-start", wire::owned(start));
            wire::push(&mut dict, "uid-range-end", wire::owned(end));
        }
        if let Some(text) = self.from.text() {
            wire::push(&mut dict, "from", wire::owned(text));
            wire::push(&mut dict, "from-len", wire::owned(self.from.len));
        }
        if let Some(text) = self.to.text() {
            wire::push(&mut dict, "to", wire::owned(text));
            wire::push(&mut dict, "to-len", wire::owned(self.to.len));
        }
        if let Some(name) = &self.iifname {
            wire::push(&mut dict, "iifname", wire::owned(name.as_str()));
        }
        if let Some(name) = &self.oifname {
            wire::push(&mut dict, "oifname", wire::owned(name.as_str()));
        }
        wire::push(&mut dict, "action", wire::owned(self.action));
        if self.table != 0 {
            wire::push(&mut dict, "table", wire::owned(self.table));
        }
        if let Some(v) = self.suppress_prefixlength {
            wire::push(&mut dict, "suppress-prefixlength", wire::owned(v));
        }
        dict
    }

    /// Decode a `routing-rules` array element.
    ///
    /// Under `STRICT` parsing unknown and duplicate keys are rejected;
    /// otherwise unknown keys are ignored and the last duplicate wins.
    pub fn from_dbus(dict: &PropertyDict, flags: ParseFlags) -> Result<Self> {
        if flags.contains(ParseFlags::STRICT) {
            if let Some(key) = wire::duplicate_key(dict) {
                return Err(Error::invalid_property(SETTING, key, "duplicate attribute"));
            }
            for (key, _) in dict {
                if wire_attr(key).is_none() {
                    return Err(Error::invalid_property(SETTING, key, "unknown attribute"));
                }
            }
        } else {
            for (key, _) in dict {
                if wire_attr(key).is_none() {
                    debug!(key = key.as_str(), "ignoring unknown routing-rule attribute");
                }
            }
        }

        let af = wire::opt_i32(SETTING, dict, "family")?
            .ok_or_else(|| Error::missing_property(SETTING, "family"))?;
        let family = Family::from_af(af)
            .ok_or_else(|| Error::invalid_property(SETTING, "family", format!("unknown family {}", af)))?;

        let mut rule = Self::new(family);
        rule.priority = wire::opt_u32(SETTING, dict, "priority")?;
        rule.invert = wire::opt_bool(SETTING, dict, "invert")?.unwrap_or(false);
        rule.tos = wire::opt_u8(SETTING, dict, "tos")?.unwrap_or(0);
        rule.ipproto = wire::opt_u8(SETTING, dict, "ipproto")?.unwrap_or(0);
        rule.fwmark = wire::opt_u32(SETTING, dict, "fwmark")?.unwrap_or(0);
        rule.fwmask = wire::opt_u32(SETTING, dict, "fwmask")?.unwrap_or(0);

        // Range pairs accept either bound alone; the missing one defaults
        // to the given one.
        let sport = range_pair(
            wire::opt_u16(SETTING, dict, "sport-start")?,
            wire::opt_u16(SETTING, dict, "sport-end")?,
        );
        (rule.sport_start, rule.sport_end) = sport.unwrap_or((0, 0));
        let dport = range_pair(
            wire::opt_u16(SETTING, dict, "dport-start")?,
            wire::opt_u16(SETTING, dict, "dport-end")?,
        );
        (rule.dport_start, rule.dport_end) = dport.unwrap_or((0, 0));
        rule.uid_range = range_pair(
            wire::opt_u32(SETTING, dict, "uid-range-start")?,
            wire::opt_u32(SETTING, dict, "uid-range-end")?,
        );

        rule.from = decode_endpoint(family, dict, "from", "from-len")?;
        rule.to = decode_endpoint(family, dict, "to", "to-len")?;

        rule.iifname = wire::opt_str(SETTING, dict, "iifname")?;
        rule.oifname = wire::opt_str(SETTING, dict, "oifname")?;
        rule.action =
            wire::opt_u8(SETTING, dict, "action")?.unwrap_or(RULE_ACTION_TO_TABLE);
        rule.table = wire::opt_u32(SETTING, dict, "table")?.unwrap_or(0);
        rule.suppress_prefixlength = wire::opt_i32(SETTING, dict, "suppress-prefixlength")?;

        Ok(rule)
    }

    // ========================================
    // Token string codec
    // ========================================

    /// Parse an iproute2-like rule string.
    ///
    /// The family is inferred from the first valid `from`/`to` address
    /// and defaults to IPv4.
    pub fn from_string(text: &str) -> Result<Self> {
        TokenParser::new(tokenize(text)).run()
    }
}

fn range_pair<T: Copy>(start: Option<T>, end: Option<T>) -> Option<(T, T)> {
    match (start, end) {
        (None, None) => None,
        (Some(s), None) => Some((s, s)),
        (None, Some(e)) => Some((e, e)),
        (Some(s), Some(e)) => Some((s, e)),
    }
}

fn decode_endpoint(
    family: Family,
    dict: &PropertyDict,
    key: &str,
    len_key: &str,
) -> Result<Endpoint> {
    let text = wire::opt_str(SETTING, dict, key)?;
    let len = wire::opt_u8(SETTING, dict, len_key)?.unwrap_or(0);
    let Some(text) = text else {
        return Ok(Endpoint {
            addr: None,
            unparsed: None,
            len,
        });
    };
    match super::parse_addr(family, &text) {
        Some(addr) => Ok(Endpoint {
            addr: Some(addr),
            unparsed: None,
            len,
        }),
        // Keep the bad string around so validation can point at it.
        None => Ok(Endpoint {
            addr: None,
            unparsed: Some(text),
            len,
        }),
    }
}

// ========================================
// Token grammar
// ========================================

/// Split on whitespace, honoring backslash escapes.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    let mut in_token = false;
    while let Some(c) = chars.next() {
        if c == '\\' {
            in_token = true;
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c.is_whitespace() {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
        } else {
            in_token = true;
            current.push(c);
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Escape whitespace and backslashes for token output.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn parse_u32_maybe_hex(s: &str) -> Option<u32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn action_from_token(token: &str) -> Option<u8> {
    match token {
        "blackhole" => Some(RULE_ACTION_BLACKHOLE),
        "unreachable" => Some(RULE_ACTION_UNREACHABLE),
        "prohibit" => Some(RULE_ACTION_PROHIBIT),
        "throw" => Some(ACTION_THROW),
        _ => None,
    }
}

fn action_token(action: u8) -> Option<&'static str> {
    match action {
        RULE_ACTION_BLACKHOLE => Some("blackhole"),
        RULE_ACTION_UNREACHABLE => Some("unreachable"),
        RULE_ACTION_PROHIBIT => Some("prohibit"),
        ACTION_THROW => Some("throw"),
        _ => None,
    }
}

fn table_from_token(token: &str) -> Option<u32> {
    match token {
        "main" => Some(254),
        "local" => Some(255),
        "default" => Some(253),
        _ => token.parse().ok(),
    }
}

fn table_token(table: u32) -> String {
    match table {
        253 => "default".to_string(),
        254 => "main".to_string(),
        255 => "local".to_string(),
        other => other.to_string(),
    }
}

struct TokenParser {
    tokens: std::vec::IntoIter<String>,
    seen: Vec<&'static str>,
    family: Option<Family>,
}

impl TokenParser {
    fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            seen: Vec::new(),
            family: None,
        }
    }

    fn mark(&mut self, keyword: &'static str) -> Result<()> {
        if self.seen.contains(&keyword) {
            return Err(Error::invalid_property(SETTING, keyword, "duplicate keyword"));
        }
        self.seen.push(keyword);
        Ok(())
    }

    fn value(&mut self, keyword: &str) -> Result<String> {
        self.tokens
            .next()
            .ok_or_else(|| Error::invalid_property(SETTING, keyword, "missing value"))
    }

    fn run(mut self) -> Result<RoutingRule> {
        let mut rule = RoutingRule::new(Family::V4);

        while let Some(token) = self.tokens.next() {
            match token.as_str() {
                // Inversion is idempotent; repeated `not` is accepted.
                "not" => rule.invert = true,
                "priority" | "order" | "pref" | "preference" => {
                    self.mark("priority")?;
                    let v = self.value("priority")?;
                    rule.priority = Some(v.parse().map_err(|_| {
                        Error::invalid_property(SETTING, "priority", format!("invalid value: {}", v))
                    })?);
                }
                "table" | "lookup" => {
                    self.mark("table")?;
                    let v = self.value("table")?;
                    rule.table = table_from_token(&v).ok_or_else(|| {
                        Error::invalid_property(SETTING, "table", format!("invalid value: {}", v))
                    })?;
                }
                "tos" | "dsfield" => {
                    self.mark("tos")?;
                    let v = self.value("tos")?;
                    rule.tos = parse_u32_maybe_hex(&v)
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| {
                            Error::invalid_property(SETTING, "tos", format!("invalid value: {}", v))
                        })?;
                }
                "ipproto" => {
                    self.mark("ipproto")?;
                    let v = self.value("ipproto")?;
                    rule.ipproto = match v.as_str() {
                        "tcp" => 6,
                        "udp" => 17,
                        "sctp" => 132,
                        other => other.parse().map_err(|_| {
                            Error::invalid_property(
                                SETTING,
                                "ipproto",
                                format!("invalid value: {}", other),
                            )
                        })?,
                    };
                }
                "fwmark" => {
                    self.mark("fwmark")?;
                    let v = self.value("fwmark")?;
                    let (mark, mask) = v.split_once('/').unwrap_or((v.as_str(), ""));
                    rule.fwmark = parse_u32_maybe_hex(mark).ok_or_else(|| {
                        Error::invalid_property(SETTING, "fwmark", format!("invalid value: {}", v))
                    })?;
                    rule.fwmask = if mask.is_empty() {
                        0
                    } else {
                        parse_u32_maybe_hex(mask).ok_or_else(|| {
                            Error::invalid_property(SETTING, "fwmark", format!("invalid mask: {}", v))
                        })?
                    };
                }
                "sport" => {
                    self.mark("sport")?;
                    let v = self.value("sport")?;
                    (rule.sport_start, rule.sport_end) = parse_port_range("sport", &v)?;
                }
                "dport" => {
                    self.mark("dport")?;
                    let v = self.value("dport")?;
                    (rule.dport_start, rule.dport_end) = parse_port_range("dport", &v)?;
                }
                "uidrange" => {
                    self.mark("uidrange")?;
                    let v = self.value("uidrange")?;
                    let (start, end) = v.split_once('-').unwrap_or((v.as_str(), v.as_str()));
                    let parse = |s: &str| {
                        s.parse::<u32>().map_err(|_| {
                            Error::invalid_property(
                                SETTING,
                                "uidrange",
                                format!("invalid value: {}", v),
                            )
                        })
                    };
                    rule.uid_range = Some((parse(start)?, parse(end)?));
                }
                "from" => {
                    self.mark("from")?;
                    let v = self.value("from")?;
                    rule.from = self.parse_endpoint("from", &v)?;
                }
                "to" => {
                    self.mark("to")?;
                    let v = self.value("to")?;
                    rule.to = self.parse_endpoint("to", &v)?;
                }
                "iif" | "dev" => {
                    self.mark("iif")?;
                    rule.iifname = Some(self.value("iif")?);
                }
                "oif" => {
                    self.mark("oif")?;
                    rule.oifname = Some(self.value("oif")?);
                }
                "suppress_prefixlength" | "sup_pl" => {
                    self.mark("suppress_prefixlength")?;
                    let v = self.value("suppress_prefixlength")?;
                    rule.suppress_prefixlength = Some(v.parse().map_err(|_| {
                        Error::invalid_property(
                            SETTING,
                            "suppress_prefixlength",
                            format!("invalid value: {}", v),
                        )
                    })?);
                }
                "type" => {
                    self.mark("type")?;
                    let v = self.value("type")?;
                    rule.action = action_from_token(&v).ok_or_else(|| {
                        Error::invalid_property(SETTING, "type", format!("unknown type: {}", v))
                    })?;
                }
                bare if action_from_token(bare).is_some() => {
                    self.mark("type")?;
                    rule.action = action_from_token(bare).unwrap_or(RULE_ACTION_TO_TABLE);
                }
                unknown => {
                    return Err(Error::invalid_property(
                        SETTING,
                        unknown,
                        "unknown keyword",
                    ));
                }
            }
        }

        rule.family = self.family.unwrap_or(Family::V4);
        // Re-resolve selectors now that the family is final.
        for ep in [&mut rule.from, &mut rule.to] {
            if let Some(addr) = ep.addr {
                if Family::of(&addr) != rule.family {
                    ep.unparsed = Some(addr.to_string());
                    ep.addr = None;
                }
            }
        }
        Ok(rule)
    }

    fn parse_endpoint(&mut self, keyword: &'static str, text: &str) -> Result<Endpoint> {
        // iproute2 prints "all" for an empty selector.
        if text == "all" {
            return Ok(Endpoint::default());
        }
        let (addr_text, len_text) = text.split_once('/').unwrap_or((text, ""));
        let addr: Option<IpAddr> = addr_text.parse().ok();
        match addr {
            Some(addr) => {
                let family = Family::of(&addr);
                match self.family {
                    None => self.family = Some(family),
                    Some(existing) if existing != family => {
                        return Err(Error::invalid_property(
                            SETTING,
                            keyword,
                            "address family mismatch",
                        ));
                    }
                    Some(_) => {}
                }
                let len = if len_text.is_empty() {
                    family.max_prefix()
                } else {
                    len_text.parse().map_err(|_| {
                        Error::invalid_property(
                            SETTING,
                            keyword,
                            format!("invalid prefix length: {}", len_text),
                        )
                    })?
                };
                Ok(Endpoint {
                    addr: Some(addr),
                    unparsed: None,
                    len,
                })
            }
            None => Ok(Endpoint {
                addr: None,
                unparsed: Some(text.to_string()),
                len: len_text.parse().unwrap_or(0),
            }),
        }
    }
}

fn parse_port_range(keyword: &'static str, text: &str) -> Result<(u16, u16)> {
    let (start, end) = text.split_once('-').unwrap_or((text, text));
    let parse = |s: &str| {
        s.parse::<u16>().map_err(|_| {
            Error::invalid_property(SETTING, keyword, format!("invalid value: {}", text))
        })
    };
    Ok((parse(start)?, parse(end)?))
}

impl std::fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tokens: Vec<String> = Vec::new();
        if self.invert {
            tokens.push("not".into());
        }
        if let Some(priority) = self.priority {
            tokens.push(format!("priority {}", priority));
        }
        for (keyword, ep) in [("from", &self.from), ("to", &self.to)] {
            if ep.is_empty() {
                continue;
            }
            let text = ep.text().unwrap_or_default();
            if ep.addr.is_some() && ep.len != self.family.max_prefix() {
                tokens.push(format!("{} {}/{}", keyword, escape(&text), ep.len));
            } else {
                tokens.push(format!("{} {}", keyword, escape(&text)));
            }
        }
        if self.tos != 0 {
            tokens.push(format!("tos 0x{:x}", self.tos));
        }
        if self.ipproto != 0 {
            tokens.push(format!("ipproto {}", self.ipproto));
        }
        if self.fwmark != 0 || self.fwmask != 0 {
            if self.fwmask != 0 {
                tokens.push(format!("fwmark 0x{:x}/0x{:x}", self.fwmark, self.fwmask));
            } else {
                tokens.push(format!("fwmark 0x{:x}", self.fwmark));
            }
        }
        for (keyword, (start, end)) in [
            ("sport", (self.sport_start, self.sport_end)),
            ("dport", (self.dport_start, self.dport_end)),
        ] {
            if (start, end) != (0, 0) {
                if start == end {
                    tokens.push(format!("{} {}", keyword, start));
                } else {
                    tokens.push(format!("{} {}-{}", keyword, start, end));
                }
            }
        }
        if let Some((start, end)) = self.uid_range {
            tokens.push(format!("uidrange {}-{}", start, end));
        }
        if let Some(name) = &self.iifname {
            tokens.push(format!("iif {}", escape(name)));
        }
        if let Some(name) = &self.oifname {
            tokens.push(format!("oif {}", escape(name)));
        }
        if let Some(v) = self.suppress_prefixlength {
            tokens.push(format!("suppress_prefixlength {}", v));
        }
        if self.action == RULE_ACTION_TO_TABLE {
            if self.table != 0 {
                tokens.push(format!("table {}", table_token(self.table)));
            }
        } else if let Some(token) = action_token(self.action) {
            tokens.push(token.to_string());
            if self.table != 0 {
                tokens.push(format!("table {}", table_token(self.table)));
            }
        }
        write!(f, "{}", tokens.join(" "))
    }
}

impl FromStr for RoutingRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_attr_table_is_sorted() {
        for pair in WIRE_ATTRS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn test_scenario_priority_from_table() {
        let rule = RoutingRule::from_string("priority 100 from 10.0.0.0/24 table 100").unwrap();
        assert_eq!(rule.priority(), Some(100));
        assert_eq!(rule.family(), Family::V4);
        let (from, len) = rule.from_selector();
        assert_eq!(from.as_deref(), Some("10.0.0.0"));
        assert_eq!(len, 24);
        assert_eq!(rule.action(), RULE_ACTION_TO_TABLE);
        assert_eq!(rule.table(), 100);
        assert!(rule.validate().is_ok());
        assert_eq!(rule.to_string(), "priority 100 from 10.0.0.0/24 table 100");
    }

    #[test]
    fn test_string_round_trip() {
        let cases = [
            "priority 5 from 192.168.0.0/16 table main",
            "not priority 10 to 10.1.2.3 fwmark 0x10/0xff table 50",
            "priority 1 from 2001:db8::/32 iif eth0 table 1000",
            "priority 7 sport 80 dport 1000-2000 ipproto 6 table 8",
            "priority 9 uidrange 1000-2000 suppress_prefixlength 8 table 9",
            "priority 2 blackhole",
            "priority 3 tos 0x10 table 7",
        ];
        for case in cases {
            let rule = RoutingRule::from_string(case).unwrap();
            rule.validate().unwrap();
            let text = rule.to_string();
            let back = RoutingRule::from_string(&text).unwrap();
            assert_eq!(rule, back, "case: {} -> {}", case, text);
        }
    }

    #[test]
    fn test_keyword_synonyms() {
        let a = RoutingRule::from_string("pref 10 lookup 20").unwrap();
        let b = RoutingRule::from_string("priority 10 table 20").unwrap();
        assert_eq!(a, b);
        let c = RoutingRule::from_string("order 10 dsfield 0x04 table 20").unwrap();
        assert_eq!(c.tos(), 4);
        let d = RoutingRule::from_string("preference 10 dev eth0 table 20").unwrap();
        assert_eq!(d.iifname(), Some("eth0"));
        let e = RoutingRule::from_string("priority 10 sup_pl 4 table 20").unwrap();
        assert_eq!(e.suppress_prefixlength(), Some(4));
    }

    #[test]
    fn test_not_is_idempotent() {
        let rule = RoutingRule::from_string("not not priority 4 table 5").unwrap();
        assert!(rule.invert());
    }

    #[test]
    fn test_errors_name_the_keyword() {
        let err = RoutingRule::from_string("priority banana table 1").unwrap_err();
        assert!(err.to_string().contains("priority"), "{}", err);
        let err = RoutingRule::from_string("priority 1 priority 2").unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{}", err);
        let err = RoutingRule::from_string("frobnicate 12").unwrap_err();
        assert!(err.to_string().contains("frobnicate"), "{}", err);
    }

    #[test]
    fn test_bare_route_type_token() {
        let rule = RoutingRule::from_string("priority 4 unreachable").unwrap();
        assert_eq!(rule.action(), RULE_ACTION_UNREACHABLE);
        assert!(rule.validate().is_ok());
        // `type` keyword works too.
        let rule = RoutingRule::from_string("priority 4 type prohibit").unwrap();
        assert_eq!(rule.action(), RULE_ACTION_PROHIBIT);
        // throw parses but is not a supported action.
        let rule = RoutingRule::from_string("priority 4 throw").unwrap();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_priority_required() {
        let mut rule = RoutingRule::new(Family::V4);
        rule.set_table(10);
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("priority"));
        rule.set_priority(Some(1));
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_table_action_coupling() {
        let mut rule = RoutingRule::new(Family::V4);
        rule.set_priority(Some(1));
        // to-table needs a nonzero table.
        assert!(rule.validate().is_err());
        // blackhole must not carry a table.
        rule.set_action(RULE_ACTION_BLACKHOLE);
        assert!(rule.validate().is_ok());
        rule.set_table(10);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_ports_and_ifnames() {
        let mut rule = RoutingRule::new(Family::V4);
        rule.set_priority(Some(1));
        rule.set_table(10);
        rule.set_source_port(200, 100);
        assert!(rule.validate().is_err());
        rule.set_source_port(100, 200);
        assert!(rule.validate().is_ok());
        rule.set_iifname(Some("bad/name"));
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_suppress_prefixlength_needs_to_table() {
        let mut rule = RoutingRule::new(Family::V4);
        rule.set_priority(Some(1));
        rule.set_action(RULE_ACTION_BLACKHOLE);
        rule.set_suppress_prefixlength(Some(8));
        assert!(rule.validate().is_err());
        rule.set_action(RULE_ACTION_TO_TABLE);
        rule.set_table(10);
        assert!(rule.validate().is_ok());
        rule.set_suppress_prefixlength(Some(33));
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_dbus_round_trip() {
        let rule = RoutingRule::from_string(
            "not priority 30 from 10.0.0.0/8 to 10.1.0.0/16 fwmark 0x1/0xff sport 53 table 30",
        )
        .unwrap();
        let dict = rule.to_dbus();
        let back = RoutingRule::from_dbus(&dict, ParseFlags::STRICT).unwrap();
        assert_eq!(rule, back);
    }

    #[test]
    fn test_dbus_one_sided_range_defaults() {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "family", wire::owned(2i32));
        wire::push(&mut dict, "priority", wire::owned(1u32));
        wire::push(&mut dict, "sport-start", wire::owned(443u16));
        wire::push(&mut dict, "table", wire::owned(5u32));
        let rule = RoutingRule::from_dbus(&dict, ParseFlags::STRICT).unwrap();
        assert_eq!(rule.source_port(), (443, 443));
    }

    #[test]
    fn test_dbus_unknown_key_handling() {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "family", wire::owned(2i32));
        wire::push(&mut dict, "bogus", wire::owned(1u32));
        assert!(RoutingRule::from_dbus(&dict, ParseFlags::STRICT).is_err());
        assert!(RoutingRule::from_dbus(&dict, ParseFlags::empty()).is_ok());
    }

    #[test]
    fn test_dbus_duplicate_key_handling() {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "family", wire::owned(2i32));
        wire::push(&mut dict, "priority", wire::owned(1u32));
        wire::push(&mut dict, "priority", wire::owned(2u32));
        assert!(RoutingRule::from_dbus(&dict, ParseFlags::STRICT).is_err());
        let rule = RoutingRule::from_dbus(&dict, ParseFlags::empty()).unwrap();
        assert_eq!(rule.priority(), Some(2));
    }

    #[test]
    fn test_unparsed_address_kept_for_diagnostics() {
        let mut dict = PropertyDict::new();
        wire::push(&mut dict, "family", wire::owned(2i32));
        wire::push(&mut dict, "priority", wire::owned(1u32));
        wire::push(&mut dict, "from", wire::owned("999.999.0.0"));
        wire::push(&mut dict, "from-len", wire::owned(24u8));
        wire::push(&mut dict, "table", wire::owned(5u32));
        let rule = RoutingRule::from_dbus(&dict, ParseFlags::empty()).unwrap();
        let (from, _) = rule.from_selector();
        assert_eq!(from.as_deref(), Some("999.999.0.0"));
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("999.999.0.0"));
    }

    #[test]
    fn test_sealed_clone_is_mutable() {
        let mut rule = RoutingRule::from_string("priority 1 table 5").unwrap();
        rule.seal();
        assert!(rule.is_sealed());
        let mut copy = rule.clone();
        assert!(!copy.is_sealed());
        copy.set_priority(Some(2));
        assert_eq!(rule.priority(), Some(1));
        assert_eq!(copy.priority(), Some(2));
        // Seal status does not affect equality.
        copy.set_priority(Some(1));
        assert_eq!(rule, copy);
    }

    #[test]
    #[should_panic(expected = "sealed")]
    fn test_sealed_mutation_panics() {
        let mut rule = RoutingRule::new(Family::V4);
        rule.seal();
        rule.set_priority(Some(1));
    }

    #[test]
    fn test_escaped_interface_name() {
        let mut rule = RoutingRule::new(Family::V4);
        rule.set_priority(Some(1));
        rule.set_table(5);
        rule.set_iifname(Some("odd name"));
        let text = rule.to_string();
        let back = RoutingRule::from_string(&text).unwrap();
        assert_eq!(back.iifname(), Some("odd name"));
        // An escaped name round-trips even though validation rejects it.
        assert!(back.validate().is_err());
    }
}
