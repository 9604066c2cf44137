//! Compiled ruleset message
//!
//! The in-memory form of one group's or classifier's binary ruleset: a traffic
//! type and an ordered list of rules, each with its match entries. See
//! [`crate::core::wire`] for the byte encoding.

use crate::core::protocols;
use std::fmt;
use std::net::IpAddr;

/// Traffic type a ruleset classifies
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::AsRefStr,
)]
pub enum TrafficType {
    #[default]
    #[strum(serialize = "ipv4")]
    Ipv4,
    #[strum(serialize = "ipv6")]
    Ipv6,
}

impl TrafficType {
    /// Maps the configured type/ip-version leaf to a traffic type.
    ///
    /// Only the exact value `ipv4` selects IPv4. Anything else, including an
    /// absent leaf, selects IPv6.
    pub fn from_config(value: Option<&str>) -> Self {
        if value == Some("ipv4") {
            TrafficType::Ipv4
        } else {
            TrafficType::Ipv6
        }
    }
}

/// Fragment state a packet must be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum Fragment {
    #[strum(serialize = "any")]
    Any,
    #[strum(serialize = "initial-only")]
    Initial,
    #[strum(serialize = "subsequent")]
    Subsequent,
}

impl Fragment {
    /// `any` and `initial-only` are recognised; every other value means subsequent fragments.
    pub fn from_config(value: &str) -> Self {
        match value {
            "any" => Fragment::Any,
            "initial-only" => Fragment::Initial,
            _ => Fragment::Subsequent,
        }
    }
}

/// ICMPv6 message class
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum Icmpv6Class {
    #[strum(serialize = "info")]
    Info,
    #[strum(serialize = "error")]
    Error,
}

impl Icmpv6Class {
    /// `info` selects informational messages, anything else error messages.
    pub fn from_config(value: &str) -> Self {
        if value == "info" {
            Icmpv6Class::Info
        } else {
            Icmpv6Class::Error
        }
    }
}

/// Address plus prefix length. Hosts carry 32 or 128.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPrefix {
    pub address: IpAddr,
    pub length: u8,
}

impl IpPrefix {
    pub fn host(address: IpAddr) -> Self {
        let length = if address.is_ipv4() { 32 } else { 128 };
        Self { address, length }
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpTypeCode {
    pub typenum: u32,
    pub code: Option<u32>,
}

impl fmt::Display for IcmpTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "type {} code {}", self.typenum, code),
            None => write!(f, "type {}", self.typenum),
        }
    }
}

/// One atomic compiled predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEntry {
    SrcIp(IpPrefix),
    DestIp(IpPrefix),
    SrcPort(u32),
    DestPort(u32),
    ProtoBase(u32),
    ProtoFinal(u32),
    Dscp(u32),
    Ttl(u32),
    Fragment(Fragment),
    Icmpv4(IcmpTypeCode),
    Icmpv6(IcmpTypeCode),
    Icmpv6Class(Icmpv6Class),
}

impl fmt::Display for MatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchEntry::SrcIp(p) => write!(f, "src-ip {p}"),
            MatchEntry::DestIp(p) => write!(f, "dest-ip {p}"),
            MatchEntry::SrcPort(p) => write!(f, "src-port {p}"),
            MatchEntry::DestPort(p) => write!(f, "dest-port {p}"),
            MatchEntry::ProtoBase(n) => {
                write!(f, "proto-base {}", protocols::number_to_name(*n))
            }
            MatchEntry::ProtoFinal(n) => {
                write!(f, "proto-final {}", protocols::number_to_name(*n))
            }
            MatchEntry::Dscp(v) => write!(f, "dscp {v}"),
            MatchEntry::Ttl(v) => write!(f, "ttl {v}"),
            MatchEntry::Fragment(frag) => write!(f, "fragment {frag}"),
            MatchEntry::Icmpv4(tc) => write!(f, "icmp {tc}"),
            MatchEntry::Icmpv6(tc) => write!(f, "icmpv6 {tc}"),
            MatchEntry::Icmpv6Class(class) => write!(f, "icmpv6 class {class}"),
        }
    }
}

/// One compiled rule
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleMessage {
    pub number: u32,
    pub result: String,
    pub matches: Vec<MatchEntry>,
}

/// One group's or classifier's compiled ruleset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RulesetMessage {
    pub traffic_type: TrafficType,
    pub rules: Vec<RuleMessage>,
}

impl RulesetMessage {
    pub fn new(traffic_type: TrafficType) -> Self {
        Self {
            traffic_type,
            rules: Vec::new(),
        }
    }

    /// Appends an empty rule and returns it for the compiler to fill.
    pub fn add_rule(&mut self, number: u32, result: impl Into<String>) -> &mut RuleMessage {
        self.rules.push(RuleMessage {
            number,
            result: result.into(),
            matches: Vec::new(),
        });
        let last = self.rules.len() - 1;
        &mut self.rules[last]
    }
}

impl fmt::Display for RulesetMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "traffic-type {}", self.traffic_type)?;
        for rule in &self.rules {
            writeln!(f, "rule {} result {}", rule.number, rule.result)?;
            for entry in &rule.matches {
                writeln!(f, "    {entry}")?;
            }
        }
        Ok(())
    }
}
