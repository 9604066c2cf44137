//! Binary encoding of [`RulesetMessage`]
//!
//! The packet-processing engine decodes rulesets with its generated protobuf
//! schema. [`pb`] mirrors that schema as `prost` messages; [`encode`] and
//! [`decode`] translate between it and the typed [`RulesetMessage`].
//!
//! Scalars outside a oneof are skipped when zero, members of the `RuleMatch`
//! and `IPAddress` oneofs are always written. Identical messages always
//! produce identical bytes.

use crate::core::error::WireError;
use crate::core::ruleset::{
    Fragment, IcmpTypeCode, Icmpv6Class, IpPrefix, MatchEntry, RuleMessage, RulesetMessage,
    TrafficType,
};
use bytes::Bytes;
use prost::Message;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Protobuf messages of the ruleset schema
pub mod pb {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Rules {
        #[prost(enumeration = "TrafficType", tag = "1")]
        pub traffic_type: i32,
        #[prost(message, repeated, tag = "2")]
        pub rules: Vec<Rule>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Rule {
        #[prost(uint32, tag = "1")]
        pub number: u32,
        #[prost(string, tag = "2")]
        pub result: String,
        #[prost(message, repeated, tag = "3")]
        pub matches: Vec<RuleMatch>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RuleMatch {
        #[prost(oneof = "rule_match::Entry", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12")]
        pub entry: Option<rule_match::Entry>,
    }

    pub mod rule_match {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Entry {
            #[prost(message, tag = "1")]
            SrcIp(super::IpPrefix),
            #[prost(message, tag = "2")]
            DestIp(super::IpPrefix),
            #[prost(uint32, tag = "3")]
            SrcPort(u32),
            #[prost(uint32, tag = "4")]
            DestPort(u32),
            #[prost(uint32, tag = "5")]
            ProtoBase(u32),
            #[prost(uint32, tag = "6")]
            ProtoFinal(u32),
            #[prost(uint32, tag = "7")]
            Dscp(u32),
            #[prost(uint32, tag = "8")]
            Ttl(u32),
            #[prost(enumeration = "super::Fragment", tag = "9")]
            Fragment(i32),
            #[prost(message, tag = "10")]
            Icmpv4(super::IcmpTypeAndCode),
            #[prost(message, tag = "11")]
            Icmpv6(super::IcmpTypeAndCode),
            #[prost(enumeration = "super::Icmpv6Class", tag = "12")]
            Icmpv6Class(i32),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IpPrefix {
        #[prost(message, optional, tag = "1")]
        pub address: Option<IpAddress>,
        #[prost(uint32, tag = "2")]
        pub length: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IpAddress {
        #[prost(oneof = "ip_address::Address", tags = "1, 2")]
        pub address: Option<ip_address::Address>,
    }

    pub mod ip_address {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Address {
            #[prost(uint32, tag = "1")]
            Ipv4Addr(u32),
            #[prost(bytes = "vec", tag = "2")]
            Ipv6Addr(Vec<u8>),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IcmpTypeAndCode {
        #[prost(uint32, tag = "1")]
        pub typenum: u32,
        #[prost(uint32, optional, tag = "2")]
        pub code: Option<u32>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum TrafficType {
        Ipv4 = 0,
        Ipv6 = 1,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Fragment {
        Any = 0,
        Initial = 1,
        Subsequent = 2,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Icmpv6Class {
        Info = 0,
        Error = 1,
    }
}

use pb::ip_address::Address;
use pb::rule_match::Entry;

// ═══════════════════════════════════════════════════════════════════════════
// Encoding
// ═══════════════════════════════════════════════════════════════════════════

impl From<TrafficType> for pb::TrafficType {
    fn from(value: TrafficType) -> Self {
        match value {
            TrafficType::Ipv4 => pb::TrafficType::Ipv4,
            TrafficType::Ipv6 => pb::TrafficType::Ipv6,
        }
    }
}

impl From<Fragment> for pb::Fragment {
    fn from(value: Fragment) -> Self {
        match value {
            Fragment::Any => pb::Fragment::Any,
            Fragment::Initial => pb::Fragment::Initial,
            Fragment::Subsequent => pb::Fragment::Subsequent,
        }
    }
}

impl From<Icmpv6Class> for pb::Icmpv6Class {
    fn from(value: Icmpv6Class) -> Self {
        match value {
            Icmpv6Class::Info => pb::Icmpv6Class::Info,
            Icmpv6Class::Error => pb::Icmpv6Class::Error,
        }
    }
}

impl From<&IpPrefix> for pb::IpPrefix {
    fn from(prefix: &IpPrefix) -> Self {
        let address = match prefix.address {
            IpAddr::V4(v4) => Address::Ipv4Addr(u32::from(v4)),
            IpAddr::V6(v6) => Address::Ipv6Addr(v6.octets().to_vec()),
        };
        Self {
            address: Some(pb::IpAddress {
                address: Some(address),
            }),
            length: u32::from(prefix.length),
        }
    }
}

impl From<&IcmpTypeCode> for pb::IcmpTypeAndCode {
    fn from(tc: &IcmpTypeCode) -> Self {
        Self {
            typenum: tc.typenum,
            code: tc.code,
        }
    }
}

impl From<&MatchEntry> for pb::RuleMatch {
    fn from(entry: &MatchEntry) -> Self {
        let entry = match entry {
            MatchEntry::SrcIp(p) => Entry::SrcIp(p.into()),
            MatchEntry::DestIp(p) => Entry::DestIp(p.into()),
            MatchEntry::SrcPort(v) => Entry::SrcPort(*v),
            MatchEntry::DestPort(v) => Entry::DestPort(*v),
            MatchEntry::ProtoBase(v) => Entry::ProtoBase(*v),
            MatchEntry::ProtoFinal(v) => Entry::ProtoFinal(*v),
            MatchEntry::Dscp(v) => Entry::Dscp(*v),
            MatchEntry::Ttl(v) => Entry::Ttl(*v),
            MatchEntry::Fragment(frag) => Entry::Fragment(pb::Fragment::from(*frag).into()),
            MatchEntry::Icmpv4(tc) => Entry::Icmpv4(tc.into()),
            MatchEntry::Icmpv6(tc) => Entry::Icmpv6(tc.into()),
            MatchEntry::Icmpv6Class(class) => {
                Entry::Icmpv6Class(pb::Icmpv6Class::from(*class).into())
            }
        };
        Self { entry: Some(entry) }
    }
}

impl From<&RuleMessage> for pb::Rule {
    fn from(rule: &RuleMessage) -> Self {
        Self {
            number: rule.number,
            result: rule.result.clone(),
            matches: rule.matches.iter().map(pb::RuleMatch::from).collect(),
        }
    }
}

impl From<&RulesetMessage> for pb::Rules {
    fn from(message: &RulesetMessage) -> Self {
        Self {
            traffic_type: pb::TrafficType::from(message.traffic_type).into(),
            rules: message.rules.iter().map(pb::Rule::from).collect(),
        }
    }
}

/// Serializes a ruleset message.
pub fn encode(message: &RulesetMessage) -> Bytes {
    Bytes::from(pb::Rules::from(message).encode_to_vec())
}

// ═══════════════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════════════

fn invalid(what: &'static str, value: impl Into<i64>) -> WireError {
    WireError::InvalidValue {
        what,
        value: value.into(),
    }
}

fn traffic_type(raw: i32) -> Result<TrafficType, WireError> {
    match pb::TrafficType::try_from(raw).map_err(|_| invalid("traffic_type", raw))? {
        pb::TrafficType::Ipv4 => Ok(TrafficType::Ipv4),
        pb::TrafficType::Ipv6 => Ok(TrafficType::Ipv6),
    }
}

fn fragment(raw: i32) -> Result<Fragment, WireError> {
    match pb::Fragment::try_from(raw).map_err(|_| invalid("fragment", raw))? {
        pb::Fragment::Any => Ok(Fragment::Any),
        pb::Fragment::Initial => Ok(Fragment::Initial),
        pb::Fragment::Subsequent => Ok(Fragment::Subsequent),
    }
}

fn icmpv6_class(raw: i32) -> Result<Icmpv6Class, WireError> {
    match pb::Icmpv6Class::try_from(raw).map_err(|_| invalid("icmpv6_class", raw))? {
        pb::Icmpv6Class::Info => Ok(Icmpv6Class::Info),
        pb::Icmpv6Class::Error => Ok(Icmpv6Class::Error),
    }
}

fn prefix(msg: pb::IpPrefix) -> Result<IpPrefix, WireError> {
    // An absent address decodes as the IPv4 zero address
    let address = match msg.address.and_then(|a| a.address) {
        None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Some(Address::Ipv4Addr(v4)) => IpAddr::V4(Ipv4Addr::from(v4)),
        Some(Address::Ipv6Addr(octets)) => {
            let len = u32::try_from(octets.len()).unwrap_or(u32::MAX);
            let octets: [u8; 16] = octets
                .try_into()
                .map_err(|_| invalid("ipv6_addr length", len))?;
            IpAddr::V6(Ipv6Addr::from(octets))
        }
    };
    let length =
        u8::try_from(msg.length).map_err(|_| invalid("prefix length", msg.length))?;
    Ok(IpPrefix { address, length })
}

fn icmp(msg: pb::IcmpTypeAndCode) -> IcmpTypeCode {
    IcmpTypeCode {
        typenum: msg.typenum,
        code: msg.code,
    }
}

fn match_entry(msg: pb::RuleMatch) -> Result<MatchEntry, WireError> {
    Ok(match msg.entry.ok_or(WireError::EmptyMatch)? {
        Entry::SrcIp(p) => MatchEntry::SrcIp(prefix(p)?),
        Entry::DestIp(p) => MatchEntry::DestIp(prefix(p)?),
        Entry::SrcPort(v) => MatchEntry::SrcPort(v),
        Entry::DestPort(v) => MatchEntry::DestPort(v),
        Entry::ProtoBase(v) => MatchEntry::ProtoBase(v),
        Entry::ProtoFinal(v) => MatchEntry::ProtoFinal(v),
        Entry::Dscp(v) => MatchEntry::Dscp(v),
        Entry::Ttl(v) => MatchEntry::Ttl(v),
        Entry::Fragment(raw) => MatchEntry::Fragment(fragment(raw)?),
        Entry::Icmpv4(tc) => MatchEntry::Icmpv4(icmp(tc)),
        Entry::Icmpv6(tc) => MatchEntry::Icmpv6(icmp(tc)),
        Entry::Icmpv6Class(raw) => MatchEntry::Icmpv6Class(icmpv6_class(raw)?),
    })
}

fn rule(msg: pb::Rule) -> Result<RuleMessage, WireError> {
    Ok(RuleMessage {
        number: msg.number,
        result: msg.result,
        matches: msg
            .matches
            .into_iter()
            .map(match_entry)
            .collect::<Result<_, _>>()?,
    })
}

/// Parses a serialized ruleset message.
pub fn decode(data: &[u8]) -> Result<RulesetMessage, WireError> {
    let msg = pb::Rules::decode(data)?;
    Ok(RulesetMessage {
        traffic_type: traffic_type(msg.traffic_type)?,
        rules: msg.rules.into_iter().map(rule).collect::<Result<_, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ipv4_message_is_empty() {
        let msg = RulesetMessage::new(TrafficType::Ipv4);
        assert!(encode(&msg).is_empty());
    }

    #[test]
    fn test_ipv6_traffic_type_bytes() {
        let msg = RulesetMessage::new(TrafficType::Ipv6);
        assert_eq!(encode(&msg).as_ref(), &[0x08, 0x01]);
    }

    #[test]
    fn test_single_rule_bytes() {
        let mut msg = RulesetMessage::new(TrafficType::Ipv4);
        msg.add_rule(10, "a").matches.push(MatchEntry::ProtoBase(6));

        // rules{ number=10, result="a", matches{ proto_base=6 } }
        let expected = [
            0x12, 0x09, // field 2, len 9
            0x08, 0x0a, // number 10
            0x12, 0x01, b'a', // result "a"
            0x1a, 0x02, 0x28, 0x06, // matches{ field 5 = 6 }
        ];
        assert_eq!(encode(&msg).as_ref(), &expected);
    }

    #[test]
    fn test_oneof_zero_values_are_written() {
        let mut msg = RulesetMessage::new(TrafficType::Ipv4);
        let rule = msg.add_rule(1, "r");
        rule.matches.push(MatchEntry::Dscp(0));
        rule.matches.push(MatchEntry::Fragment(Fragment::Any));

        let bytes = encode(&msg);
        // matches{ dscp=0 } then matches{ fragment=ANY }
        assert!(bytes.ends_with(&[0x1a, 0x02, 0x38, 0x00, 0x1a, 0x02, 0x48, 0x00]));

        let decoded = decode(&bytes).unwrap();
        assert_eq!(
            decoded.rules[0].matches,
            vec![MatchEntry::Dscp(0), MatchEntry::Fragment(Fragment::Any)]
        );
    }

    #[test]
    fn test_icmp_code_presence_survives() {
        let mut msg = RulesetMessage::new(TrafficType::Ipv4);
        let rule = msg.add_rule(1, "r");
        rule.matches.push(MatchEntry::Icmpv4(IcmpTypeCode {
            typenum: 0,
            code: Some(0),
        }));
        rule.matches.push(MatchEntry::Icmpv4(IcmpTypeCode {
            typenum: 8,
            code: None,
        }));

        let decoded = decode(&encode(&msg)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_addresses_decode() {
        let mut msg = RulesetMessage::new(TrafficType::Ipv6);
        let rule = msg.add_rule(5, "drop");
        rule.matches.push(MatchEntry::SrcIp(IpPrefix {
            address: "2001:db8::".parse().unwrap(),
            length: 32,
        }));
        rule.matches.push(MatchEntry::DestIp(IpPrefix::host(
            "192.0.2.1".parse().unwrap(),
        )));

        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn test_truncated_input() {
        let mut msg = RulesetMessage::new(TrafficType::Ipv4);
        msg.add_rule(10, "accept");
        let bytes = encode(&msg);

        let err = decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, WireError::Decode(_)));
    }

    #[test]
    fn test_empty_match_rejected() {
        // rules{ matches{} }
        let err = decode(&[0x12, 0x02, 0x1a, 0x00]).unwrap_err();
        assert_eq!(err, WireError::EmptyMatch);
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        // traffic_type=7
        let err = decode(&[0x08, 0x07]).unwrap_err();
        assert_eq!(
            err,
            WireError::InvalidValue {
                what: "traffic_type",
                value: 7
            }
        );
    }

    #[test]
    fn test_unknown_fields_skipped() {
        // field 15 varint, field 14 fixed32, then traffic_type=1
        let data = [0x78, 0x05, 0x75, 0, 0, 0, 0, 0x08, 0x01];
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.traffic_type, TrafficType::Ipv6);
    }
}
