//! Match predicates
//!
//! A rule's `match` object is keyed by match kind. Each recognised key is
//! parsed once into a typed [`Predicate`]; unknown keys are skipped. Predicates
//! are returned sorted by [`MatchKind`], and every nested object is walked in
//! lexicographic key order, so the compiled output never depends on the key
//! order of the input document.

use crate::core::dscp::{self, DSCP_UNRESOLVED};
use crate::core::error::{Error, Result};
use crate::core::icmp::{self, Family, TYPE_UNRESOLVED};
use crate::core::protocols::{self, PROTO_UNRESOLVED};
use crate::core::ruleset::{Fragment, IcmpTypeCode, Icmpv6Class, IpPrefix, MatchEntry};
use ipnetwork::IpNetwork;
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::str::FromStr;
use tracing::debug;

/// Match kinds, ordered by identifier
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum MatchKind {
    Destination,
    Dscp,
    Fragment,
    Icmp,
    Icmpv6,
    Protocol,
    Source,
    Ttl,
}

/// A host address or a network prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressValue {
    Host(IpAddr),
    Prefix(IpNetwork),
}

impl AddressValue {
    /// Network address plus prefix length; hosts get a full-length prefix.
    pub fn to_prefix(self) -> IpPrefix {
        match self {
            AddressValue::Host(addr) => IpPrefix::host(addr),
            AddressValue::Prefix(net) => IpPrefix {
                address: net.network(),
                length: net.prefix(),
            },
        }
    }
}

/// One item of a source/destination match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointItem {
    Address(AddressValue),
    /// Port lists hold at most one element; an empty list is `None`
    Port(Option<u16>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoLayer {
    Base,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoValue {
    Name(String),
    Number(u32),
    Unspecified,
}

impl ProtoValue {
    /// Names resolve through the static IANA table only, so the result never
    /// depends on the host's registry. Unknown names are [`PROTO_UNRESOLVED`].
    pub fn resolve(&self) -> u32 {
        match self {
            ProtoValue::Name(name) => {
                protocols::lookup_static(name).unwrap_or(PROTO_UNRESOLVED)
            }
            ProtoValue::Number(num) => *num,
            ProtoValue::Unspecified => PROTO_UNRESOLVED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DscpValue {
    Name(String),
    Number(u32),
}

impl DscpValue {
    pub fn resolve(&self) -> u32 {
        match self {
            DscpValue::Name(name) => dscp::lookup_name(name).map_or(DSCP_UNRESOLVED, u32::from),
            DscpValue::Number(num) => *num,
        }
    }
}

/// One selector of an ICMP match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmpSelector {
    Class(Icmpv6Class),
    Name(String),
    Type { typenum: u32, code: Option<u32> },
}

/// A parsed match predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Destination(Vec<EndpointItem>),
    Dscp(DscpValue),
    Fragment(Fragment),
    Icmp(Vec<IcmpSelector>),
    Icmpv6(Vec<IcmpSelector>),
    Protocol(Vec<(ProtoLayer, ProtoValue)>),
    Source(Vec<EndpointItem>),
    Ttl(u32),
}

impl Predicate {
    pub fn kind(&self) -> MatchKind {
        match self {
            Predicate::Destination(_) => MatchKind::Destination,
            Predicate::Dscp(_) => MatchKind::Dscp,
            Predicate::Fragment(_) => MatchKind::Fragment,
            Predicate::Icmp(_) => MatchKind::Icmp,
            Predicate::Icmpv6(_) => MatchKind::Icmpv6,
            Predicate::Protocol(_) => MatchKind::Protocol,
            Predicate::Source(_) => MatchKind::Source,
            Predicate::Ttl(_) => MatchKind::Ttl,
        }
    }

    /// Appends this predicate's match entries.
    pub fn compile_into(&self, out: &mut Vec<MatchEntry>) {
        match self {
            Predicate::Destination(items) => compile_endpoint(true, items, out),
            Predicate::Source(items) => compile_endpoint(false, items, out),
            Predicate::Protocol(selectors) => {
                for (layer, value) in selectors {
                    let num = value.resolve();
                    out.push(match layer {
                        ProtoLayer::Base => MatchEntry::ProtoBase(num),
                        ProtoLayer::Final => MatchEntry::ProtoFinal(num),
                    });
                }
            }
            Predicate::Dscp(value) => out.push(MatchEntry::Dscp(value.resolve())),
            Predicate::Fragment(frag) => out.push(MatchEntry::Fragment(*frag)),
            Predicate::Icmp(selectors) => compile_icmp(Family::V4, selectors, out),
            Predicate::Icmpv6(selectors) => compile_icmp(Family::V6, selectors, out),
            Predicate::Ttl(ttl) => out.push(MatchEntry::Ttl(*ttl)),
        }
    }
}

fn compile_endpoint(is_dest: bool, items: &[EndpointItem], out: &mut Vec<MatchEntry>) {
    for item in items {
        match *item {
            EndpointItem::Address(addr) => {
                let prefix = addr.to_prefix();
                out.push(if is_dest {
                    MatchEntry::DestIp(prefix)
                } else {
                    MatchEntry::SrcIp(prefix)
                });
            }
            EndpointItem::Port(Some(port)) => {
                let port = u32::from(port);
                out.push(if is_dest {
                    MatchEntry::DestPort(port)
                } else {
                    MatchEntry::SrcPort(port)
                });
            }
            EndpointItem::Port(None) => {}
        }
    }
}

fn compile_icmp(family: Family, selectors: &[IcmpSelector], out: &mut Vec<MatchEntry>) {
    let wrap = |tc: IcmpTypeCode| match family {
        Family::V4 => MatchEntry::Icmpv4(tc),
        Family::V6 => MatchEntry::Icmpv6(tc),
    };

    for selector in selectors {
        match selector {
            IcmpSelector::Class(class) => {
                if family == Family::V6 {
                    out.push(MatchEntry::Icmpv6Class(*class));
                } else {
                    debug!("Ignoring ICMP class selector on an IPv4 match");
                }
            }
            IcmpSelector::Name(name) => {
                let (typenum, code) = icmp::lookup(family, name).unwrap_or_else(|| {
                    debug!("Unknown ICMP name '{}'", name);
                    (TYPE_UNRESOLVED, None)
                });
                out.push(wrap(IcmpTypeCode { typenum, code }));
            }
            IcmpSelector::Type { typenum, code } => {
                out.push(wrap(IcmpTypeCode {
                    typenum: *typenum,
                    code: icmp::normalize_code(*code),
                }));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════════

/// Object entries in lexicographic key order.
fn sorted_entries(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::config(context, "expected an object"))
}

fn as_str<'a>(value: &'a Value, context: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::config(context, "expected a string"))
}

/// Accepts a JSON number or a numeric string.
pub(crate) fn as_u32(value: &Value, context: &str) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::config(context, format!("expected an unsigned number, got {value}")))
}

fn parse_address(key: &str, value: &Value, context: &str) -> Result<AddressValue> {
    let text = as_str(value, context)?;
    if key == "host" {
        IpAddr::from_str(text)
            .map(AddressValue::Host)
            .map_err(|e| Error::config(context, format!("invalid host '{text}': {e}")))
    } else {
        IpNetwork::from_str(text)
            .map(AddressValue::Prefix)
            .map_err(|e| Error::config(context, format!("invalid prefix '{text}': {e}")))
    }
}

fn parse_endpoint(value: &Value, context: &str) -> Result<Vec<EndpointItem>> {
    let mut items = Vec::new();

    for (field, field_value) in sorted_entries(as_object(value, context)?) {
        let sub = as_object(field_value, context)?;
        if field == "ipv4" || field == "ipv6" {
            for (key, addr) in sorted_entries(sub) {
                items.push(EndpointItem::Address(parse_address(key, addr, context)?));
            }
        } else {
            for (_, list) in sorted_entries(sub) {
                let first = match list {
                    Value::Array(values) => values.first(),
                    other => Some(other),
                };
                let port = first
                    .map(|v| {
                        as_u32(v, context).and_then(|p| {
                            u16::try_from(p)
                                .map_err(|_| Error::config(context, format!("port {p} out of range")))
                        })
                    })
                    .transpose()?;
                items.push(EndpointItem::Port(port));
            }
        }
    }

    Ok(items)
}

fn parse_protocol(value: &Value, context: &str) -> Result<Vec<(ProtoLayer, ProtoValue)>> {
    let mut selectors = Vec::new();

    for (layer, spec) in sorted_entries(as_object(value, context)?) {
        let layer = if layer == "base" {
            ProtoLayer::Base
        } else {
            ProtoLayer::Final
        };
        let spec = as_object(spec, context)?;
        let proto = if let Some(name) = spec.get("name") {
            ProtoValue::Name(as_str(name, context)?.to_string())
        } else if let Some(number) = spec.get("number") {
            ProtoValue::Number(as_u32(number, context)?)
        } else {
            ProtoValue::Unspecified
        };
        selectors.push((layer, proto));
    }

    Ok(selectors)
}

fn parse_dscp(value: &Value, context: &str) -> Result<Option<DscpValue>> {
    let spec = as_object(value, context)?;
    if let Some(name) = spec.get("name") {
        return Ok(Some(DscpValue::Name(as_str(name, context)?.to_string())));
    }
    sorted_entries(spec)
        .first()
        .map(|(_, v)| as_u32(v, context).map(DscpValue::Number))
        .transpose()
}

fn parse_icmp(value: &Value, context: &str) -> Result<Vec<IcmpSelector>> {
    let mut selectors = Vec::new();

    for (key, spec) in sorted_entries(as_object(value, context)?) {
        match key {
            "class" => selectors.push(IcmpSelector::Class(Icmpv6Class::from_config(as_str(
                spec, context,
            )?))),
            "name" => selectors.push(IcmpSelector::Name(as_str(spec, context)?.to_string())),
            "type" => {
                let first = match spec {
                    Value::Array(values) => values.first(),
                    other => Some(other),
                };
                if let Some(entry) = first {
                    let entry = as_object(entry, context)?;
                    let typenum = entry
                        .get("type-number")
                        .map(|v| as_u32(v, context))
                        .transpose()?
                        .unwrap_or(0);
                    let code = entry.get("code").map(|v| as_u32(v, context)).transpose()?;
                    selectors.push(IcmpSelector::Type { typenum, code });
                }
            }
            other => debug!("{}: skipping ICMP selector '{}'", context, other),
        }
    }

    Ok(selectors)
}

/// Parses one match kind's value. `Ok(None)` means the kind carries nothing to emit.
fn parse_predicate(kind: MatchKind, value: &Value, context: &str) -> Result<Option<Predicate>> {
    let predicate = match kind {
        MatchKind::Destination => Predicate::Destination(parse_endpoint(value, context)?),
        MatchKind::Source => Predicate::Source(parse_endpoint(value, context)?),
        MatchKind::Protocol => Predicate::Protocol(parse_protocol(value, context)?),
        MatchKind::Dscp => match parse_dscp(value, context)? {
            Some(dscp) => Predicate::Dscp(dscp),
            None => return Ok(None),
        },
        MatchKind::Fragment => Predicate::Fragment(Fragment::from_config(as_str(value, context)?)),
        MatchKind::Icmp => Predicate::Icmp(parse_icmp(value, context)?),
        MatchKind::Icmpv6 => Predicate::Icmpv6(parse_icmp(value, context)?),
        MatchKind::Ttl => match as_object(value, context)?.get("equals") {
            Some(equals) => Predicate::Ttl(as_u32(equals, context)?),
            None => return Ok(None),
        },
    };
    Ok(Some(predicate))
}

/// Parses a rule's `match` object into predicates sorted by kind.
pub fn parse_match(spec: &Map<String, Value>, context: &str) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::with_capacity(spec.len());

    for (key, value) in spec {
        let Ok(kind) = MatchKind::from_str(key) else {
            debug!("{}: skipping unknown match '{}'", context, key);
            continue;
        };
        if let Some(predicate) = parse_predicate(kind, value, context)? {
            predicates.push(predicate);
        }
    }

    predicates.sort_by_key(Predicate::kind);
    Ok(predicates)
}
