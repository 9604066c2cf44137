//! ICMP and ICMPv6 message names
//!
//! Each name resolves to a `(type, code)` pair. Names that cover every code of
//! a type carry [`CODE_UNUSED`] and compile to a type-only match.

/// Code sentinel: the name matches all codes of its type
pub const CODE_UNUSED: u32 = 256;

/// Type emitted when an ICMP match names an unknown message
pub const TYPE_UNRESOLVED: u32 = 256;

pub const ICMPV4_NAMES: &[(&str, u32, u32)] = &[
    ("echo-reply", 0, CODE_UNUSED),
    ("destination-unreachable", 3, CODE_UNUSED),
    ("network-unreachable", 3, 0),
    ("host-unreachable", 3, 1),
    ("protocol-unreachable", 3, 2),
    ("port-unreachable", 3, 3),
    ("fragmentation-needed", 3, 4),
    ("source-route-failed", 3, 5),
    ("network-unknown", 3, 6),
    ("host-unknown", 3, 7),
    ("network-prohibited", 3, 9),
    ("host-prohibited", 3, 10),
    ("TOS-network-unreachable", 3, 11),
    ("TOS-host-unreachable", 3, 12),
    ("communication-prohibited", 3, 13),
    ("host-precedence-violation", 3, 14),
    ("precedence-cutoff", 3, 15),
    ("source-quench", 4, CODE_UNUSED),
    ("redirect", 5, CODE_UNUSED),
    ("network-redirect", 5, 0),
    ("host-redirect", 5, 1),
    ("TOS-network-redirect", 5, 2),
    ("TOS-host-redirect", 5, 3),
    ("echo-request", 8, CODE_UNUSED),
    ("router-advertisement", 9, CODE_UNUSED),
    ("router-solicitation", 10, CODE_UNUSED),
    ("time-exceeded", 11, CODE_UNUSED),
    ("ttl-zero-during-reassembly", 11, 0),
    ("ttl-zero-during-transit", 11, 1),
    ("parameter-problem", 12, CODE_UNUSED),
    ("ip-header-bad", 12, 0),
    ("required-option-missing", 12, 1),
    ("timestamp-request", 13, CODE_UNUSED),
    ("timestamp-reply", 14, CODE_UNUSED),
    ("address-mask-request", 17, CODE_UNUSED),
    ("address-mask-reply", 18, CODE_UNUSED),
];

pub const ICMPV6_NAMES: &[(&str, u32, u32)] = &[
    ("destination-unreachable", 1, CODE_UNUSED),
    ("no-route", 1, 0),
    ("communication-prohibited", 1, 1),
    ("address-unreachable", 1, 3),
    ("port-unreachable", 1, 4),
    ("packet-too-big", 2, CODE_UNUSED),
    ("time-exceeded", 3, CODE_UNUSED),
    ("ttl-zero-during-transit", 3, 0),
    ("ttl-zero-during-reassembly", 3, 1),
    ("parameter-problem", 4, CODE_UNUSED),
    ("bad-header", 4, 0),
    ("unknown-header-type", 4, 1),
    ("unknown-option", 4, 2),
    ("echo-request", 128, CODE_UNUSED),
    ("echo-reply", 129, CODE_UNUSED),
    ("multicast-listener-query", 130, CODE_UNUSED),
    ("multicast-listener-report", 131, CODE_UNUSED),
    ("multicast-listener-done", 132, CODE_UNUSED),
    ("router-solicitation", 133, CODE_UNUSED),
    ("router-advertisement", 134, CODE_UNUSED),
    ("neighbor-solicitation", 135, CODE_UNUSED),
    ("neighbor-advertisement", 136, CODE_UNUSED),
    ("redirect", 137, CODE_UNUSED),
    ("mobile-prefix-solicitation", 146, CODE_UNUSED),
    ("mobile-prefix-advertisement", 147, CODE_UNUSED),
];

/// ICMP flavour a lookup runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    const fn table(self) -> &'static [(&'static str, u32, u32)] {
        match self {
            Family::V4 => ICMPV4_NAMES,
            Family::V6 => ICMPV6_NAMES,
        }
    }
}

/// Resolves a message name to `(type, code)`; `code` is `None` for [`CODE_UNUSED`].
pub fn lookup(family: Family, name: &str) -> Option<(u32, Option<u32>)> {
    family
        .table()
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|&(_, typenum, code)| (typenum, normalize_code(Some(code))))
}

/// Drops the code when it is absent or the "all codes" sentinel.
pub fn normalize_code(code: Option<u32>) -> Option<u32> {
    code.filter(|c| *c != CODE_UNUSED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4_lookup() {
        assert_eq!(lookup(Family::V4, "echo-request"), Some((8, None)));
        assert_eq!(lookup(Family::V4, "host-unreachable"), Some((3, Some(1))));
        assert_eq!(lookup(Family::V4, "network-redirect"), Some((5, Some(0))));
        assert_eq!(lookup(Family::V4, "packet-too-big"), None);
    }

    #[test]
    fn test_v6_lookup() {
        assert_eq!(lookup(Family::V6, "packet-too-big"), Some((2, None)));
        assert_eq!(lookup(Family::V6, "echo-request"), Some((128, None)));
        assert_eq!(lookup(Family::V6, "unknown-option"), Some((4, Some(2))));
        assert_eq!(lookup(Family::V6, "source-quench"), None);
    }

    #[test]
    fn test_same_name_differs_by_family() {
        assert_eq!(lookup(Family::V4, "time-exceeded"), Some((11, None)));
        assert_eq!(lookup(Family::V6, "time-exceeded"), Some((3, None)));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(Some(CODE_UNUSED)), None);
        assert_eq!(normalize_code(Some(0)), Some(0));
        assert_eq!(normalize_code(None), None);
    }
}
