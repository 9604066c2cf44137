//! IP protocol number resolution
//!
//! Two sources back the lookups:
//!
//! - [`STATIC_PROTOCOLS`]: the IANA names the rule compiler accepts in a
//!   `protocol` match, always available.
//! - The system registry (`/etc/protocols`), parsed lazily once per process
//!   through [`registry()`]. A missing or unreadable registry is an empty table.
//!
//! [`name_to_number`] and [`number_to_name`] never fail: unknown names resolve
//! to `0` and unknown numbers render as their decimal string.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Path of the system protocol registry
pub const REGISTRY_PATH: &str = "/etc/protocols";

/// Protocol value emitted when a `protocol` match names something unknown
pub const PROTO_UNRESOLVED: u32 = 256;

/// IANA protocol names accepted by the rule compiler.
pub const STATIC_PROTOCOLS: &[(&str, u32)] = &[
    ("hopopt", 0),
    ("icmp", 1),
    ("igmp", 2),
    ("ggp", 3),
    ("ipencap", 4),
    ("st", 5),
    ("tcp", 6),
    ("egp", 8),
    ("igp", 9),
    ("pup", 12),
    ("udp", 17),
    ("hmp", 20),
    ("xns-idp", 22),
    ("rdp", 27),
    ("iso-tp4", 29),
    ("dccp", 33),
    ("xtp", 36),
    ("ddp", 37),
    ("idpr-cmtp", 38),
    ("ipv6", 41),
    ("ipv6-route", 43),
    ("ipv6-frag", 44),
    ("idrp", 45),
    ("rsvp", 46),
    ("gre", 47),
    ("esp", 50),
    ("ah", 51),
    ("skip", 57),
    ("ipv6-icmp", 58),
    ("ipv6-nonxt", 59),
    ("ipv6-opts", 60),
    ("rspf", 73),
    ("vmtp", 81),
    ("eigrp", 88),
    ("ospf", 89),
    ("ax.25", 93),
    ("ipip", 94),
    ("etherip", 97),
    ("encap", 98),
    ("pim", 103),
    ("ipcomp", 108),
    ("vrrp", 112),
    ("l2tp", 115),
    ("isis", 124),
    ("sctp", 132),
    ("fc", 133),
    ("mobility-header", 135),
    ("udplite", 136),
    ("mpls-in-ip", 137),
    ("manet", 138),
    ("hip", 139),
    ("shim6", 140),
    ("wesp", 141),
    ("rohc", 142),
];

/// Looks up a name in [`STATIC_PROTOCOLS`].
pub fn lookup_static(name: &str) -> Option<u32> {
    STATIC_PROTOCOLS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, num)| num)
}

/// Fast path shared by both lookup directions
const COMMON: [(&str, u32); 4] = [("icmp", 1), ("tcp", 6), ("udp", 17), ("ipv6-icmp", 58)];

/// Protocol table built from the `/etc/protocols` format.
///
/// Each non-comment line is `name number [aliases...]`. Names and aliases map
/// to the number; the number maps back to the canonical (first) name.
#[derive(Debug, Default, Clone)]
pub struct ProtocolTable {
    by_number: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
}

impl ProtocolTable {
    /// Parses registry text. Malformed lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut table = Self::default();

        for line in content.lines() {
            let data = line.split('#').next().unwrap_or_default();
            let mut fields = data.split_whitespace();
            let (Some(name), Some(number)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(number) = number.parse::<u32>() else {
                continue;
            };

            table
                .by_number
                .entry(number)
                .or_insert_with(|| name.to_string());
            table.by_name.insert(name.to_string(), number);
            for alias in fields {
                table.by_name.entry(alias.to_string()).or_insert(number);
            }
        }

        table
    }

    /// Reads and parses a registry file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn name(&self, number: u32) -> Option<&str> {
        self.by_number.get(&number).map(String::as_str)
    }

    pub fn number(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}

static REGISTRY: LazyLock<ProtocolTable> = LazyLock::new(load_registry);

/// Returns the process-wide registry, loading it on first use.
pub fn registry() -> &'static ProtocolTable {
    &REGISTRY
}

fn load_registry() -> ProtocolTable {
    match ProtocolTable::load(Path::new(REGISTRY_PATH)) {
        Ok(table) if table.is_empty() => {
            warn!("Protocol registry {} has no entries", REGISTRY_PATH);
            table
        }
        Ok(table) => {
            debug!("Loaded {} protocols from {}", table.len(), REGISTRY_PATH);
            table
        }
        Err(e) => {
            warn!("Protocol registry {} unavailable: {}", REGISTRY_PATH, e);
            ProtocolTable::default()
        }
    }
}

/// Protocol name or number to number.
///
/// `ip` and `ipv6` are listed in the registry but mean "any protocol" here,
/// so they resolve to 0, as does anything the registry does not know.
pub fn name_to_number(name: &str) -> u32 {
    name_to_number_in(registry(), name)
}

fn name_to_number_in(table: &ProtocolTable, name: &str) -> u32 {
    if matches!(name, "ip" | "ipv6") {
        return 0;
    }

    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
        return name.parse().unwrap_or(0);
    }

    if let Some(&(_, num)) = COMMON.iter().find(|(n, _)| *n == name) {
        return num;
    }

    table.number(name).unwrap_or(0)
}

/// Protocol number to name, falling back to the decimal number.
pub fn number_to_name(number: u32) -> String {
    number_to_name_in(registry(), number)
}

fn number_to_name_in(table: &ProtocolTable, number: u32) -> String {
    match number {
        1 => "icmp".to_string(),
        6 => "tcp".to_string(),
        17 => "udp".to_string(),
        // Short form of ipv6-icmp
        58 => "icmpv6".to_string(),
        _ => table
            .name(number)
            .map_or_else(|| number.to_string(), str::to_string),
    }
}
