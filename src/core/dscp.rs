//! DSCP code-point names
//!
//! Named code points accepted wherever a DSCP value may be written, plus the
//! parser that also accepts numeric literals.

use std::str::FromStr;

/// Highest valid DSCP value (6-bit field)
pub const DSCP_MAX: u8 = 63;

/// DSCP value emitted when a `dscp` match names an unknown code point
pub const DSCP_UNRESOLVED: u32 = 64;

/// Named DSCP code point
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum CodePoint {
    Default,
    Cs0,
    Cs1,
    Cs2,
    Cs3,
    Cs4,
    Cs5,
    Cs6,
    Cs7,
    Af11,
    Af12,
    Af13,
    Af21,
    Af22,
    Af23,
    Af31,
    Af32,
    Af33,
    Af41,
    Af42,
    Af43,
    Ef,
    Va,
}

impl CodePoint {
    pub const fn value(self) -> u8 {
        match self {
            CodePoint::Default | CodePoint::Cs0 => 0,
            CodePoint::Cs1 => 8,
            CodePoint::Cs2 => 16,
            CodePoint::Cs3 => 24,
            CodePoint::Cs4 => 32,
            CodePoint::Cs5 => 40,
            CodePoint::Cs6 => 48,
            CodePoint::Cs7 => 56,
            CodePoint::Af11 => 10,
            CodePoint::Af12 => 12,
            CodePoint::Af13 => 14,
            CodePoint::Af21 => 18,
            CodePoint::Af22 => 20,
            CodePoint::Af23 => 22,
            CodePoint::Af31 => 26,
            CodePoint::Af32 => 28,
            CodePoint::Af33 => 30,
            CodePoint::Af41 => 34,
            CodePoint::Af42 => 36,
            CodePoint::Af43 => 38,
            CodePoint::Ef => 46,
            CodePoint::Va => 44,
        }
    }
}

/// Resolves a code-point name to its value.
pub fn lookup_name(name: &str) -> Option<u8> {
    CodePoint::from_str(name).ok().map(CodePoint::value)
}

/// Resolves a DSCP list entry: a code-point name, else a decimal literal
/// passed through as written.
pub fn parse_value(input: &str) -> Option<u32> {
    lookup_name(input)
        .map(u32::from)
        .or_else(|| input.parse::<u32>().ok())
}
