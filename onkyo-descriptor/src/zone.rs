//! Zone identifiers.

use std::fmt;

/// One of the four independently controllable outputs of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneId {
    Main,
    Zone2,
    Zone3,
    Zone4,
}

impl ZoneId {
    /// All zones in descriptor order.
    pub const ALL: [ZoneId; 4] = [ZoneId::Main, ZoneId::Zone2, ZoneId::Zone3, ZoneId::Zone4];

    /// Zone number as used by the descriptor (`1..=4`).
    pub fn number(self) -> u8 {
        match self {
            ZoneId::Main => 1,
            ZoneId::Zone2 => 2,
            ZoneId::Zone3 => 3,
            ZoneId::Zone4 => 4,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(ZoneId::Main),
            2 => Some(ZoneId::Zone2),
            3 => Some(ZoneId::Zone3),
            4 => Some(ZoneId::Zone4),
            _ => None,
        }
    }

    pub fn is_main(self) -> bool {
        self == ZoneId::Main
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneId::Main => write!(f, "Main"),
            other => write!(f, "Zone {}", other.number()),
        }
    }
}
