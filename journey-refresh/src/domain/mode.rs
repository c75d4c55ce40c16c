//! Transport mode codes.

use std::fmt;

/// A transport mode, identified by the backend's product class code.
///
/// Unknown codes are preserved as [`TransportMode::Other`] so that a mode
/// filter never silently drops a code the backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportMode {
    Train,
    Metro,
    LightRail,
    Bus,
    Coach,
    Ferry,
    SchoolBus,
    /// Walking between stops (footpath legs).
    Walk,
    /// A product class this crate has no name for.
    Other(u16),
}

impl TransportMode {
    /// Map a product class code to a mode.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => TransportMode::Train,
            2 => TransportMode::Metro,
            4 => TransportMode::LightRail,
            5 => TransportMode::Bus,
            7 => TransportMode::Coach,
            9 => TransportMode::Ferry,
            11 => TransportMode::SchoolBus,
            99 | 100 => TransportMode::Walk,
            other => TransportMode::Other(other),
        }
    }

    /// The product class code sent to the backend.
    pub fn code(&self) -> u16 {
        match self {
            TransportMode::Train => 1,
            TransportMode::Metro => 2,
            TransportMode::LightRail => 4,
            TransportMode::Bus => 5,
            TransportMode::Coach => 7,
            TransportMode::Ferry => 9,
            TransportMode::SchoolBus => 11,
            TransportMode::Walk => 99,
            TransportMode::Other(code) => *code,
        }
    }

    /// Returns true for footpath legs.
    pub fn is_walk(&self) -> bool {
        matches!(self, TransportMode::Walk)
    }

    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            TransportMode::Train => "Train",
            TransportMode::Metro => "Metro",
            TransportMode::LightRail => "Light Rail",
            TransportMode::Bus => "Bus",
            TransportMode::Coach => "Coach",
            TransportMode::Ferry => "Ferry",
            TransportMode::SchoolBus => "School Bus",
            TransportMode::Walk => "Walk",
            TransportMode::Other(_) => "Other",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Other(code) => write!(f, "Other({code})"),
            mode => f.write_str(mode.name()),
        }
    }
}
