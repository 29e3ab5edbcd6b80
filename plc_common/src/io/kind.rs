//! I/O kind of a bindable located variable.
//!
//! Only four address classes map onto physical points:
//!
//! | Address | Kind |
//! |---------|------|
//! | `%IX..` | digital input |
//! | `%QX..` | digital output |
//! | `%IW..` | analog input |
//! | `%QW..` | analog output |
//!
//! Every other located variable stays internal to the process image.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::located::{LocatedAddress, Location, Size};

/// I/O point kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum IoKind {
    Di = 0,
    Do = 1,
    Ai = 2,
    Ao = 3,
}

impl IoKind {
    /// All kinds, in setup and publication order.
    pub const ALL: [Self; 4] = [Self::Di, Self::Do, Self::Ai, Self::Ao];

    /// Kind of a located variable, or `None` if it is not bindable.
    pub fn of(address: &LocatedAddress) -> Option<Self> {
        match (address.location, address.size) {
            (Location::Input, Size::Bit) => Some(Self::Di),
            (Location::Output, Size::Bit) => Some(Self::Do),
            (Location::Input, Size::Word) => Some(Self::Ai),
            (Location::Output, Size::Word) => Some(Self::Ao),
            _ => None,
        }
    }

    /// `true` for kinds sampled during input capture.
    pub fn is_input(self) -> bool {
        matches!(self, Self::Di | Self::Ai)
    }

    /// `true` for analog kinds.
    pub fn is_analog(self) -> bool {
        matches!(self, Self::Ai | Self::Ao)
    }
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Di => write!(f, "di"),
            Self::Do => write!(f, "do"),
            Self::Ai => write!(f, "ai"),
            Self::Ao => write!(f, "ao"),
        }
    }
}

impl FromStr for IoKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "di" => Ok(Self::Di),
            "do" => Ok(Self::Do),
            "ai" => Ok(Self::Ai),
            "ao" => Ok(Self::Ao),
            _ => Err(format!("unknown IoKind: {s:?}")),
        }
    }
}
