//! Located variables (IEC 61131-3 directly represented variables).
//!
//! A located variable names a cell by its position in the process image:
//! `%IX0.3` is input bit 3 of byte 0, `%QW0` is output word 0. The program
//! compiler emits the same addresses in a mangled form (`__IX0_3`) inside
//! `LOCATED_VARIABLES.h`, one `__LOCATED_VAR(...)` line per variable the
//! program actually uses. Both spellings are accepted here.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::iec::ElementaryType;

/// Located variable parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatedError {
    /// Address string is not a valid located variable.
    #[error("invalid located variable '{address}': {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    /// `__LOCATED_VAR` entry carries a type keyword we cannot store.
    #[error("line {line}: unsupported IEC type '{keyword}' for {address}")]
    UnsupportedType {
        line: usize,
        keyword: String,
        address: String,
    },
}

// ─── Location / Size prefixes ───────────────────────────────────────

/// Location prefix of a located variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// `I`: physical input.
    Input,
    /// `Q`: physical output.
    Output,
    /// `M`: internal memory.
    Memory,
}

impl Location {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(Self::Input),
            'Q' => Some(Self::Output),
            'M' => Some(Self::Memory),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Input => 'I',
            Self::Output => 'Q',
            Self::Memory => 'M',
        }
    }
}

/// Size prefix of a located variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    /// `X`: 1 bit.
    Bit,
    /// `B`: 8 bit.
    Byte,
    /// `W`: 16 bit.
    Word,
    /// `D`: 32 bit.
    DWord,
    /// `L`: 64 bit.
    LWord,
}

impl Size {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'X' => Some(Self::Bit),
            'B' => Some(Self::Byte),
            'W' => Some(Self::Word),
            'D' => Some(Self::DWord),
            'L' => Some(Self::LWord),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Bit => 'X',
            Self::Byte => 'B',
            Self::Word => 'W',
            Self::DWord => 'D',
            Self::LWord => 'L',
        }
    }

    /// Cell type implied by the size prefix.
    pub fn default_type(self) -> ElementaryType {
        match self {
            Self::Bit => ElementaryType::Bool,
            Self::Byte => ElementaryType::Usint,
            Self::Word => ElementaryType::Uint,
            Self::DWord => ElementaryType::Udint,
            Self::LWord => ElementaryType::Ulint,
        }
    }
}

// ─── LocatedAddress ─────────────────────────────────────────────────

/// Parsed located variable address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocatedAddress {
    pub location: Location,
    pub size: Size,
    /// Hierarchical indices (`%IX0.3` → `[0, 3]`).
    pub indices: Vec<u32>,
}

impl LocatedAddress {
    /// Build an address from its parts.
    pub fn new(location: Location, size: Size, indices: &[u32]) -> Self {
        Self {
            location,
            size,
            indices: indices.to_vec(),
        }
    }

    /// Mangled name used by generated code (`__IX0_3`).
    pub fn mangled(&self) -> String {
        let mut s = format!("__{}{}", self.location.as_char(), self.size.as_char());
        for (i, idx) in self.indices.iter().enumerate() {
            if i > 0 {
                s.push('_');
            }
            s.push_str(&idx.to_string());
        }
        s
    }
}

impl fmt::Display for LocatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}{}", self.location.as_char(), self.size.as_char())?;
        for (i, idx) in self.indices.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{idx}")?;
        }
        Ok(())
    }
}

impl FromStr for LocatedAddress {
    type Err = LocatedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| LocatedError::InvalidAddress {
            address: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let (body, separator) = if let Some(rest) = trimmed.strip_prefix('%') {
            (rest, '.')
        } else if let Some(rest) = trimmed.strip_prefix("__") {
            (rest, '_')
        } else {
            return Err(invalid("expected '%' or '__' prefix"));
        };

        let mut chars = body.chars();
        let location = chars
            .next()
            .and_then(Location::from_char)
            .ok_or_else(|| invalid("location prefix must be I, Q or M"))?;
        let size = chars
            .next()
            .and_then(Size::from_char)
            .ok_or_else(|| invalid("size prefix must be X, B, W, D or L"))?;

        let rest = chars.as_str();
        if rest.is_empty() {
            return Err(invalid("missing index"));
        }
        let indices = rest
            .split(separator)
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid("indices must be unsigned integers"))?;

        Ok(Self {
            location,
            size,
            indices,
        })
    }
}

impl Serialize for LocatedAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocatedAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─── LocatedVariable ────────────────────────────────────────────────

/// A located variable declared by a compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedVariable {
    pub address: LocatedAddress,
    pub ty: ElementaryType,
}

impl LocatedVariable {
    /// Declare a variable with the type implied by its size prefix.
    pub fn new(address: LocatedAddress) -> Self {
        let ty = address.size.default_type();
        Self { address, ty }
    }
}

/// Parse the body of a generated `LOCATED_VARIABLES.h`.
///
/// Each `__LOCATED_VAR(TYPE,NAME,LOC,SIZE,idx...)` line yields one variable.
/// Lines without the macro and entries with fewer than two fields are
/// skipped.
pub fn parse_located_variables(src: &str) -> Result<Vec<LocatedVariable>, LocatedError> {
    let mut vars = Vec::new();

    for (lineno, line) in src.lines().enumerate() {
        if !line.contains("__LOCATED_VAR") {
            continue;
        }
        let Some(args) = line
            .split_once('(')
            .and_then(|(_, tail)| tail.split_once(')'))
            .map(|(args, _)| args)
        else {
            continue;
        };

        let fields: Vec<&str> = args.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            continue;
        }

        let address: LocatedAddress = fields[1].parse()?;
        let ty = ElementaryType::from_keyword(fields[0]).ok_or_else(|| {
            LocatedError::UnsupportedType {
                line: lineno + 1,
                keyword: fields[0].to_string(),
                address: address.to_string(),
            }
        })?;
        vars.push(LocatedVariable { address, ty });
    }

    Ok(vars)
}
