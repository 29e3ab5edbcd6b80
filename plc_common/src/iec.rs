//! IEC 61131-3 elementary data types.
//!
//! The logic engine and the scan runtime exchange data through typed memory
//! cells. Each cell holds one [`IecValue`]; Rust code accesses cells through
//! the statically typed [`IecType`] trait.

use core::fmt;
use serde::{Deserialize, Serialize};

pub type IecBool = bool;

pub type IecSint = i8;
pub type IecInt = i16;
pub type IecDint = i32;
pub type IecLint = i64;

pub type IecUsint = u8;
pub type IecUint = u16;
pub type IecUdint = u32;
pub type IecUlint = u64;

pub type IecByte = u8;
pub type IecWord = u16;
pub type IecDword = u32;
pub type IecLword = u64;

pub type IecReal = f32;
pub type IecLreal = f64;

// ─── ElementaryType ─────────────────────────────────────────────────

/// Type tag of a memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementaryType {
    Bool,
    Sint,
    Int,
    Dint,
    Lint,
    Usint,
    Uint,
    Udint,
    Ulint,
    Real,
    Lreal,
}

impl ElementaryType {
    /// Parse an IEC type keyword as emitted by the program compiler.
    ///
    /// Bit-string types map onto the unsigned type of the same width.
    pub fn from_keyword(s: &str) -> Option<Self> {
        let ty = match s.trim().to_ascii_uppercase().as_str() {
            "BOOL" => Self::Bool,
            "SINT" => Self::Sint,
            "INT" => Self::Int,
            "DINT" => Self::Dint,
            "LINT" => Self::Lint,
            "USINT" | "BYTE" => Self::Usint,
            "UINT" | "WORD" => Self::Uint,
            "UDINT" | "DWORD" => Self::Udint,
            "ULINT" | "LWORD" => Self::Ulint,
            "REAL" => Self::Real,
            "LREAL" => Self::Lreal,
            _ => return None,
        };
        Some(ty)
    }

    /// Zero value of this type.
    pub fn zero(self) -> IecValue {
        match self {
            Self::Bool => IecValue::Bool(false),
            Self::Sint => IecValue::Sint(0),
            Self::Int => IecValue::Int(0),
            Self::Dint => IecValue::Dint(0),
            Self::Lint => IecValue::Lint(0),
            Self::Usint => IecValue::Usint(0),
            Self::Uint => IecValue::Uint(0),
            Self::Udint => IecValue::Udint(0),
            Self::Ulint => IecValue::Ulint(0),
            Self::Real => IecValue::Real(0.0),
            Self::Lreal => IecValue::Lreal(0.0),
        }
    }
}

impl fmt::Display for ElementaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "BOOL",
            Self::Sint => "SINT",
            Self::Int => "INT",
            Self::Dint => "DINT",
            Self::Lint => "LINT",
            Self::Usint => "USINT",
            Self::Uint => "UINT",
            Self::Udint => "UDINT",
            Self::Ulint => "ULINT",
            Self::Real => "REAL",
            Self::Lreal => "LREAL",
        };
        f.write_str(s)
    }
}

// ─── IecValue ───────────────────────────────────────────────────────

/// Dynamically typed content of one memory cell.
///
/// Serializes untagged, so telemetry carries plain JSON scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IecValue {
    Bool(IecBool),
    Sint(IecSint),
    Int(IecInt),
    Dint(IecDint),
    Lint(IecLint),
    Usint(IecUsint),
    Uint(IecUint),
    Udint(IecUdint),
    Ulint(IecUlint),
    Real(IecReal),
    Lreal(IecLreal),
}

impl IecValue {
    /// Type tag of the value.
    pub fn elementary_type(&self) -> ElementaryType {
        match self {
            Self::Bool(_) => ElementaryType::Bool,
            Self::Sint(_) => ElementaryType::Sint,
            Self::Int(_) => ElementaryType::Int,
            Self::Dint(_) => ElementaryType::Dint,
            Self::Lint(_) => ElementaryType::Lint,
            Self::Usint(_) => ElementaryType::Usint,
            Self::Uint(_) => ElementaryType::Uint,
            Self::Udint(_) => ElementaryType::Udint,
            Self::Ulint(_) => ElementaryType::Ulint,
            Self::Real(_) => ElementaryType::Real,
            Self::Lreal(_) => ElementaryType::Lreal,
        }
    }
}

impl fmt::Display for IecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Self::Sint(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Dint(v) => write!(f, "{v}"),
            Self::Lint(v) => write!(f, "{v}"),
            Self::Usint(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Udint(v) => write!(f, "{v}"),
            Self::Ulint(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Lreal(v) => write!(f, "{v}"),
        }
    }
}

// ─── IecType ────────────────────────────────────────────────────────

/// Rust types that can live in a memory cell.
pub trait IecType: Copy + Default + PartialEq + 'static {
    /// Cell type tag.
    const TYPE: ElementaryType;

    /// Wrap into a cell value.
    fn into_value(self) -> IecValue;

    /// Unwrap a cell value; `None` on type mismatch.
    fn from_value(value: IecValue) -> Option<Self>;
}

macro_rules! impl_iec_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl IecType for $ty {
                const TYPE: ElementaryType = ElementaryType::$variant;

                #[inline]
                fn into_value(self) -> IecValue {
                    IecValue::$variant(self)
                }

                #[inline]
                fn from_value(value: IecValue) -> Option<Self> {
                    match value {
                        IecValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_iec_type! {
    bool => Bool,
    i8 => Sint,
    i16 => Int,
    i32 => Dint,
    i64 => Lint,
    u8 => Usint,
    u16 => Uint,
    u32 => Udint,
    u64 => Ulint,
    f32 => Real,
    f64 => Lreal,
}
