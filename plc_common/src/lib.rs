//! PLC Common Library
//!
//! Shared types for the PLC scan runtime workspace: IEC 61131-3 elementary
//! types, located-variable addresses, I/O kinds, per-platform default pin
//! maps and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`iec`] - IEC elementary types and the dynamically typed [`iec::IecValue`]
//! - [`located`] - Located variable addresses (`%IX0.0`) and the generated
//!   `LOCATED_VARIABLES.h` parser
//! - [`io`] - I/O kinds, binding configuration and default pin maps
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide limits and defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use plc_common::located::LocatedAddress;
//!
//! let addr: LocatedAddress = "__IX0_1".parse().unwrap();
//! assert_eq!(addr.to_string(), "%IX0.1");
//! ```

pub mod config;
pub mod consts;
pub mod iec;
pub mod io;
pub mod located;
pub mod prelude;
