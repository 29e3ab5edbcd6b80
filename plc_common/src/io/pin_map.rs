//! Default variable-to-pin maps per target platform.
//!
//! Used when the configuration file does not list bindings explicitly.
//! Only the ESP8266 layout is populated; the other targets ship empty maps
//! and require explicit bindings.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::located::{LocatedAddress, Location, Size};

use super::config::BindingConfig;

/// Target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Esp8266,
    Esp32,
    Rp2040,
    Bk72xx,
    Rtl87xx,
    /// Host simulation; uses the ESP8266 layout.
    #[default]
    Simulation,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Esp8266 => "esp8266",
            Self::Esp32 => "esp32",
            Self::Rp2040 => "rp2040",
            Self::Bk72xx => "bk72xx",
            Self::Rtl87xx => "rtl87xx",
            Self::Simulation => "simulation",
        };
        f.write_str(s)
    }
}

/// ESP8266 board layout: `(location, size, indices, pin)`.
const ESP8266_PIN_MAP: &[(Location, Size, &[u32], &str)] = &[
    (Location::Input, Size::Bit, &[0, 0], "D4"),
    (Location::Input, Size::Bit, &[0, 1], "D5"),
    (Location::Input, Size::Bit, &[0, 2], "D6"),
    (Location::Input, Size::Bit, &[0, 3], "D7"),
    (Location::Output, Size::Bit, &[0, 0], "D0"),
    (Location::Output, Size::Bit, &[0, 1], "D1"),
    (Location::Output, Size::Bit, &[0, 2], "D2"),
    (Location::Output, Size::Bit, &[0, 3], "D3"),
    (Location::Input, Size::Word, &[0], "A0"),
    (Location::Output, Size::Word, &[0], "D8"),
];

impl Platform {
    /// Default bindings for this platform, grouped DI → DO → AI → AO.
    pub fn default_bindings(self) -> Vec<BindingConfig> {
        let map: &[(Location, Size, &[u32], &str)] = match self {
            Self::Esp8266 | Self::Simulation => ESP8266_PIN_MAP,
            Self::Esp32 | Self::Rp2040 | Self::Bk72xx | Self::Rtl87xx => &[],
        };

        map.iter()
            .map(|(location, size, indices, pin)| BindingConfig {
                variable: LocatedAddress::new(*location, *size, indices),
                pin: (*pin).to_string(),
                inverted: false,
                sink: None,
                name: None,
            })
            .collect()
    }
}
