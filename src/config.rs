//! Configuration management for epub-locator

use serde::Deserialize;
use std::env;

/// Default characters per location chunk
pub const DEFAULT_BREAK_SIZE: usize = 150;

/// Default words per location chunk
pub const DEFAULT_WORD_BREAK: usize = 150;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locations: LocationsConfig,
    pub cfi: CfiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocationsConfig {
    /// Characters per chunk in character mode
    pub break_size: usize,
    /// Words per chunk in word mode
    pub word_break: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CfiConfig {
    /// Class marking injected elements (highlights, search marks) that
    /// addressing must see through
    pub ignore_class: Option<String>,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        LocationsConfig {
            break_size: DEFAULT_BREAK_SIZE,
            word_break: DEFAULT_WORD_BREAK,
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparseable
    pub fn from_env() -> Self {
        Config {
            locations: LocationsConfig {
                break_size: parse_var("LOCATIONS_BREAK_SIZE").unwrap_or(DEFAULT_BREAK_SIZE),
                word_break: parse_var("LOCATIONS_WORD_BREAK").unwrap_or(DEFAULT_WORD_BREAK),
            },
            cfi: CfiConfig {
                ignore_class: env::var("CFI_IGNORE_CLASS")
                    .ok()
                    .filter(|class| !class.trim().is_empty()),
            },
        }
    }
}

fn parse_var(key: &str) -> Option<usize> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .filter(|&value| value > 0)
}
