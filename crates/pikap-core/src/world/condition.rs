use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::error::{Error, Result};
use crate::memory::layout::{self, condition};

/// Archipelago location id of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(pub i64);

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CheckId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A memory condition, resolved once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, Display)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Condition {
    /// Bit `bit` (0 = least significant) of the byte at `address` is set
    Bit {
        #[serde(with = "hex_address")]
        address: u32,
        bit: u8,
    },
    /// The big-endian unsigned integer at `address` is at least `min`
    Threshold {
        #[serde(with = "hex_address")]
        address: u32,
        #[serde(default = "default_width")]
        width: u8,
        min: u32,
    },
    /// Always satisfied
    Always,
}

fn default_width() -> u8 {
    1
}

impl Condition {
    /// Memory range this condition reads, if any.
    pub fn span(&self) -> Option<(u32, usize)> {
        match *self {
            Condition::Bit { address, .. } => Some((address, 1)),
            Condition::Threshold { address, width, .. } => Some((address, width as usize)),
            Condition::Always => None,
        }
    }

    /// Evaluate against a byte source; `None` from the source reads as zero.
    pub fn is_satisfied<F>(&self, byte_at: F) -> bool
    where
        F: Fn(u32) -> Option<u8>,
    {
        match *self {
            Condition::Bit { address, bit } => {
                byte_at(address).unwrap_or(0) & (1 << bit) != 0
            }
            Condition::Threshold {
                address,
                width,
                min,
            } => {
                let value = (0..width as u32).fold(0u32, |acc, i| {
                    (acc << 8) | byte_at(address + i).unwrap_or(0) as u32
                });
                value >= min
            }
            Condition::Always => true,
        }
    }

    pub fn validate(&self, context: &str) -> Result<()> {
        match *self {
            Condition::Bit { bit, .. } if bit > condition::MAX_BIT => {
                return Err(Error::Config(format!(
                    "{}: bit offset {} is out of range 0..=7",
                    context, bit
                )));
            }
            Condition::Threshold { width, .. } if !condition::VALID_WIDTHS.contains(&width) => {
                return Err(Error::Config(format!(
                    "{}: width {} must be 1, 2 or 4",
                    context, width
                )));
            }
            _ => {}
        }
        if let Some((address, length)) = self.span() {
            check_range(context, address, length)?;
        }
        Ok(())
    }
}

pub(crate) fn check_range(context: &str, address: u32, length: usize) -> Result<()> {
    if !layout::in_mem1(address, length) {
        return Err(Error::Config(format!(
            "{}: address {:#010x} (+{}) is outside MEM1",
            context, address, length
        )));
    }
    Ok(())
}

/// Parse an address written as a decimal integer or a `0x` hex string.
pub fn parse_address(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Serde helpers accepting integer or hex-string addresses, written back as hex.
pub mod hex_address {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(address: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#010X}", address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Int(value) => u32::try_from(value)
                .map_err(|_| de::Error::custom(format!("address {} does not fit in 32 bits", value))),
            Raw::Str(s) => super::parse_address(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid address {:?}", s))),
        }
    }
}
