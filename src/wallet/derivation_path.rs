//! BIP32 Derivation Paths
//!
//! Paths are what the device and the host agree on: the device derives the
//! child key itself, the host only names it. Equal paths mean the same
//! signing key, which is what batching keys on.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Hardened derivation offset
pub const HARDENED: u32 = 0x80000000;

/// Errors from path parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationPathError {
    #[error("Derivation path must start with 'm'")]
    MissingRoot,

    #[error("Empty path component")]
    EmptyComponent,

    #[error("Invalid path component '{0}'")]
    InvalidComponent(String),

    #[error("Path component {0} exceeds maximum value")]
    IndexOutOfRange(u32),
}

/// A single path component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationComponent {
    pub index: u32,
    pub hardened: bool,
}

impl DerivationComponent {
    pub fn new(index: u32, hardened: bool) -> Self {
        Self { index, hardened }
    }

    /// Index with the hardened bit applied
    pub fn full_index(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED
        } else {
            self.index
        }
    }
}

impl fmt::Display for DerivationComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// Parsed derivation path. `m` alone is the master key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationPath {
    components: Vec<DerivationComponent>,
}

impl DerivationPath {
    pub fn master() -> Self {
        Self::default()
    }

    /// Parse `m/84'/0'/0'/0/5`. Hardened markers `'`, `h` and `H` are accepted.
    pub fn parse(path: &str) -> Result<Self, DerivationPathError> {
        let trimmed = path.trim();

        let rest = match trimmed {
            "m" | "M" => return Ok(Self::master()),
            _ => trimmed
                .strip_prefix("m/")
                .or_else(|| trimmed.strip_prefix("M/"))
                .ok_or(DerivationPathError::MissingRoot)?,
        };

        let components = rest
            .split('/')
            .map(parse_component)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    pub fn components(&self) -> &[DerivationComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// This path extended by one component
    pub fn child(&self, index: u32, hardened: bool) -> Self {
        let mut components = self.components.clone();
        components.push(DerivationComponent::new(index, hardened));
        Self { components }
    }

    /// Indices with hardened bits applied, as devices take them
    pub fn to_indices(&self) -> Vec<u32> {
        self.components.iter().map(|c| c.full_index()).collect()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = DerivationPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_component(s: &str) -> Result<DerivationComponent, DerivationPathError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(DerivationPathError::EmptyComponent);
    }

    let (number, hardened) = match trimmed
        .strip_suffix('\'')
        .or_else(|| trimmed.strip_suffix('h'))
        .or_else(|| trimmed.strip_suffix('H'))
    {
        Some(number) => (number, true),
        None => (trimmed, false),
    };

    let index: u32 = number
        .parse()
        .map_err(|_| DerivationPathError::InvalidComponent(s.to_string()))?;

    if index >= HARDENED {
        return Err(DerivationPathError::IndexOutOfRange(index));
    }

    Ok(DerivationComponent::new(index, hardened))
}
