//! Codec configuration

use serde::{Deserialize, Serialize};

use crate::kd_tree::{CompressionPolicy, Traversal, MAX_DIMENSION};
use crate::symbol::{SymbolCodingMethod, DEFAULT_SYMBOL_CODING_COMPRESSION_LEVEL};
use crate::{Error, Result};

/// Options for [`encode_symbols`](crate::symbol::encode_symbols)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolEncodingOptions {
    /// Force a scheme instead of picking the cheaper estimate
    pub method: Option<SymbolCodingMethod>,
    /// 0-10; shifts the raw scheme's table precision
    pub compression_level: u8,
}

impl Default for SymbolEncodingOptions {
    fn default() -> Self {
        Self {
            method: None,
            compression_level: DEFAULT_SYMBOL_CODING_COMPRESSION_LEVEL,
        }
    }
}

/// Point codec settings
///
/// Encoder and decoder must be built from the same configuration; nothing
/// but the bit length and point count travels in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdTreeConfig {
    pub dimension: u32,
    /// 0-10, see [`CompressionPolicy::for_level`]
    pub compression_level: u8,
    /// Override the level's traversal order
    pub traversal: Option<Traversal>,
}

impl KdTreeConfig {
    pub fn new(dimension: u32, compression_level: u8) -> Self {
        Self {
            dimension,
            compression_level,
            traversal: None,
        }
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = Some(traversal);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 || self.dimension > MAX_DIMENSION {
            return Err(Error::InvalidInput(format!(
                "dimension must be in 1..={}, got {}",
                MAX_DIMENSION, self.dimension
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> CompressionPolicy {
        let policy = CompressionPolicy::for_level(self.compression_level);
        match self.traversal {
            Some(traversal) => policy.with_traversal(traversal),
            None => policy,
        }
    }
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self::new(3, 7)
    }
}
