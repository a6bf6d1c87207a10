//! Hashing utilities for footprints and plan staleness checks.
//!
//! SHA-1 is the on-disk footprint format; it is used here as a content hash,
//! not a security primitive.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};

/// Compute SHA-1 hash of a byte slice.
pub fn sha1_bytes(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA-1 hash of a string.
pub fn sha1_str(s: &str) -> String {
    sha1_bytes(s.as_bytes())
}

/// Compute SHA-1 hash of a file.
pub fn sha1_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// A hasher for building footprints from multiple components.
///
/// Components are hashed as a plain concatenation; stored footprints depend
/// on that, so no separators are inserted.
#[derive(Default)]
pub struct FootprintHasher {
    hasher: Sha1,
}

impl FootprintHasher {
    /// Create a new footprint builder.
    pub fn new() -> Self {
        FootprintHasher {
            hasher: Sha1::new(),
        }
    }

    /// Add a string component to the footprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self
    }

    /// Finalize and return the footprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
