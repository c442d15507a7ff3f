use std::io::{self, Read, Write};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a stream, and how many bytes it had.
pub struct Sha256Hex {
    pub hex: String,
    pub size: u64,
}

/// Hashes `reader` to its end. Stops at the first read error; whatever was read is discarded.
pub fn sha256_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Sha256Hex> {
    let mut hasher = Sha256::new();
    let size = io::copy(reader, &mut hasher)?;
    hasher.flush()?;

    Ok(Sha256Hex {
        hex: hex::encode(hasher.finalize()),
        size,
    })
}

#[cfg(test)]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
