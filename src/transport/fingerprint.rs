use std::fmt;

/// A 128-bit hash of an encoded `PREPARE` frame.
///
/// Used as the stable, cluster-wide key for a logical prepared statement.
/// MD5 is used because the key is not adversarial -- the only requirement is
/// a stable function of the encoded PREPARE bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Computes the fingerprint of an encoded `PREPARE` frame.
    pub fn of_encoded_prepare(encoded: &[u8]) -> Self {
        Fingerprint(md5::compute(encoded).0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_yield_same_fingerprint() {
        let a = Fingerprint::of_encoded_prepare(b"PREPARE SELECT * FROM t");
        let b = Fingerprint::of_encoded_prepare(b"PREPARE SELECT * FROM t");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_yield_different_fingerprint() {
        let a = Fingerprint::of_encoded_prepare(b"PREPARE SELECT * FROM t");
        let b = Fingerprint::of_encoded_prepare(b"PREPARE SELECT * FROM u");
        assert_ne!(a, b);
    }
}
