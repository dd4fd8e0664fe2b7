use tal_types::Digest;

/// SHA-256 content hasher.
///
/// No domain tag is prepended: token fingerprints are computed by issuers
/// outside this system and must equal a plain SHA-256 of the token bytes.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes and return the lowercase hex digest.
    pub fn hash_hex(data: &[u8]) -> String {
        Digest::of(data).to_hex()
    }

    /// Check that `data` hashes to exactly `expected_hex`.
    ///
    /// Fingerprints are lowercase hex; any other spelling of the same digest
    /// does not match, so the result agrees with exact-string lookups such as
    /// the revocation set.
    pub fn verify_hex(data: &[u8], expected_hex: &str) -> bool {
        Self::hash_hex(data) == expected_hex
    }
}
