//! Hashing utilities.

use sha2::{Digest, Sha256};
use subtle_encoding::hex;

/// Compute the SHA256 hash of the given string and return its lowercase
/// hexadecimal representation.
pub fn sha256<S: AsRef<str>>(s: S) -> String {
    let digest = Sha256::digest(s.as_ref().as_bytes());
    String::from_utf8_lossy(&hex::encode(digest)).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
