use bip39::{Language, Mnemonic};
use zeroize::Zeroizing;

use crate::error::WalletError;

/// Length of a BIP-39 seed in bytes.
pub const SEED_LEN: usize = 64;

/// Validate a mnemonic phrase against the English word list and checksum.
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, phrase).is_ok()
}

/// Derive seed bytes from mnemonic + passphrase (PBKDF2-HMAC-SHA512, 2048
/// rounds). The returned buffer is wiped when dropped.
pub fn mnemonic_to_seed(
    phrase: &str,
    passphrase: &str,
) -> Result<Zeroizing<[u8; SEED_LEN]>, WalletError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;

    Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn validate_accepts_test_vector() {
        assert!(validate_mnemonic(TEST_MNEMONIC));
    }

    #[test]
    fn validate_rejects_garbage_and_bad_checksum() {
        assert!(!validate_mnemonic("invalid mnemonic phrase here"));
        // Valid words, wrong checksum word.
        assert!(!validate_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
        ));
    }

    #[test]
    fn bip39_test_vector() {
        let seed = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        assert_eq!(
            hex::encode(seed.as_slice()),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn passphrase_changes_seed() {
        let plain = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        let salted = mnemonic_to_seed(TEST_MNEMONIC, "TREZOR").unwrap();
        assert_ne!(*plain, *salted);
    }

    #[test]
    fn malformed_mnemonic_is_invalid() {
        let err = mnemonic_to_seed("not a real phrase", "").unwrap_err();
        assert!(matches!(err, WalletError::InvalidMnemonic(_)));
    }

    #[test]
    fn bad_checksum_is_not_seeded() {
        // Known words, wrong checksum: seeding it would silently yield an
        // unrelated wallet.
        let err = mnemonic_to_seed(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::InvalidMnemonic(_)));
    }
}
