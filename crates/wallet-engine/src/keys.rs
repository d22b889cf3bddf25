//! Mnemonic to Ed25519 keypair derivation.
//!
//! Two schemes are supported:
//!
//! - [`DerivationScheme::SeedPrefix`] (default): the first 32 bytes of the
//!   BIP-39 seed are used directly as the Ed25519 private seed. This is not
//!   hierarchical and will not match other wallets, but existing accounts
//!   were created this way, so it stays the default.
//! - [`DerivationScheme::Slip10`]: SLIP-0010 hardened derivation on
//!   `m/44'/501'/account'/0'`, which is what most Solana wallets use.

use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use zeroize::Zeroizing;

use chain_sol::Address;

use crate::error::WalletError;
use crate::mnemonic::mnemonic_to_seed;

type HmacSha512 = Hmac<Sha512>;

/// SLIP-0010 hardened-index offset.
const HARDENED: u32 = 0x8000_0000;

/// How a mnemonic seed is turned into a signing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scheme")]
pub enum DerivationScheme {
    #[default]
    SeedPrefix,
    Slip10 {
        #[serde(default)]
        account: u32,
    },
}

impl DerivationScheme {
    /// Human-readable path, `None` for the non-hierarchical scheme.
    pub fn path(&self) -> Option<String> {
        match self {
            DerivationScheme::SeedPrefix => None,
            DerivationScheme::Slip10 { account } => Some(format!("m/44'/501'/{account}'/0'")),
        }
    }
}

/// An Ed25519 keypair. The private seed is wiped on drop and never printed.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Build a keypair from a 32-byte Ed25519 private seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Generate a fresh random keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// The 32-byte private seed.
    pub fn secret_seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// The 64-byte `private seed || public key` form used by Solana
    /// keypair files and most wallet exports.
    pub fn to_keypair_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Derive a keypair from a mnemonic phrase using the default scheme.
pub fn derive(mnemonic: &str, passphrase: &str) -> Result<KeyPair, WalletError> {
    derive_with(mnemonic, passphrase, DerivationScheme::SeedPrefix)
}

/// Derive a keypair from a mnemonic phrase with an explicit scheme.
///
/// Deterministic: identical inputs always yield the identical keypair.
pub fn derive_with(
    mnemonic: &str,
    passphrase: &str,
    scheme: DerivationScheme,
) -> Result<KeyPair, WalletError> {
    let seed = mnemonic_to_seed(mnemonic, passphrase)?;

    match scheme {
        DerivationScheme::SeedPrefix => {
            let mut private = Zeroizing::new([0u8; 32]);
            let prefix = seed.get(..32).ok_or_else(|| {
                WalletError::InvalidMnemonic(format!("seed is only {} bytes", seed.len()))
            })?;
            private.copy_from_slice(prefix);
            Ok(KeyPair::from_seed(&private))
        }
        DerivationScheme::Slip10 { account } => {
            let private = slip10_ed25519(seed.as_slice(), &[44, 501, account, 0])?;
            Ok(KeyPair::from_seed(&private))
        }
    }
}

/// SLIP-0010 Ed25519 derivation. Every path component is hardened.
fn slip10_ed25519(seed: &[u8], path: &[u32]) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    // Master key: HMAC-SHA512(key="ed25519 seed", data=seed)
    let mut mac = HmacSha512::new_from_slice(b"ed25519 seed")
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;
    mac.update(seed);
    let result = Zeroizing::new(mac.finalize().into_bytes().to_vec());

    let mut key = Zeroizing::new([0u8; 32]);
    let mut chain_code = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&result[..32]);
    chain_code.copy_from_slice(&result[32..]);

    for index in path {
        let mut mac = HmacSha512::new_from_slice(chain_code.as_slice())
            .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;
        // Hardened child: 0x00 || key || index (with hardened bit set)
        mac.update(&[0x00]);
        mac.update(key.as_slice());
        mac.update(&(index | HARDENED).to_be_bytes());
        let result = Zeroizing::new(mac.finalize().into_bytes().to_vec());

        key.copy_from_slice(&result[..32]);
        chain_code.copy_from_slice(&result[32..]);
    }

    Ok(key)
}
