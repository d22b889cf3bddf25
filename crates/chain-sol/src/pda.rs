//! Program Derived Address (PDA) search.
//!
//! A PDA is `SHA-256(seed_0 || ... || seed_n || bump || program_id ||
//! "ProgramDerivedAddress")`, accepted only when the digest does NOT
//! decompress to an Ed25519 point. The bump search runs from 255 down to 0
//! and the first off-curve digest wins, so for fixed inputs every
//! implementation agrees on the same `(address, bump)` pair.

use sha2::{Digest, Sha256};

use crate::address::{is_on_curve, Address};
use crate::error::SolError;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum number of seeds, counting the bump seed.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Find a valid Program Derived Address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0 and returns the first address that
/// is off the curve, together with the bump that produced it.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), SolError> {
    // The bump seed occupies one of the 16 seed slots.
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = derive(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::NoValidAddress)
}

/// Create a PDA from seeds that already include the bump seed.
///
/// Fails with [`SolError::PointOnCurve`] when the digest is a curve point.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, SolError> {
    check_seeds(seeds, MAX_SEEDS)?;

    let digest = hash_seeds(seeds, &[], program_id);
    if is_on_curve(&digest) {
        return Err(SolError::PointOnCurve);
    }
    Ok(Address::new(digest))
}

fn derive(seeds: &[&[u8]], bump: u8, program_id: &Address) -> Option<Address> {
    let digest = hash_seeds(seeds, &[bump], program_id);

    // A valid PDA must NOT be on the Ed25519 curve.
    if is_on_curve(&digest) {
        return None;
    }
    Some(Address::new(digest))
}

fn hash_seeds(seeds: &[&[u8]], bump_seed: &[u8], program_id: &Address) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<(), SolError> {
    if seeds.len() > max_seeds {
        return Err(SolError::InvalidSeeds(format!(
            "{} seeds given, at most {max_seeds} allowed",
            seeds.len()
        )));
    }
    if let Some((i, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(SolError::InvalidSeeds(format!(
            "seed {i} is {} bytes, at most {MAX_SEED_LEN} allowed",
            seed.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_program() -> Address {
        "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".parse().unwrap()
    }

    #[test]
    fn find_is_deterministic() {
        let program = token_program();
        let a = find_program_address(&[b"metadata"], &program).unwrap();
        let b = find_program_address(&[b"metadata"], &program).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn find_returns_off_curve_address() {
        let program = token_program();
        let (address, _) = find_program_address(&[b"vault", &[7u8; 32]], &program).unwrap();
        assert!(!address.is_on_curve());
    }

    #[test]
    fn known_pda_vector() {
        let (address, bump) = find_program_address(&[b"metadata"], &token_program()).unwrap();
        assert_eq!(
            address.to_string(),
            "3ijiZDfPJaxmakuhGZj8MYAVxxxmtprvF7mR85XJMmd6"
        );
        assert_eq!(bump, 254);
    }

    #[test]
    fn create_with_found_bump_reproduces_address() {
        let program = token_program();
        let (address, bump) = find_program_address(&[b"metadata"], &program).unwrap();
        let recreated = create_program_address(&[b"metadata", &[bump]], &program).unwrap();
        assert_eq!(recreated, address);
    }

    #[test]
    fn skipped_bump_lands_on_curve() {
        // 255 was rejected for this seed set, so recreating with it must fail.
        let program = token_program();
        let (_, bump) = find_program_address(&[b"metadata"], &program).unwrap();
        assert_eq!(bump, 254);
        let result = create_program_address(&[b"metadata", &[255]], &program);
        assert!(matches!(result, Err(SolError::PointOnCurve)));
    }

    #[test]
    fn different_programs_give_different_addresses() {
        let a = find_program_address(&[b"seed"], &token_program()).unwrap();
        let b = find_program_address(&[b"seed"], &Address::new([0u8; 32])).unwrap();
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn empty_seed_list_is_allowed() {
        assert!(find_program_address(&[], &token_program()).is_ok());
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let long = [0u8; 33];
        let result = find_program_address(&[&long], &token_program());
        assert!(matches!(result, Err(SolError::InvalidSeeds(_))));
    }

    #[test]
    fn too_many_seeds_are_rejected() {
        let seed: &[u8] = b"x";
        let seeds = vec![seed; MAX_SEEDS];
        let result = find_program_address(&seeds, &token_program());
        assert!(matches!(result, Err(SolError::InvalidSeeds(_))));

        // Sixteen is fine once the bump is already part of the list.
        assert!(matches!(
            create_program_address(&seeds, &token_program()),
            Ok(_) | Err(SolError::PointOnCurve)
        ));
    }
}
