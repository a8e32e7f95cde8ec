use log::debug;
use sha2::{Digest, Sha256};

/// Leading hex characters a digest must carry for a proof to be valid.
/// The difficulty is fixed and deliberately not configurable.
const DIFFICULTY_PREFIX: &str = "0000";

/// Finds the smallest proof `p` such that the hash of
/// `{last_proof}{p}{last_hash}` starts with four zeros.
///
/// This is a brute-force search from 0 upward and is the CPU-bound operation
/// that gives the chain its work property. Callers must not hold the chain
/// lock for its duration.
///
/// # Arguments
///
/// * `last_proof` - The proof of the previous block
/// * `last_hash` - The hash of the previous block
///
/// # Returns
///
/// A proof satisfying [`valid_proof`]
pub fn find_proof(last_proof: u64, last_hash: &str) -> u64 {
    let mut proof = 0u64;

    while !valid_proof(last_proof, proof, last_hash) {
        proof += 1;
        if proof % 100_000 == 0 {
            debug!("Proof search at {} attempts", proof);
        }
    }

    debug!("Proof found: {}", proof);
    proof
}

/// Validates a proof of work
///
/// Hashes the decimal concatenation of the previous proof, the candidate
/// proof, and the previous block hash, and checks the leading characters of
/// the hex digest.
///
/// # Arguments
///
/// * `last_proof` - The proof of the previous block
/// * `proof` - The candidate proof
/// * `last_hash` - The hash of the previous block
///
/// # Returns
///
/// true if the candidate proof is valid
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &str) -> bool {
    let guess = format!("{}{}{}", last_proof, proof, last_hash);
    let digest = Sha256::digest(guess.as_bytes());

    hex::encode(digest).starts_with(DIFFICULTY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_proof_is_deterministic() {
        let last_hash = "c".repeat(64);

        let first = valid_proof(100, 12345, &last_hash);
        for _ in 0..10 {
            assert_eq!(valid_proof(100, 12345, &last_hash), first);
        }
    }

    #[test]
    fn test_find_proof_returns_a_valid_proof() {
        let last_hash = "d".repeat(64);

        let proof = find_proof(100, &last_hash);

        assert!(valid_proof(100, proof, &last_hash));
    }

    #[test]
    fn test_find_proof_returns_smallest_proof() {
        let last_hash = "e".repeat(64);

        let proof = find_proof(100, &last_hash);

        for candidate in 0..proof {
            assert!(!valid_proof(100, candidate, &last_hash));
        }
    }

}
