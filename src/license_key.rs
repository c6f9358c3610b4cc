//! License key derivation.
//!
//! A key is the SHA-256 of the tenant, the licensee tax id and 16 random
//! bytes, truncated to 32 hex digits and rendered as four uppercase blocks of
//! eight separated by `-`.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::tenant::TenantId;

const BLOCK_WIDTH: usize = 8;
const BLOCK_COUNT: usize = 4;

/// Total length of a rendered key, separators included.
pub const LICENSE_KEY_LEN: usize = BLOCK_WIDTH * BLOCK_COUNT + BLOCK_COUNT - 1;

/// Generates a fresh key; uniqueness is probabilistic and must still be
/// checked against storage.
pub fn generate(tenant: TenantId, tax_id: &str) -> String {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    derive(tenant, tax_id, &nonce)
}

/// Deterministic part of [`generate`].
pub fn derive(tenant: TenantId, tax_id: &str, nonce: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}-{}-{}-{}",
        tenant.company_id,
        tenant.branch_id,
        tax_id.trim(),
        hex::encode(nonce)
    ));
    let digest = hex::encode_upper(hasher.finalize());

    digest[..BLOCK_WIDTH * BLOCK_COUNT]
        .as_bytes()
        .chunks(BLOCK_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

/// True when `key` has the shape [`generate`] renders: four blocks of eight
/// uppercase hex digits joined by `-`.
pub fn is_well_formed(key: &str) -> bool {
    let blocks: Vec<&str> = key.split('-').collect();
    blocks.len() == BLOCK_COUNT
        && blocks.iter().all(|block| {
            block.len() == BLOCK_WIDTH
                && block
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        })
}
