use sha2::{Digest, Sha256};

use crate::types::Address;

/// Domain seed prefixed to every predicate root before hashing into an address.
pub const ADDRESS_SEED: &[u8; 4] = b"FUEL";

/// Code is split into leaves of this many bytes.
pub const LEAF_SIZE: usize = 16 * 1024;

/// Code is zero-padded to a multiple of this many bytes (one instruction word).
pub const WORD_SIZE: usize = 8;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Binary Merkle root over the padded bytecode.
///
/// ```text
/// leaf  = SHA256(0x00 || chunk)          // chunk <= 16 KiB
/// node  = SHA256(0x01 || left || right)
/// ```
///
/// An unpaired node at the end of a level is carried up unchanged. Empty
/// code has root `SHA256("")`.
pub fn code_root(code: &[u8]) -> [u8; 32] {
    let mut padded = code.to_vec();
    let rem = padded.len() % WORD_SIZE;
    if rem != 0 {
        padded.resize(padded.len() + WORD_SIZE - rem, 0);
    }

    if padded.is_empty() {
        return Sha256::digest(b"").into();
    }

    let mut level: Vec<[u8; 32]> = padded
        .chunks(LEAF_SIZE)
        .map(|chunk| {
            let mut hasher = Sha256::new();
            hasher.update([LEAF_PREFIX]);
            hasher.update(chunk);
            hasher.finalize().into()
        })
        .collect();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut hasher = Sha256::new();
                    hasher.update([NODE_PREFIX]);
                    hasher.update(left);
                    hasher.update(right);
                    hasher.finalize().into()
                }
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}

/// Predicate address from a template version and instantiated bytecode.
///
/// ```text
/// address = SHA256("FUEL" || version || code_root(code))
/// ```
pub fn predicate_address(version: u8, code: &[u8]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(ADDRESS_SEED);
    hasher.update([version]);
    hasher.update(code_root(code));
    Address::new(hasher.finalize().into())
}
