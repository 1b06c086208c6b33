use std::str::FromStr;

use alloy::primitives::Address;
use tiny_keccak::{Hasher, Keccak};

/// Checks that `address` is a `0x`-prefixed, 20-byte hex address.
///
/// All-lowercase and all-uppercase forms carry no checksum and are accepted.
/// Mixed-case input must satisfy the EIP-55 checksum, which catches typos in
/// module recipients and currencies before they are signed into a payload.
pub fn is_valid_eth_address(address: &str) -> bool {
    let Some(hex_part) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return false;
    };

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    matches_checksum(hex_part)
}

/// Validates and parses an address in one step.
pub fn parse_eth_address(address: &str) -> Option<Address> {
    if !is_valid_eth_address(address) {
        return None;
    }
    Address::from_str(&address[2..]).ok()
}

fn matches_checksum(hex_part: &str) -> bool {
    let mut hash = [0u8; 32];
    let mut keccak = Keccak::v256();
    keccak.update(hex_part.to_ascii_lowercase().as_bytes());
    keccak.finalize(&mut hash);

    hex_part.chars().enumerate().all(|(i, c)| {
        if c.is_ascii_digit() {
            return true;
        }
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            c.is_ascii_uppercase()
        } else {
            c.is_ascii_lowercase()
        }
    })
}
