//! Protocol constants for StealthFlow.
//!
//! Curve parameters are those of secp256k1 (SEC 2, section 2.4.1). Starknet
//! values match the deployed StealthFlow contracts on Sepolia.

use crate::types::U256;

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a scalar or field element in bytes.
pub const SCALAR_SIZE: usize = 32;

/// Size of an affine coordinate in bytes.
pub const COORDINATE_SIZE: usize = 32;

/// Order N of the secp256k1 group, big-endian.
pub const CURVE_ORDER: [u8; SCALAR_SIZE] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW TAG CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of possible view tag values (2^8 = 256).
pub const VIEW_TAG_SPACE: usize = 256;

/// Expected filtering efficiency as a percentage.
/// With 1-byte view tags, ~99.6% of foreign announcements are skipped.
pub const VIEW_TAG_EFFICIENCY: f64 = 99.609375; // (255/256) * 100

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain separator for the metadata encryption mask.
pub const DOMAIN_METADATA: &[u8] = b"stealthflow:metadata";

/// Prefix hashed into every Starknet contract address.
pub const DOMAIN_CONTRACT_ADDRESS: &[u8] = b"STARKNET_CONTRACT_ADDRESS";

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Protocol tag of a meta-address string.
pub const META_ADDRESS_PROTOCOL: &str = "st";

/// Chain tag of a meta-address string.
pub const META_ADDRESS_CHAIN: &str = "starknet";

/// Full prefix of a meta-address string, `st:starknet:`.
pub const META_ADDRESS_PREFIX: &str = "st:starknet:";

/// Number of comma-separated fields after the prefix.
pub const META_ADDRESS_FIELDS: usize = 4;

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Scheme id for secp256k1 + Keccak-256 stealth addresses.
pub const SCHEME_ID_SECP256K1: u64 = 1;

/// Number of event keys: selector, scheme id (low, high), view tag.
pub const ANNOUNCEMENT_EVENT_KEYS: usize = 4;

/// Ephemeral key encoded as two full words `[x, y]`.
pub const EPHEMERAL_WORDS_PACKED: usize = 2;

/// Ephemeral key encoded as 128-bit halves `[x_low, x_high, y_low, y_high]`.
pub const EPHEMERAL_WORDS_SPLIT: usize = 4;

/// Upper bound on ciphertext words accepted from an event.
pub const MAX_CIPHERTEXT_WORDS: usize = 16;

// ═══════════════════════════════════════════════════════════════════════════════
// STARKNET
// ═══════════════════════════════════════════════════════════════════════════════

/// Bit width of a Starknet address and of the deployment salt.
pub const STARKNET_ADDRESS_BITS: u32 = 251;

/// Exclusive upper bound of a contract address, 2^251 - 256.
pub const L2_ADDRESS_UPPER_BOUND: U256 = U256::from_be_bytes({
    let mut bytes = [0xff; 32];
    bytes[0] = 0x07;
    bytes[31] = 0x00;
    bytes
});

/// Universal Deployer Contract, the deployer of stealth accounts.
pub const UDC_ADDRESS: U256 = U256::from_be_bytes([
    0x04, 0x1a, 0x78, 0xe7, 0x41, 0xe5, 0xaf, 0x2f, 0xec, 0x34, 0xb6, 0x37, 0xd1, 0x9f, 0x86, 0xf5,
    0x28, 0xd2, 0x49, 0x5b, 0x87, 0x9f, 0x0b, 0xc1, 0x56, 0x24, 0xd6, 0x3d, 0x39, 0x7b, 0x5d, 0x21,
]);

/// Bits kept by `starknet_keccak`.
pub const STARKNET_KECCAK_BITS: u32 = 250;

/// Class hash of the secp256k1 stealth account contract.
pub const STEALTH_ACCOUNT_CLASS_HASH: U256 = U256::from_be_bytes([
    0x03, 0x48, 0x7c, 0xf5, 0xae, 0x21, 0x06, 0xdb, 0x42, 0x3e, 0x02, 0xde, 0x50, 0xb9, 0x34, 0x64,
    0x3c, 0x63, 0xd8, 0x93, 0xf8, 0x16, 0x96, 0x60, 0x09, 0xc7, 0x27, 0x0f, 0xb1, 0x59, 0x25, 0x6a,
]);

/// STRK token contract address.
pub const STRK_TOKEN_ADDRESS: U256 = U256::from_be_bytes([
    0x04, 0x71, 0x8f, 0x5a, 0x0f, 0xc3, 0x4c, 0xc1, 0xaf, 0x16, 0xa1, 0xcd, 0xee, 0x98, 0xff, 0xb2,
    0x0c, 0x31, 0xf5, 0xcd, 0x61, 0xd6, 0xab, 0x07, 0x20, 0x18, 0x58, 0xf4, 0x28, 0x7c, 0x93, 0x8d,
]);

/// Hex characters kept by the deprecated truncated address format.
pub const LEGACY_ADDRESS_HEX_CHARS: usize = 62;

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN UNITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default token decimals (STRK, ETH).
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

/// Fractional digits shown by the display formatter.
pub const DISPLAY_FRACTION_DIGITS: usize = 4;

/// Largest supported decimals value; 10^77 is the largest power of ten below 2^256.
pub const MAX_TOKEN_DECIMALS: u32 = 77;

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default interval between polling invocations, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 800;

/// Default number of blocks fetched per scan invocation.
pub const DEFAULT_BATCH_BLOCKS: u64 = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL VERSIONING
// ═══════════════════════════════════════════════════════════════════════════════

/// Current version of persisted formats.
pub const PROTOCOL_VERSION: u8 = 1;
