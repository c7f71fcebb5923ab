//! Index obfuscation using a repeating 16-byte XOR key.
//!
//! This is a fixed keystream, not encryption: the key ships with the game and
//! the transform is its own inverse.

/// The XOR key applied to the index blob.
pub const CIPHER_KEY: [u8; 16] = [
    0x82, 0xEE, 0x1D, 0xB3, 0x57, 0xE9, 0x2C, 0xC2, 0x2F, 0x54, 0x7B, 0x10, 0x4C, 0x9A, 0x75, 0x49,
];

/// XOR `data` with the keystream in place.
///
/// Byte `i` is combined with `CIPHER_KEY[i % 16]`. Applying it twice restores
/// the input.
pub fn apply_keystream(data: &mut [u8]) {
    for (byte, key) in data.iter_mut().zip(CIPHER_KEY.iter().cycle()) {
        *byte ^= key;
    }
}

/// XOR a copy of `data` with the keystream.
pub fn decrypt(data: &[u8]) -> Vec<u8> {
    let mut buffer = data.to_vec();
    apply_keystream(&mut buffer);
    buffer
}
