//! Offset-keyed subtractive keystream obfuscation.
//!
//! Every physically-read byte of a block-compressed container is obfuscated
//! by adding a repeating 54-byte key; [`decrypt`] undoes it by subtraction,
//! keyed by the byte's *physical* position in the file — never its logical
//! position in the decompressed stream.  The plain container variant stores
//! bytes unobfuscated and never touches this module.
//!
//! The transform is not an involution: applying [`decrypt`] twice does not
//! restore the input.  [`encrypt`] is the additive inverse, kept so test
//! fixtures can be synthesized.

/// The fixed keystream table.  The period is its length (54 bytes).
pub const KEY: [u8; 54] = [
    0x46, 0x69, 0x6C, 0x65, 0xFE, 0x4E, 0x61, 0x6D, 0x65, 0x09, 0x0D, 0x0A,
    0x46, 0x69, 0x6C, 0x65, 0x50, 0x6F, 0x73, 0x09, 0x0D, 0x0A, 0x31, 0x0D,
    0x09, 0x0A, 0x02, 0x21, 0x2A, 0x31, 0x31, 0x09, 0x46, 0x69, 0x6C, 0x65,
    0x53, 0x69, 0x7A, 0x65, 0x0D, 0x0A, 0x48, 0x68, 0x31, 0x01, 0x8E, 0x9E,
    0xAC, 0xBC, 0xDC, 0x98, 0xF1, 0xE1,
];

/// Decipher `data` in place, keyed by the physical file offset it was read
/// from.
pub fn decrypt(data: &mut [u8], physical_offset: u64) {
    for (i, b) in data.iter_mut().enumerate() {
        let k = KEY[(physical_offset as usize + i) % KEY.len()];
        *b = b.wrapping_sub(k);
    }
}

/// Obfuscate `data` in place as it would appear on disk at `physical_offset`.
/// Inverse of [`decrypt`]; the decode path never calls this.
pub fn encrypt(data: &mut [u8], physical_offset: u64) {
    for (i, b) in data.iter_mut().enumerate() {
        let k = KEY[(physical_offset as usize + i) % KEY.len()];
        *b = b.wrapping_add(k);
    }
}
