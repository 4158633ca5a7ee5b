/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte used for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Padding byte used for data blocks (zero).
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
///
/// 0 bytes requires 0 blocks, 1 byte requires 1 block, 2880 bytes requires
/// 1 block, 2881 bytes requires 2 blocks.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Length of `num_bytes` rounded up to whole blocks, `None` on overflow.
pub const fn padded_byte_len(num_bytes: usize) -> Option<usize> {
    blocks_needed(num_bytes).checked_mul(BLOCK_SIZE)
}

/// Number of fill bytes that complete the last block of `num_bytes`.
pub const fn pad_len(num_bytes: usize) -> usize {
    (BLOCK_SIZE - num_bytes % BLOCK_SIZE) % BLOCK_SIZE
}

/// Append `src` to `out` and pad the final block with `pad_byte`.
pub fn extend_padded(out: &mut Vec<u8>, src: &[u8], pad_byte: u8) {
    out.extend_from_slice(src);
    out.resize(out.len() + pad_len(src.len()), pad_byte);
}
