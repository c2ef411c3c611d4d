/// Compute the Internet checksum (RFC 1071) over `data`
///
/// The caller zeroes the checksum field first. The result is a host-order
/// `u16`; write it with `to_be_bytes` to get network byte order on the wire.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !fold(sum_words(data))
}

/// Returns true if `data` (checksum field included) sums to 0xFFFF after folding
pub fn verify_checksum(data: &[u8]) -> bool {
    fold(sum_words(data)) == 0xFFFF
}

fn sum_words(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u32 = chunks
        .by_ref()
        .map(|word| u16::from_be_bytes([word[0], word[1]]) as u32)
        .fold(0, u32::wrapping_add);

    // Odd trailing byte is padded with a zero byte on the wire
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}
