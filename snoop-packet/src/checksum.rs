//! Internet checksum (RFC 1071) used when building synthetic frames

/// Sum 16-bit big-endian words without folding
pub fn checksum_accumulate(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    // Handle odd byte if present
    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    sum
}

fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !sum as u16
}

/// Calculates the Internet Checksum as defined in RFC 1071
pub fn internet_checksum(data: &[u8]) -> u16 {
    fold(checksum_accumulate(data))
}

/// Checksum of a TCP/UDP segment over the IPv4 pseudo-header
pub fn transport_checksum(src_ip: &[u8; 4], dst_ip: &[u8; 4], protocol: u8, data: &[u8]) -> u16 {
    let mut sum = checksum_accumulate(src_ip) + checksum_accumulate(dst_ip);
    sum += protocol as u32;
    sum += data.len() as u32;
    sum += checksum_accumulate(data);
    fold(sum)
}

/// Checksum of an upper-layer segment over the IPv6 pseudo-header
pub fn transport_checksum_v6(
    src_ip: &[u8; 16],
    dst_ip: &[u8; 16],
    next_header: u8,
    data: &[u8],
) -> u16 {
    let mut sum = checksum_accumulate(src_ip) + checksum_accumulate(dst_ip);
    let len = data.len() as u32;
    sum += (len >> 16) + (len & 0xFFFF);
    sum += next_header as u32;
    sum += checksum_accumulate(data);
    fold(sum)
}

/// A buffer whose embedded checksum is correct sums to zero
pub fn validate_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}
