//! Minimal RLP encoder for EVM transaction preimages

/// Unsigned integer as a minimal big-endian byte string
pub fn encode_u64(val: u64) -> Vec<u8> {
    encode_uint(&val.to_be_bytes())
}

pub fn encode_u128(val: u128) -> Vec<u8> {
    encode_uint(&val.to_be_bytes())
}

fn encode_uint(be_bytes: &[u8]) -> Vec<u8> {
    let leading_zeros = be_bytes.iter().take_while(|&&b| b == 0).count();
    encode_bytes(&be_bytes[leading_zeros..])
}

pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    let mut result = encode_header(0x80, data.len());
    result.extend_from_slice(data);
    result
}

/// Recipient, or the empty string for contract creation
pub fn encode_address(addr: Option<&[u8; 20]>) -> Vec<u8> {
    match addr {
        Some(a) => encode_bytes(a),
        None => vec![0x80],
    }
}

/// List of already-encoded items
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(Vec::len).sum();
    let mut result = encode_header(0xc0, payload_len);
    for item in items {
        result.extend_from_slice(item);
    }
    result
}

fn encode_header(offset: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        return vec![offset + len as u8];
    }
    let len_bytes = len.to_be_bytes();
    let leading_zeros = len_bytes.iter().take_while(|&&b| b == 0).count();
    let len_bytes = &len_bytes[leading_zeros..];

    let mut header = Vec::with_capacity(1 + len_bytes.len());
    header.push(offset + 55 + len_bytes.len() as u8);
    header.extend_from_slice(len_bytes);
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode_u64(0), vec![0x80]);
        assert_eq!(encode_u64(127), vec![127]);
        assert_eq!(encode_u64(128), vec![0x81, 128]);
        assert_eq!(encode_u64(256), vec![0x82, 1, 0]);
        assert_eq!(encode_u128(1_000_000_000_000_000_000), vec![0x88, 0x0d, 0xe0, 0xb6, 0xb3, 0xa7, 0x64, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_bytes() {
        assert_eq!(encode_bytes(&[]), vec![0x80]);
        assert_eq!(encode_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_bytes(&[1, 2, 3]), vec![0x83, 1, 2, 3]);

        let long = vec![0xaa; 60];
        let encoded = encode_bytes(&long);
        assert_eq!(&encoded[..2], &[0xb8, 60]);
        assert_eq!(encoded.len(), 62);
    }

    #[test]
    fn test_encode_list() {
        assert_eq!(encode_list(&[]), vec![0xc0]);
        // ["cat", "dog"]
        let cat = encode_bytes(b"cat");
        let dog = encode_bytes(b"dog");
        assert_eq!(
            encode_list(&[cat, dog]),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }
}
