use crate::abi::strip_hex_prefix;

/// Signer index encoded in the first byte of a cosigner signature.
///
/// Cosigner signatures are hex strings whose leading byte is the position of
/// the signer's key in the multi-signature asset. This is the only place that
/// knows about that layout.
pub fn signer_index(signature: &str) -> Option<u8> {
    let prefix = strip_hex_prefix(signature).get(..2)?;
    let mut byte = [0u8; 1];
    hex::decode_to_slice(prefix, &mut byte).ok()?;
    Some(byte[0])
}

/// Signatures that count towards the threshold: the first one seen for each
/// signer index that refers to a known key.
pub fn valid_signatures<'a>(signatures: &'a [String], key_count: usize) -> Vec<(u8, &'a str)> {
    let mut valid: Vec<(u8, &'a str)> = Vec::new();
    for signature in signatures {
        let Some(index) = signer_index(signature) else {
            continue;
        };
        if usize::from(index) >= key_count {
            continue;
        }
        if valid.iter().any(|(seen, _)| *seen == index) {
            continue;
        }
        valid.push((index, signature.as_str()));
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_read_from_first_byte() {
        assert_eq!(signer_index("00ab"), Some(0));
        assert_eq!(signer_index("0x02ab"), Some(2));
        assert_eq!(signer_index("ff"), Some(255));
        assert_eq!(signer_index("z1"), None);
        assert_eq!(signer_index("1"), None);
    }

    #[test]
    fn duplicates_and_unknown_signers_are_dropped() {
        let signatures = vec![
            "00aa".to_string(),
            "00bb".to_string(),
            "05cc".to_string(),
            "01dd".to_string(),
        ];
        let valid = valid_signatures(&signatures, 3);
        assert_eq!(valid, vec![(0, "00aa"), (1, "01dd")]);
    }
}
