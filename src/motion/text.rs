//! Fixed-width Shift_JIS name fields

use super::FormatError;
use encoding_rs::SHIFT_JIS;

/// Encode a name into a null-padded field of `N` bytes
///
/// Names are never truncated: a name that does not fit is an error.
pub fn encode_name<const N: usize>(name: &str) -> Result<[u8; N], FormatError> {
    let (encoded, _, had_errors) = SHIFT_JIS.encode(name);
    if had_errors {
        return Err(FormatError::UnencodableName(name.to_string()));
    }
    if encoded.len() > N {
        return Err(FormatError::NameTooLong {
            name: name.to_string(),
            len: encoded.len(),
            budget: N,
        });
    }

    let mut field = [0u8; N];
    field[..encoded.len()].copy_from_slice(&encoded);
    Ok(field)
}

/// Decode a null-padded field, stopping at the first null byte
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let (decoded, _) = SHIFT_JIS.decode_without_bom_handling(&field[..end]);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pads_with_nulls() {
        let field: [u8; 20] = encode_name("TestModel").unwrap();
        assert_eq!(&field[..9], b"TestModel");
        assert!(field[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_japanese_roundtrip() {
        // Each kana is two bytes in Shift_JIS
        let field: [u8; 15] = encode_name("あいうお").unwrap();
        assert_eq!(field[8], 0);
        assert_eq!(decode_name(&field), "あいうお");
    }

    #[test]
    fn test_name_too_long() {
        let err = encode_name::<15>("ありがとうございます").unwrap_err();
        assert!(matches!(
            err,
            FormatError::NameTooLong { len: 20, budget: 15, .. }
        ));
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        let field: [u8; 15] = encode_name("abcdefghijklmno").unwrap();
        assert_eq!(decode_name(&field), "abcdefghijklmno");
    }

    #[test]
    fn test_decode_ignores_bytes_after_null() {
        let mut field = [0u8; 15];
        field[..3].copy_from_slice(b"abc");
        field[4..7].copy_from_slice(b"xyz");
        assert_eq!(decode_name(&field), "abc");
    }

    #[test]
    fn test_unencodable_name() {
        let err = encode_name::<15>("😀").unwrap_err();
        assert!(matches!(err, FormatError::UnencodableName(_)));
    }
}
