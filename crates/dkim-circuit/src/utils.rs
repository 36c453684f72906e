use composer::{ark_ff::BigInteger, field_from_be_bytes, Field};

use crate::{error::CircuitError, CircuitResult};

pub fn to_0x_hex<T>(data: T) -> String
where
    T: AsRef<[u8]>,
{
    let mut res = String::from("0x");
    res += &hex::encode(data);
    res
}

/// public inputs as minimal `0x` hex strings
pub fn convert_public_inputs<F: Field>(public_input: &[F]) -> Vec<String> {
    public_input
        .iter()
        .map(|e| {
            let bytes = e.into_repr().to_bytes_be();
            let digits = hex::encode(bytes);
            let digits = digits.trim_start_matches('0');
            if digits.is_empty() {
                "0x0".to_string()
            } else {
                format!("0x{}", digits)
            }
        })
        .collect()
}

/// a 32-byte digest as a field element, top 3 bits dropped
pub fn digest_to_field<F: Field>(digest: &[u8]) -> F {
    assert_eq!(digest.len(), 32);
    let mut truncated = digest.to_vec();
    truncated[0] &= 0x1f;
    field_from_be_bytes(&truncated)
}

/// a signed value as a field element, negatives wrapping around the modulus
pub fn i64_to_field<F: Field>(value: i64) -> F {
    if value < 0 {
        -F::from(value.unsigned_abs())
    } else {
        F::from(value as u64)
    }
}

/// `bytes` left-padded with zeros to `width`
pub fn left_pad(bytes: &[u8], width: usize, what: &'static str) -> CircuitResult<Vec<u8>> {
    if bytes.len() > width {
        return Err(CircuitError::KeySizeMismatch {
            what,
            expected: width,
            actual: bytes.len(),
        });
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);

    Ok(out)
}

/// big-endian bytes without leading zeros
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let zeros = bytes.iter().take_while(|b| **b == 0).count();
    &bytes[zeros..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer::ark_bn254::Fr;
    use composer::ark_ff::{One, Zero};

    #[test]
    fn test_hex() {
        assert_eq!(to_0x_hex([0xde, 0xad]), "0xdead");
        assert_eq!(to_0x_hex(Vec::<u8>::new()), "0x");
    }

    #[test]
    fn test_convert_public_inputs() {
        let inputs = [Fr::zero(), Fr::one(), Fr::from(0x1234u64)];
        assert_eq!(convert_public_inputs(&inputs), vec!["0x0", "0x1", "0x1234"]);
    }

    #[test]
    fn test_digest_to_field() {
        let mut digest = [0xffu8; 32];
        let x: Fr = digest_to_field(&digest);
        digest[0] = 0x1f;
        let y: Fr = field_from_be_bytes(&digest);
        assert_eq!(x, y);
    }

    #[test]
    fn test_padding_helpers() {
        assert_eq!(i64_to_field::<Fr>(-1), -Fr::one());
        assert_eq!(i64_to_field::<Fr>(7), Fr::from(7u64));
        assert_eq!(left_pad(&[1, 2], 4, "modulus").unwrap(), vec![0, 0, 1, 2]);
        assert!(left_pad(&[1, 2, 3], 2, "modulus").is_err());
        assert_eq!(strip_leading_zeros(&[0, 0, 5, 0]), &[5, 0]);
    }
}
