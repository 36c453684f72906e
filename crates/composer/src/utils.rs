use ark_ff::BigInteger;

pub use ark_ff::PrimeField as Field;

/// the value of `value` as a u64, if it fits
pub fn field_to_u64<F: Field>(value: F) -> Option<u64> {
    let repr = value.into_repr();
    let limbs = repr.as_ref();
    if limbs[1..].iter().any(|&limb| limb != 0) {
        return None;
    }

    Some(limbs[0])
}

/// the low `num_bits` bits of `value`, little-endian
pub fn field_to_bits_le<F: Field>(value: F, num_bits: usize) -> Vec<bool> {
    let repr = value.into_repr();
    (0..num_bits).map(|i| repr.get_bit(i)).collect()
}

/// 2^exp in the field
pub fn power_of_two<F: Field>(exp: usize) -> F {
    F::from(2u64).pow([exp as u64])
}

/// interpret big-endian bytes as a field element (reduced mod p)
pub fn field_from_be_bytes<F: Field>(bytes: &[u8]) -> F {
    F::from_be_bytes_mod_order(bytes)
}
