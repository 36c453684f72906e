use composer::{field_to_u64, power_of_two, Composer, Field, Variable};
use num_bigint::{BigInt, BigUint, Sign};

use crate::{error::CircuitError, utils::left_pad, CircuitResult};

pub const LIMB_BITS: usize = 64;

/// DER prefix of a DigestInfo holding a sha256 digest
pub const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// DigestInfo, digest and at least 8 bytes of 0xff padding
pub const MIN_KEY_BYTES: usize = SHA256_DIGEST_INFO.len() + 32 + 11;

// carries are offset by 2^72 to stay positive, then range checked to 80 bits
const CARRY_OFFSET_BITS: usize = 72;
const CARRY_RANGE_BITS: usize = 80;

fn biguint_to_field<F: Field>(value: &BigUint) -> F {
    F::from_le_bytes_mod_order(&value.to_bytes_le())
}

fn bigint_to_field<F: Field>(value: &BigInt) -> F {
    let magnitude = biguint_to_field::<F>(value.magnitude());
    if value.sign() == Sign::Minus {
        -magnitude
    } else {
        magnitude
    }
}

fn limb_value<F: Field>(cs: &Composer<F>, var: Variable) -> BigInt {
    BigInt::from(field_to_u64(cs.get_assignment(var)).unwrap_or(0))
}

/// An unsigned integer as little-endian 64-bit limbs.
#[derive(Debug, Clone)]
pub struct BigUintVar {
    pub limbs: Vec<Variable>,
}

impl BigUintVar {
    /// witness limbs, each range checked. a value wider than `num_limbs` is cut
    /// and leaves the constraints using it unsatisfied
    pub fn alloc<F: Field>(cs: &mut Composer<F>, value: &BigUint, num_limbs: usize) -> Self {
        let mut digits: Vec<u64> = value.iter_u64_digits().collect();
        if digits.len() > num_limbs {
            log::debug!("{} limbs do not fit in {}", digits.len(), num_limbs);
        }
        digits.resize(num_limbs, 0);

        let limbs = digits
            .into_iter()
            .map(|digit| {
                let var = cs.alloc(F::from(digit));
                cs.enforce_range(var, LIMB_BITS);
                var
            })
            .collect();

        Self { limbs }
    }

    pub fn constant<F: Field>(cs: &mut Composer<F>, value: &BigUint, num_limbs: usize) -> Self {
        let mut digits: Vec<u64> = value.iter_u64_digits().collect();
        digits.resize(num_limbs, 0);

        let limbs = digits
            .into_iter()
            .map(|digit| {
                if digit == 0 {
                    return Composer::<F>::null();
                }
                let var = cs.alloc(F::from(digit));
                cs.enforce_constant(var, F::from(digit));
                var
            })
            .collect();

        Self { limbs }
    }

    /// limbs packed from big-endian byte variables, which must already be bytes
    pub fn from_be_bytes<F: Field>(cs: &mut Composer<F>, bytes: &[Variable]) -> Self {
        assert_eq!(bytes.len() % 8, 0);
        let limbs = bytes
            .rchunks(8)
            .map(|chunk| {
                let terms: Vec<_> = chunk
                    .iter()
                    .enumerate()
                    .map(|(t, byte)| (*byte, power_of_two::<F>(8 * (7 - t))))
                    .collect();
                cs.linear_combination(&terms, F::zero())
            })
            .collect();

        Self { limbs }
    }

    pub fn num_limbs(&self) -> usize {
        self.limbs.len()
    }

    pub fn value<F: Field>(&self, cs: &Composer<F>) -> BigUint {
        self.limbs.iter().rev().fold(BigUint::from(0u32), |acc, limb| {
            let digit = field_to_u64(cs.get_assignment(*limb)).unwrap_or(0);
            (acc << LIMB_BITS) + BigUint::from(digit)
        })
    }

    /// `when_set` where `bit` is 1, self otherwise
    pub fn select<F: Field>(&self, cs: &mut Composer<F>, bit: Variable, when_set: &Self) -> Self {
        let limbs = self
            .limbs
            .iter()
            .zip(when_set.limbs.iter())
            .map(|(keep, set)| cs.select(bit, *set, *keep))
            .collect();

        Self { limbs }
    }
}

// acc + sign * sum(x * y), one gate per product
fn accumulate_products<F: Field>(
    cs: &mut Composer<F>,
    mut acc: Variable,
    pairs: &[(Variable, Variable)],
    sign: F,
) -> Variable {
    for (x, y) in pairs {
        if *x == Composer::<F>::null() || *y == Composer::<F>::null() {
            continue;
        }
        let value =
            cs.get_assignment(acc) + sign * cs.get_assignment(*x) * cs.get_assignment(*y);
        let next = cs.alloc(value);
        cs.poly_gate(
            vec![(*x, F::zero()), (*y, F::zero()), (acc, F::one()), (next, -F::one())],
            sign,
            F::zero(),
        );
        acc = next;
    }

    acc
}

/// Column pairs `(x_i, y_j)` with `i + j == t`.
fn column_pairs(x: &[Variable], y: &[Variable], t: usize) -> Vec<(Variable, Variable)> {
    (0..x.len())
        .filter_map(|i| {
            let j = t.checked_sub(i)?;
            y.get(j).map(|yj| (x[i], *yj))
        })
        .collect()
}

/// Enforce `a * b = q * n + r` over the integers, column by column with carries.
/// Returns `r = a * b mod n`.
pub fn mul_mod<F: Field>(
    cs: &mut Composer<F>,
    a: &BigUintVar,
    b: &BigUintVar,
    n: &BigUintVar,
) -> BigUintVar {
    let k = n.num_limbs();
    assert_eq!(a.num_limbs(), k);
    assert_eq!(b.num_limbs(), k);

    let product = a.value(cs) * b.value(cs);
    let modulus = n.value(cs);
    let (q_value, r_value) = if modulus.bits() == 0 {
        (BigUint::from(0u32), BigUint::from(0u32))
    } else {
        (&product / &modulus, &product % &modulus)
    };
    let q = BigUintVar::alloc(cs, &q_value, k + 1);
    let r = BigUintVar::alloc(cs, &r_value, k);

    let base = power_of_two::<F>(LIMB_BITS);
    let offset = power_of_two::<F>(CARRY_OFFSET_BITS);
    let offset_int = BigInt::from(1u32) << CARRY_OFFSET_BITS;

    let mut carry = BigInt::from(0u32);
    let mut carry_var = Composer::<F>::null();
    for t in 0..=2 * k {
        let ab = column_pairs(&a.limbs, &b.limbs, t);
        let qn = column_pairs(&q.limbs, &n.limbs, t);
        let r_t = r.limbs.get(t).copied().unwrap_or_else(Composer::<F>::null);

        let mut column = carry - limb_value(cs, r_t);
        for (x, y) in &ab {
            column += limb_value(cs, *x) * limb_value(cs, *y);
        }
        for (x, y) in &qn {
            column -= limb_value(cs, *x) * limb_value(cs, *y);
        }
        carry = column >> LIMB_BITS;

        let acc = accumulate_products(cs, Composer::<F>::null(), &ab, F::one());
        let acc = accumulate_products(cs, acc, &qn, -F::one());

        let next_carry = cs.alloc(bigint_to_field(&(&carry + &offset_int)));
        cs.enforce_range(next_carry, CARRY_RANGE_BITS);

        // acc - r_t + carry_{t-1} = 2^64 * carry_t, with offsets folded into q_c
        let q_c = if t == 0 { base * offset } else { base * offset - offset };
        cs.poly_gate(
            vec![
                (acc, F::one()),
                (r_t, -F::one()),
                (carry_var, F::one()),
                (next_carry, -base),
            ],
            F::zero(),
            q_c,
        );
        carry_var = next_carry;
    }
    // nothing left over past the top column
    cs.enforce_constant(carry_var, offset);

    r
}

/// `base ^ e mod n`, square and multiply over the bits of `e` (little-endian)
pub fn mod_exp<F: Field>(
    cs: &mut Composer<F>,
    base: &BigUintVar,
    exponent_bits: &[Variable],
    n: &BigUintVar,
) -> BigUintVar {
    let k = n.num_limbs();
    let mut acc = BigUintVar::constant(cs, &BigUint::from(1u32), k);
    for bit in exponent_bits.iter().rev() {
        acc = mul_mod(cs, &acc, &acc, n);
        let product = mul_mod(cs, &acc, base, n);
        acc = acc.select(cs, *bit, &product);
    }

    acc
}

// EM with a zero digest
fn encoded_message_template(key_bytes: usize) -> Vec<u8> {
    let mut em = vec![0x00, 0x01];
    em.resize(key_bytes - SHA256_DIGEST_INFO.len() - 32 - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(&SHA256_DIGEST_INFO);
    em.resize(key_bytes, 0x00);
    em
}

fn check_digest_len(len: usize) -> CircuitResult<()> {
    if len != 32 {
        return Err(CircuitError::KeySizeMismatch {
            what: "sha256 digest",
            expected: 32,
            actual: len,
        });
    }
    Ok(())
}

/// `00 01 ff..ff 00 ∥ DigestInfo ∥ hash`, `key_bytes` long
pub fn pkcs1v15_encode(hash: &[u8], key_bytes: usize) -> CircuitResult<Vec<u8>> {
    if key_bytes < MIN_KEY_BYTES {
        return Err(CircuitError::KeyTooSmall {
            key_bytes,
            required: MIN_KEY_BYTES,
        });
    }
    check_digest_len(hash.len())?;

    let mut em = encoded_message_template(key_bytes);
    em[key_bytes - 32..].copy_from_slice(hash);
    Ok(em)
}

/// Enforce `m` equals the PKCS#1 v1.5 encoding of the sha256 digest `hash`
/// (32 byte variables).
pub fn enforce_pkcs1v15_sha256<F: Field>(
    cs: &mut Composer<F>,
    m: &BigUintVar,
    hash: &[Variable],
    key_bytes: usize,
) -> CircuitResult<()> {
    check_digest_len(hash.len())?;
    if m.num_limbs() * 8 != key_bytes {
        return Err(CircuitError::KeySizeMismatch {
            what: "encoded message",
            expected: key_bytes,
            actual: m.num_limbs() * 8,
        });
    }
    if key_bytes < MIN_KEY_BYTES {
        return Err(CircuitError::KeyTooSmall {
            key_bytes,
            required: MIN_KEY_BYTES,
        });
    }

    let template = encoded_message_template(key_bytes);
    let hash_start = key_bytes - 32;
    for (i, limb) in m.limbs.iter().enumerate() {
        let mut constant = F::zero();
        let mut terms = vec![(*limb, -F::one())];
        for t in 0..8 {
            let p = key_bytes - 8 * (i + 1) + t;
            let weight = power_of_two::<F>(8 * (7 - t));
            if p >= hash_start {
                terms.push((hash[p - hash_start], weight));
            } else {
                constant += weight * F::from(template[p] as u64);
            }
        }
        cs.enforce_linear_combination(&terms, constant);
    }

    Ok(())
}

/// Enforce `signature ^ e mod n` is the PKCS#1 v1.5 sha256 encoding of `hash`.
pub fn verify_pkcs1v15_sha256<F: Field>(
    cs: &mut Composer<F>,
    signature: &BigUintVar,
    exponent_bits: &[Variable],
    modulus: &BigUintVar,
    hash: &[Variable],
) -> CircuitResult<()> {
    let key_bytes = modulus.num_limbs() * 8;
    let m = mod_exp(cs, signature, exponent_bits, modulus);
    log::debug!(
        "rsa: {}-byte modulus, {} exponent bits, {} gates so far",
        key_bytes,
        exponent_bits.len(),
        cs.size()
    );

    enforce_pkcs1v15_sha256(cs, &m, hash, key_bytes)
}

/// the same check on plain integers
pub fn verify_pkcs1v15_sha256_native(
    signature: &[u8],
    exponent: &[u8],
    modulus: &[u8],
    hash: &[u8],
) -> CircuitResult<()> {
    let n = BigUint::from_bytes_be(modulus);
    let key_bytes = ((n.bits() + 7) / 8) as usize;
    let em = pkcs1v15_encode(hash, key_bytes)?;

    let s = BigUint::from_bytes_be(signature);
    if s >= n {
        return Err(CircuitError::SignatureMismatch);
    }
    let m = s.modpow(&BigUint::from_bytes_be(exponent), &n);
    if left_pad(&m.to_bytes_be(), key_bytes, "message")? != em {
        return Err(CircuitError::SignatureMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer::{ark_bn254::Fr, bits::num_to_bits};
    use rand::{rngs::StdRng, SeedableRng};
    use rsa::{traits::PublicKeyParts, Pkcs1v15Sign, RsaPrivateKey};
    use sha2::{Digest, Sha256};

    fn signed(bits: usize) -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(42);
        let key = RsaPrivateKey::new(&mut rng, bits).unwrap();
        let digest = Sha256::digest(b"dkim-signature:v=1; a=rsa-sha256; b=").to_vec();
        let signature = key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest).unwrap();

        (signature, key.e().to_bytes_be(), key.n().to_bytes_be(), digest)
    }

    fn verify_in_circuit(signature: &[u8], e: &[u8], n: &[u8], hash: &[u8]) -> bool {
        let mut cs = Composer::<Fr>::new(5);
        let k = n.len() / 8;
        let signature = BigUintVar::alloc(&mut cs, &BigUint::from_bytes_be(signature), k);
        let modulus = BigUintVar::alloc(&mut cs, &BigUint::from_bytes_be(n), k);
        let e = cs.alloc(Fr::from(BigUint::from_bytes_be(e).iter_u64_digits().next().unwrap()));
        let e_bits = num_to_bits(&mut cs, e, 17);
        let hash: Vec<_> = hash
            .iter()
            .map(|b| {
                let var = cs.alloc(Fr::from(*b as u64));
                cs.enforce_range(var, 8);
                var
            })
            .collect();

        verify_pkcs1v15_sha256(&mut cs, &signature, &e_bits, &modulus, &hash).unwrap();
        println!("rsa circuit: {} gates", cs.size());
        cs.is_satisfied()
    }

    #[test]
    fn test_mul_mod() {
        let mut cs = Composer::<Fr>::new(5);
        let n_value: BigUint = (BigUint::from(1u32) << 127) + BigUint::from(61u32);
        let a_value: BigUint = (BigUint::from(1u32) << 126) + BigUint::from(12345u32);
        let b_value = n_value.clone() - BigUint::from(2u32);
        let n = BigUintVar::alloc(&mut cs, &n_value, 2);
        let a = BigUintVar::alloc(&mut cs, &a_value, 2);
        let b = BigUintVar::alloc(&mut cs, &b_value, 2);

        let r = mul_mod(&mut cs, &a, &b, &n);
        assert_eq!(r.value(&cs), (&a_value * &b_value) % &n_value);
        assert!(cs.is_satisfied());
    }

    #[test]
    fn test_zero_modulus() {
        let mut cs = Composer::<Fr>::new(5);
        let n = BigUintVar::alloc(&mut cs, &BigUint::from(0u32), 2);
        let a = BigUintVar::alloc(&mut cs, &BigUint::from(7u32), 2);
        let r = mul_mod(&mut cs, &a, &a, &n);
        assert_eq!(r.value(&cs), BigUint::from(0u32));
        assert!(!cs.is_satisfied());
    }

    #[test]
    fn test_from_be_bytes() {
        let mut cs = Composer::<Fr>::new(5);
        let bytes: Vec<u8> = (1..=16).collect();
        let vars: Vec<_> = bytes.iter().map(|b| cs.alloc(Fr::from(*b as u64))).collect();
        let x = BigUintVar::from_be_bytes(&mut cs, &vars);
        assert_eq!(x.num_limbs(), 2);
        assert_eq!(x.value(&cs), BigUint::from_bytes_be(&bytes));
    }

    #[test]
    fn test_encode() {
        let em = pkcs1v15_encode(&[0xab; 32], 128).unwrap();
        assert_eq!(em.len(), 128);
        assert_eq!(&em[..3], &[0x00, 0x01, 0xff]);
        assert_eq!(em[128 - 52], 0x00);
        assert_eq!(&em[128 - 51..128 - 32], &SHA256_DIGEST_INFO);
        assert_eq!(&em[96..], &[0xab; 32]);

        assert!(pkcs1v15_encode(&[0; 32], MIN_KEY_BYTES).is_ok());
        assert!(matches!(
            pkcs1v15_encode(&[0; 32], MIN_KEY_BYTES - 1),
            Err(CircuitError::KeyTooSmall { .. })
        ));
        assert!(matches!(
            pkcs1v15_encode(&[0; 31], 128),
            Err(CircuitError::KeySizeMismatch { expected: 32, actual: 31, .. })
        ));
    }

    #[test]
    fn test_verify_native() {
        let (signature, e, n, digest) = signed(1024);
        verify_pkcs1v15_sha256_native(&signature, &e, &n, &digest).unwrap();

        let mut flipped = digest.clone();
        flipped[31] ^= 1;
        assert!(matches!(
            verify_pkcs1v15_sha256_native(&signature, &e, &n, &flipped),
            Err(CircuitError::SignatureMismatch)
        ));

        assert!(matches!(
            verify_pkcs1v15_sha256_native(&signature, &e, &n, &digest[..20]),
            Err(CircuitError::KeySizeMismatch { what: "sha256 digest", .. })
        ));
    }

    #[test]
    fn test_enforce_digest_len() {
        let mut cs = Composer::<Fr>::new(5);
        let m = BigUintVar::alloc(&mut cs, &BigUint::from(1u32), 16);
        let hash: Vec<_> = (0..31).map(|_| cs.alloc(Fr::from(0u64))).collect();
        assert!(matches!(
            enforce_pkcs1v15_sha256(&mut cs, &m, &hash, 128),
            Err(CircuitError::KeySizeMismatch { expected: 32, actual: 31, .. })
        ));

        let hash: Vec<_> = (0..32).map(|_| cs.alloc(Fr::from(0u64))).collect();
        assert!(matches!(
            enforce_pkcs1v15_sha256(&mut cs, &m, &hash, 256),
            Err(CircuitError::KeySizeMismatch { what: "encoded message", .. })
        ));
    }

    #[test]
    fn test_verify_in_circuit() {
        let (signature, e, n, digest) = signed(1024);
        assert!(verify_in_circuit(&signature, &e, &n, &digest));

        let mut flipped = digest;
        flipped[0] ^= 0x80;
        assert!(!verify_in_circuit(&signature, &e, &n, &flipped));
    }

    // 32 limbs: the column carries stay inside the offset range
    #[test]
    fn test_verify_in_circuit_2048() {
        let (signature, e, n, digest) = signed(2048);
        assert_eq!(n.len(), 256);
        assert!(verify_in_circuit(&signature, &e, &n, &digest));

        let mut flipped = digest;
        flipped[31] ^= 1;
        assert!(!verify_in_circuit(&signature, &e, &n, &flipped));
    }

    #[test]
    fn test_verify_in_circuit_4096() {
        let (signature, e, n, digest) = signed(4096);
        assert_eq!(n.len(), 512);
        assert!(verify_in_circuit(&signature, &e, &n, &digest));
    }
}
