//! SHA-256 over bit-decomposed 32-bit words.
//!
//! Every word carries its packed value and its 32 bits (little-endian). The
//! round functions work on bits with the one-row boolean gates, modular
//! additions are done on packed values with explicit carry bits.
use crate::bits::{bits_to_num, num_to_bits, ByteVar};
use crate::{field_to_bits_le, field_to_u64, power_of_two, Composer, Field, Variable};

pub const INIT_SHA256HASH: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

pub const SHA256CONSTS: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

pub const SHA256_BLOCK_BYTES: usize = 64;

/// sha256 padding appended to a message of `len` bytes: 0x80, zeros, then the bit length
pub fn padding_bytes(len: usize) -> Vec<u8> {
    let mut padding = vec![0x80u8];
    let rem = (len + 1) % SHA256_BLOCK_BYTES;
    let zeros = if rem <= 56 { 56 - rem } else { 120 - rem };
    padding.extend(vec![0u8; zeros]);
    padding.extend_from_slice(&((len as u64) * 8).to_be_bytes());
    log::trace!("padding {} bytes for a message of {} bytes", padding.len(), len);

    padding
}

/// number of 64-byte blocks of a padded message of `len` bytes
pub fn padded_block_count(len: usize) -> usize {
    (len + 8) / SHA256_BLOCK_BYTES + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Word {
    pub var: Variable,
    pub bits: [Variable; 32],
}

impl Sha256Word {
    pub fn constant<F: Field>(cs: &mut Composer<F>, value: u32) -> Self {
        let var = cs.alloc(F::from(value as u64));
        cs.enforce_constant(var, F::from(value as u64));

        let mut bits = [Composer::<F>::null(); 32];
        for (k, bit) in bits.iter_mut().enumerate() {
            if (value >> k) & 1 == 1 {
                *bit = Composer::<F>::one();
            }
        }

        Self { var, bits }
    }

    /// constrain `var` to 32 bits
    pub fn new_from_32bits_var<F: Field>(cs: &mut Composer<F>, var: Variable) -> Self {
        let decomposed = num_to_bits(cs, var, 32);
        let mut bits = [Composer::<F>::null(); 32];
        bits.copy_from_slice(&decomposed);

        Self { var, bits }
    }

    /// four bytes, big-endian
    pub fn new_from_bytes<F: Field>(cs: &mut Composer<F>, bytes: &[ByteVar]) -> Self {
        assert_eq!(bytes.len(), 4);

        let mut bits = [Composer::<F>::null(); 32];
        for (k, bit) in bits.iter_mut().enumerate() {
            *bit = bytes[3 - k / 8].bits[k % 8];
        }
        let terms: Vec<_> = bytes
            .iter()
            .enumerate()
            .map(|(i, b)| (b.var, F::from(1u64 << (8 * (3 - i)))))
            .collect();
        let var = cs.linear_combination(&terms, F::zero());

        Self { var, bits }
    }

    /// the four bytes, big-endian, reusing the bits of the word
    pub fn to_bytes<F: Field>(&self, cs: &mut Composer<F>) -> Vec<ByteVar> {
        (0..4)
            .map(|i| {
                let mut bits = [Composer::<F>::null(); 8];
                bits.copy_from_slice(&self.bits[8 * (3 - i)..8 * (4 - i)]);
                let var = bits_to_num(cs, &bits);
                ByteVar { var, bits }
            })
            .collect()
    }

    pub fn value<F: Field>(&self, cs: &Composer<F>) -> u32 {
        field_to_u64(cs.get_assignment(self.var)).unwrap_or(0) as u32
    }
}

fn rotr<F: Field>(bits: &[Variable; 32], n: usize) -> [Variable; 32] {
    let mut out = [Composer::<F>::null(); 32];
    for (k, o) in out.iter_mut().enumerate() {
        *o = bits[(k + n) % 32];
    }
    out
}

fn shr<F: Field>(bits: &[Variable; 32], n: usize) -> [Variable; 32] {
    let mut out = [Composer::<F>::null(); 32];
    for (k, o) in out.iter_mut().enumerate().take(32 - n) {
        *o = bits[k + n];
    }
    out
}

fn xor3_words<F: Field>(
    cs: &mut Composer<F>,
    x: [Variable; 32],
    y: [Variable; 32],
    z: [Variable; 32],
) -> [Variable; 32] {
    let mut out = [Composer::<F>::null(); 32];
    for k in 0..32 {
        out[k] = cs.xor3(x[k], y[k], z[k]);
    }
    out
}

/// Σ0(a) = ROTR2 ^ ROTR13 ^ ROTR22
pub fn sha256_sum_0<F: Field>(cs: &mut Composer<F>, word: &Sha256Word) -> [Variable; 32] {
    let b = &word.bits;
    xor3_words(cs, rotr::<F>(b, 2), rotr::<F>(b, 13), rotr::<F>(b, 22))
}

/// Σ1(e) = ROTR6 ^ ROTR11 ^ ROTR25
pub fn sha256_sum_1<F: Field>(cs: &mut Composer<F>, word: &Sha256Word) -> [Variable; 32] {
    let b = &word.bits;
    xor3_words(cs, rotr::<F>(b, 6), rotr::<F>(b, 11), rotr::<F>(b, 25))
}

/// σ0(w) = ROTR7 ^ ROTR18 ^ SHR3
pub fn sha256_sigma_0<F: Field>(cs: &mut Composer<F>, word: &Sha256Word) -> [Variable; 32] {
    let b = &word.bits;
    xor3_words(cs, rotr::<F>(b, 7), rotr::<F>(b, 18), shr::<F>(b, 3))
}

/// σ1(w) = ROTR17 ^ ROTR19 ^ SHR10
pub fn sha256_sigma_1<F: Field>(cs: &mut Composer<F>, word: &Sha256Word) -> [Variable; 32] {
    let b = &word.bits;
    xor3_words(cs, rotr::<F>(b, 17), rotr::<F>(b, 19), shr::<F>(b, 10))
}

fn weighted_bits<F: Field>(bits: &[Variable; 32], powers: &[F]) -> Vec<(Variable, F)> {
    bits.iter().zip(powers).map(|(b, p)| (*b, *p)).collect()
}

/// (sum(terms) + constant) mod 2^32, with `carry_bits` bits to absorb the overflow
fn add_mod32<F: Field>(
    cs: &mut Composer<F>,
    terms: &[(Variable, F)],
    constant: u32,
    carry_bits: usize,
) -> Sha256Word {
    let mut total = F::from(constant as u64);
    for (var, coeff) in terms {
        total += cs.get_assignment(*var) * coeff;
    }
    let total_bits = field_to_bits_le(total, 32 + carry_bits);

    let alloc_bit = |cs: &mut Composer<F>, bit: bool| {
        let var = cs.alloc(if bit { F::one() } else { F::zero() });
        cs.enforce_bool(var);
        var
    };
    let mut bits = [Composer::<F>::null(); 32];
    for (k, bit) in bits.iter_mut().enumerate() {
        *bit = alloc_bit(cs, total_bits[k]);
    }
    let carries: Vec<_> = (0..carry_bits)
        .map(|j| alloc_bit(cs, total_bits[32 + j]))
        .collect();

    let var = bits_to_num(cs, &bits);

    let mut relation = terms.to_vec();
    relation.push((var, -F::one()));
    for (j, carry) in carries.iter().enumerate() {
        relation.push((*carry, -power_of_two::<F>(32 + j)));
    }
    cs.enforce_linear_combination(&relation, F::from(constant as u64));

    Sha256Word { var, bits }
}

/// the constant initial hash value
pub fn sha256_init_state<F: Field>(cs: &mut Composer<F>) -> Vec<Sha256Word> {
    INIT_SHA256HASH
        .iter()
        .map(|v| Sha256Word::constant(cs, *v))
        .collect()
}

/// one compression of a 16-word block into `state`
pub fn sha256_chunk_words_var<F: Field>(
    cs: &mut Composer<F>,
    chunk_messages: &[Sha256Word],
    state: &[Sha256Word],
) -> Vec<Sha256Word> {
    assert_eq!(chunk_messages.len(), 16);
    assert_eq!(state.len(), 8);

    let powers: Vec<F> = (0..32).map(|k| F::from(1u64 << k)).collect();

    // message schedule
    let mut w: Vec<Sha256Word> = chunk_messages.to_vec();
    for t in 16..64 {
        let s0 = sha256_sigma_0(cs, &w[t - 15]);
        let s1 = sha256_sigma_1(cs, &w[t - 2]);
        let mut terms = vec![(w[t - 16].var, F::one()), (w[t - 7].var, F::one())];
        terms.extend(weighted_bits(&s0, &powers));
        terms.extend(weighted_bits(&s1, &powers));
        let word = add_mod32(cs, &terms, 0, 2);
        w.push(word);
    }

    let mut working = state.to_vec();
    for t in 0..64 {
        let (a, b, c, d) = (working[0], working[1], working[2], working[3]);
        let (e, f, g, h) = (working[4], working[5], working[6], working[7]);

        // T1 = h + Σ1(e) + Ch(e, f, g) + K[t] + W[t], kept unreduced
        let s1 = sha256_sum_1(cs, &e);
        let mut ch = [Composer::<F>::null(); 32];
        for k in 0..32 {
            ch[k] = cs.ch(e.bits[k], f.bits[k], g.bits[k]);
        }
        let mut terms = vec![(h.var, F::one()), (w[t].var, F::one())];
        terms.extend(weighted_bits(&s1, &powers));
        terms.extend(weighted_bits(&ch, &powers));
        let t1 = cs.linear_combination(&terms, F::from(SHA256CONSTS[t] as u64));

        // T2 = Σ0(a) + Maj(a, b, c)
        let s0 = sha256_sum_0(cs, &a);
        let mut maj = [Composer::<F>::null(); 32];
        for k in 0..32 {
            maj[k] = cs.maj(a.bits[k], b.bits[k], c.bits[k]);
        }

        let new_e = add_mod32(cs, &[(d.var, F::one()), (t1, F::one())], 0, 3);

        let mut terms = vec![(t1, F::one())];
        terms.extend(weighted_bits(&s0, &powers));
        terms.extend(weighted_bits(&maj, &powers));
        let new_a = add_mod32(cs, &terms, 0, 3);

        working = vec![new_a, a, b, c, new_e, e, f, g];
    }

    state
        .iter()
        .zip(working.iter())
        .map(|(s, x)| add_mod32(cs, &[(s.var, F::one()), (x.var, F::one())], 0, 1))
        .collect()
}

/// compress an already padded message. returns the state after every block,
/// the initial state first
pub fn sha256_no_padding_blocks<F: Field>(
    cs: &mut Composer<F>,
    padded: &[ByteVar],
) -> Vec<Vec<Sha256Word>> {
    assert_eq!(padded.len() % SHA256_BLOCK_BYTES, 0);

    let mut states = vec![sha256_init_state(cs)];
    for block in padded.chunks(SHA256_BLOCK_BYTES) {
        let words: Vec<_> = block
            .chunks(4)
            .map(|bytes| Sha256Word::new_from_bytes(cs, bytes))
            .collect();
        let next = sha256_chunk_words_var(cs, &words, &states[states.len() - 1]);
        states.push(next);
    }

    states
}

/// sha256 of a message whose length is fixed by the circuit. returns the 8 state words
pub fn sha256_fixed_length<F: Field>(cs: &mut Composer<F>, message: &[ByteVar]) -> Vec<Sha256Word> {
    let mut padded = message.to_vec();
    for byte in padding_bytes(message.len()) {
        padded.push(ByteVar::constant(cs, byte));
    }

    let mut states = sha256_no_padding_blocks(cs, &padded);
    states.pop().unwrap_or_default()
}

/// the 32 digest bytes of a state
pub fn sha256_state_to_bytes<F: Field>(cs: &mut Composer<F>, state: &[Sha256Word]) -> Vec<ByteVar> {
    assert_eq!(state.len(), 8);
    state.iter().flat_map(|w| w.to_bytes(cs)).collect()
}

/// the digest as a field element with the top 3 bits dropped (253 bits)
pub fn sha256_collect_8_outputs_to_field<F: Field>(
    cs: &mut Composer<F>,
    state: &[Sha256Word],
) -> Variable {
    assert_eq!(state.len(), 8);

    let mut terms = Vec::with_capacity(253);
    for (i, word) in state.iter().enumerate() {
        let top = if i == 0 { 29 } else { 32 };
        for (k, bit) in word.bits.iter().take(top).enumerate() {
            terms.push((*bit, power_of_two::<F>(32 * (7 - i) + k)));
        }
    }

    cs.linear_combination(&terms, F::zero())
}

/// the digest bytes the state words hold under the current assignment
pub fn sha256_state_values<F: Field>(cs: &Composer<F>, state: &[Sha256Word]) -> Vec<u8> {
    state
        .iter()
        .flat_map(|w| w.value(cs).to_be_bytes())
        .collect()
}
