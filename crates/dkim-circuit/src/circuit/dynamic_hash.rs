use composer::{
    bits::ByteVar,
    selectors::mux1_from_selectors,
    sha256::{
        padded_block_count, sha256_fixed_length, sha256_no_padding_blocks, Sha256Word,
        SHA256_BLOCK_BYTES,
    },
    Composer, Field, Variable,
};
use sha2::{Digest, Sha256};

use crate::{
    circuit::{misc::slice_shift_left, padded_slice::PaddedSliceVar},
    parameters::HashStrategy,
};

/// state words of sha256 over the empty message
fn empty_message_state<F: Field>(cs: &mut Composer<F>) -> Vec<Sha256Word> {
    Sha256::digest(b"")
        .chunks(4)
        .map(|w| Sha256Word::constant(cs, u32::from_be_bytes([w[0], w[1], w[2], w[3]])))
        .collect()
}

// pick one of the candidate states word by word
fn select_state<F: Field>(
    cs: &mut Composer<F>,
    candidates: &[Vec<Sha256Word>],
    selectors: &[Variable],
) -> Vec<Sha256Word> {
    (0..8)
        .map(|w| {
            let words: Vec<_> = candidates.iter().map(|state| state[w].var).collect();
            let chosen = mux1_from_selectors(cs, &words, selectors);
            Sha256Word::new_from_32bits_var(cs, chosen)
        })
        .collect()
}

/// Sha256 of the real bytes of a padded slice. One fixed-length hash per possible
/// start offset, plus the empty message, selected by the slice's start selectors.
pub fn sha256_windowed<F: Field>(
    cs: &mut Composer<F>,
    bytes: &[Variable],
    starts: &[Variable],
) -> Vec<Sha256Word> {
    let capacity = bytes.len();
    assert_eq!(starts.len(), capacity + 1);

    let bytes: Vec<_> = bytes.iter().map(|b| ByteVar::new(cs, *b)).collect();
    let mut candidates = Vec::with_capacity(capacity + 1);
    for i in 0..capacity {
        log::trace!("window {} of {} bytes", i, capacity - i);
        candidates.push(sha256_fixed_length(cs, &bytes[i..]));
    }
    candidates.push(empty_message_state(cs));

    select_state(cs, &candidates, starts)
}

/// Sha256 of the real bytes of a padded slice, linear in the capacity: the real
/// bytes are shifted to the front, the sha256 padding is written where the data
/// ends, and the state after the block holding the length is selected.
pub fn sha256_shifted<F: Field>(
    cs: &mut Composer<F>,
    bytes: &[Variable],
    start: Variable,
    starts: &[Variable],
) -> Vec<Sha256Word> {
    let capacity = bytes.len();
    assert_eq!(starts.len(), capacity + 1);

    let data = slice_shift_left(cs, bytes, start, capacity);
    // one-hot of the real length
    let ends: Vec<_> = starts.iter().rev().copied().collect();

    let num_blocks = padded_block_count(capacity);
    let total = num_blocks * SHA256_BLOCK_BYTES;

    // blocks[m - 1] = 1 when the message takes m blocks
    let blocks: Vec<_> = (1..=num_blocks)
        .map(|m| {
            let terms: Vec<_> = (0..=capacity)
                .filter(|len| padded_block_count(*len) == m)
                .map(|len| (ends[len], F::one()))
                .collect();
            cs.linear_combination(&terms, F::zero())
        })
        .collect();

    // the bit length, big-endian in 8 bytes
    let bit_len = cs.linear_combination(&[(start, -F::from(8u64))], F::from(8 * capacity as u64));
    let mut len_bytes = cs.decompose_bytes(bit_len, 8);
    len_bytes.reverse();

    let mut message = Vec::with_capacity(total);
    for k in 0..total {
        let mut terms = Vec::new();
        if k < capacity {
            terms.push((data[k], F::one()));
        }
        if k <= capacity {
            terms.push((ends[k], F::from(0x80u64)));
        }
        let m = k / SHA256_BLOCK_BYTES + 1;
        let in_block = k % SHA256_BLOCK_BYTES;
        if in_block >= SHA256_BLOCK_BYTES - 8 {
            let len_byte = cs.mul(blocks[m - 1], len_bytes[in_block + 8 - SHA256_BLOCK_BYTES]);
            terms.push((len_byte, F::one()));
        }

        if terms.is_empty() {
            message.push(ByteVar::zero::<F>());
        } else {
            let var = cs.linear_combination(&terms, F::zero());
            message.push(ByteVar::new(cs, var));
        }
    }
    log::trace!("shifted hash over {} blocks", num_blocks);

    let states = sha256_no_padding_blocks(cs, &message);
    select_state(cs, &states[1..], &blocks)
}

/// hash the real bytes of a slice with the given strategy
pub fn sha256_padded_slice<F: Field>(
    cs: &mut Composer<F>,
    slice: &PaddedSliceVar,
    strategy: HashStrategy,
) -> Vec<Sha256Word> {
    match strategy {
        HashStrategy::Windowed => sha256_windowed(cs, &slice.bytes, &slice.starts),
        HashStrategy::Shifted => sha256_shifted(cs, &slice.bytes, slice.start, &slice.starts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaddedBytes;
    use composer::{ark_bn254::Fr, sha256::sha256_state_values};

    fn hash_with(data: &[u8], capacity: usize, strategy: HashStrategy) -> (Vec<u8>, bool) {
        let mut cs = Composer::<Fr>::new(5);
        let padded = PaddedBytes::new(data, capacity, "test").unwrap();
        let slice = PaddedSliceVar::alloc(&mut cs, &padded);
        let state = sha256_padded_slice(&mut cs, &slice, strategy);
        (sha256_state_values(&cs, &state), cs.is_satisfied())
    }

    #[test]
    fn test_windowed() {
        let cases: [(&[u8], usize); 4] = [(b"hello", 10), (b"", 4), (b"abcd", 4), (b"x", 1)];
        for (data, capacity) in cases {
            let (digest, ok) = hash_with(data, capacity, HashStrategy::Windowed);
            assert!(ok);
            assert_eq!(digest, Sha256::digest(data).to_vec(), "{:?}", data);
        }
    }

    #[test]
    fn test_shifted() {
        let long = vec![b'a'; 60];
        let cases: [(&[u8], usize); 6] = [
            (b"hello", 10),
            (b"", 4),
            (b"abcd", 4),
            (&long[..55], 70),
            (&long[..56], 70),
            (&long, 64),
        ];
        for (data, capacity) in cases {
            let (digest, ok) = hash_with(data, capacity, HashStrategy::Shifted);
            assert!(ok);
            assert_eq!(digest, Sha256::digest(data).to_vec(), "{} bytes", data.len());
        }
    }

    #[test]
    fn test_strategies_share_unsatisfiability() {
        for strategy in [HashStrategy::Windowed, HashStrategy::Shifted] {
            let mut cs = Composer::<Fr>::new(5);
            let mut padded = PaddedBytes::new(b"abc", 6, "test").unwrap();
            padded.padding = 6;
            let slice = PaddedSliceVar::alloc(&mut cs, &padded);
            sha256_padded_slice(&mut cs, &slice, strategy);
            assert!(!cs.is_satisfied());
        }
    }

    #[test]
    fn test_shape_does_not_depend_on_length() {
        let digest = |data: &[u8]| {
            let mut cs = Composer::<Fr>::new(5);
            let slice = PaddedSliceVar::alloc(&mut cs, &PaddedBytes::new(data, 12, "t").unwrap());
            sha256_shifted(&mut cs, &slice.bytes, slice.start, &slice.starts);
            cs.shape_digest()
        };
        assert_eq!(digest(b""), digest(b"hello world!"));
    }
}
