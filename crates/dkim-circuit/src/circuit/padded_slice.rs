use composer::{
    field_to_u64,
    selectors::{mux1_from_selectors, num_to_selectors, selectors_suffix_sums},
    Composer, Field, Variable,
};

use crate::{circuit::misc::slice_shift_right, types::PaddedBytes, utils::i64_to_field};

/// A padded slice in circuit: `capacity` byte variables whose first `padding + 1`
/// are zero, and the one-hot selectors of where the real bytes begin.
#[derive(Debug, Clone)]
pub struct PaddedSliceVar {
    pub bytes: Vec<Variable>,
    pub padding: Variable,
    /// `padding + 1`, the offset of the first real byte
    pub start: Variable,
    /// one-hot over `start`, `capacity + 1` entries. the last one means empty
    pub starts: Vec<Variable>,
}

impl PaddedSliceVar {
    /// allocate a witness slice, every byte range checked
    pub fn alloc<F: Field>(cs: &mut Composer<F>, padded: &PaddedBytes) -> Self {
        let bytes = padded
            .bytes
            .iter()
            .map(|b| {
                let var = cs.alloc(F::from(*b as u64));
                cs.enforce_range(var, 8);
                var
            })
            .collect();
        let padding = cs.alloc(i64_to_field(padded.padding));

        Self::from_vars(cs, bytes, padding)
    }

    /// a slice with no padding over bytes already constrained elsewhere
    pub fn full<F: Field>(cs: &mut Composer<F>, bytes: Vec<Variable>) -> Self {
        let padding = cs.alloc(-F::one());
        cs.enforce_constant(padding, -F::one());

        Self::from_vars(cs, bytes, padding)
    }

    /// Bind `padding` to `bytes`: `start` lies in `[0, capacity]` and every byte
    /// before it is zero.
    pub fn from_vars<F: Field>(cs: &mut Composer<F>, bytes: Vec<Variable>, padding: Variable) -> Self {
        let capacity = bytes.len();
        let start = cs.linear_combination(&[(padding, F::one())], F::one());
        let starts = num_to_selectors(cs, start, capacity + 1);

        // is_pad[k] = 1 exactly when k < start
        let is_pad = selectors_suffix_sums(cs, &starts);
        for (byte, pad) in bytes.iter().zip(is_pad.iter()) {
            cs.mul_gate(*byte, *pad, Composer::<F>::null());
        }

        Self {
            bytes,
            padding,
            start,
            starts,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// The last real byte is `byte`. With `allow_empty` an empty slice passes too.
    pub fn enforce_ends_with<F: Field>(&self, cs: &mut Composer<F>, byte: u8, allow_empty: bool) {
        let last = self.bytes.last().copied().unwrap_or_else(Composer::<F>::null);
        let byte = F::from(byte as u64);

        if allow_empty {
            let empty = self.starts[self.capacity()];
            // (last - byte) * (1 - empty) = 0
            cs.poly_gate(vec![(last, F::one()), (empty, byte)], -F::one(), -byte);
        } else {
            cs.enforce_constant(last, byte);
        }
    }

    /// The real bytes open with the header field `name` and its colon. ASCII
    /// letters match in either case.
    pub fn enforce_field_name<F: Field>(&self, cs: &mut Composer<F>, name: &str) {
        let capacity = self.capacity();

        for (j, expected) in name.bytes().chain(Some(b':')).enumerate() {
            // candidates[k] is the byte j places after start k
            let candidates: Vec<_> = (0..=capacity)
                .map(|k| {
                    if k + j < capacity {
                        self.bytes[k + j]
                    } else {
                        Composer::<F>::null()
                    }
                })
                .collect();
            let byte = mux1_from_selectors(cs, &candidates, &self.starts);

            let lower = F::from(expected.to_ascii_lowercase() as u64);
            let upper = F::from(expected.to_ascii_uppercase() as u64);
            if lower == upper {
                cs.enforce_constant(byte, lower);
            } else {
                // (byte - lower) * (byte - upper) = 0
                cs.poly_gate(
                    vec![(byte, -(lower + upper)), (byte, F::zero())],
                    F::one(),
                    lower * upper,
                );
            }
        }
    }

    /// the bytes and padding under the current assignment
    pub fn value<F: Field>(&self, cs: &Composer<F>) -> PaddedBytes {
        let bytes = cs
            .get_assignments(&self.bytes)
            .into_iter()
            .map(|v| field_to_u64(v).unwrap_or(0) as u8)
            .collect();
        let padding = cs.get_assignment(self.padding);
        let padding = if padding == -F::one() {
            -1
        } else {
            field_to_u64(padding).unwrap_or(0) as i64
        };

        PaddedBytes { bytes, padding }
    }
}

/// `a ∥ b`. The real bytes of `a` move right by `b.start` so they end where the
/// real bytes of `b` begin. The result padding is `a.padding + b.padding + 1`.
pub fn concat<F: Field>(
    cs: &mut Composer<F>,
    a: &PaddedSliceVar,
    b: &PaddedSliceVar,
) -> PaddedSliceVar {
    let capacity = a.capacity() + b.capacity();

    let mut extended = a.bytes.clone();
    extended.resize(capacity, Composer::<F>::null());
    let shifted = slice_shift_right(cs, &extended, b.start, b.capacity());

    let bytes = shifted
        .iter()
        .enumerate()
        .map(|(k, var)| {
            if k < a.capacity() {
                *var
            } else {
                cs.add(*var, b.bytes[k - a.capacity()])
            }
        })
        .collect();
    let padding = cs.linear_combination(&[(a.padding, F::one()), (b.padding, F::one())], F::one());

    PaddedSliceVar::from_vars(cs, bytes, padding)
}
