use super::{Composer, Variable};
use crate::{field_to_bits_le, Field};
use ark_std::{vec, vec::Vec};

impl<F: Field> Composer<F> {
    /// here we enforce range constraint by quads (2-bit unit), so `num_bits` must be even.
    /// The quads are orgnized in the big-endian order: each accumulator is four times the
    /// previous one plus a quad, and the last accumulator is `var` itself.
    /// returns the row holding `var`
    pub fn enforce_range(&mut self, var: Variable, num_bits: usize) -> usize {
        if !self.switches.enable_range {
            self.switches.enable_range = true;
        }
        assert!(self.program_width >= 4);
        assert_eq!((num_bits >> 1) << 1, num_bits);
        assert!(num_bits > 0);

        // out-of-range values keep only their low bits, so the final step fails
        let bits = field_to_bits_le(self.assignments[var.0], num_bits);
        let num_quads = num_bits >> 1;

        let mut accumulators = Vec::with_capacity(num_quads + self.program_width);
        if num_quads % self.program_width != 0 {
            for _ in 0..self.program_width - num_quads % self.program_width {
                accumulators.push(Self::null());
            }
        }
        accumulators.push(Self::null());

        let mut acc = F::zero();
        for i in (1..num_quads).rev() {
            // acc = 4 * acc + quad
            let quad = u64::from(bits[2 * i]) + 2 * u64::from(bits[2 * i + 1]);
            acc += acc;
            acc += acc;
            acc += F::from(quad);
            accumulators.push(self.alloc(acc));
        }

        let mut values = self.get_assignments(&accumulators);
        values.push(self.assignments[var.0]);
        let quads: Vec<_> = (0..4u64).map(F::from).collect();
        let step_holds = |k: usize| {
            let delta = values[k + 1] - values[k] - values[k] - values[k] - values[k];
            quads.contains(&delta)
        };

        let mut k = 0;
        while accumulators.len() >= self.program_width {
            let row: Vec<_> = accumulators.drain(0..self.program_width).collect();
            let index = self.insert_gate(row, &[("q_range", F::one())]);
            let holds = (k..k + self.program_width).all(|j| step_holds(j));
            self.check_gate(index, holds, "range");
            k += self.program_width;
        }
        self.insert_gate(vec![var], &[])
    }

    /// split `var` into `num_bytes` little-endian bytes, each range checked, and
    /// enforce that they recompose to `var`
    pub fn decompose_bytes(&mut self, var: Variable, num_bytes: usize) -> Vec<Variable> {
        let bits = field_to_bits_le(self.assignments[var.0], 8 * num_bytes);
        let mut terms = Vec::with_capacity(num_bytes + 1);
        let mut bytes = Vec::with_capacity(num_bytes);
        let mut coeff = F::one();
        for i in 0..num_bytes {
            let value = (0..8).fold(0u64, |acc, j| acc | (u64::from(bits[8 * i + j]) << j));
            let byte = self.alloc(F::from(value));
            self.enforce_range(byte, 8);
            terms.push((byte, coeff));
            bytes.push(byte);
            coeff *= F::from(256u64);
        }
        terms.push((var, -F::one()));
        self.enforce_linear_combination(&terms, F::zero());

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_of_two;
    use ark_bn254::Fr;

    #[test]
    fn test_range() {
        for num_bits in [2usize, 8, 16, 64, 80] {
            let mut cs = Composer::<Fr>::new(4);
            let max = power_of_two::<Fr>(num_bits) - Fr::from(1u64);
            let x = cs.alloc(max);
            cs.enforce_range(x, num_bits);
            let y = cs.alloc(Fr::from(3u64));
            cs.enforce_range(y, num_bits);
            assert!(cs.is_satisfied(), "num_bits = {}", num_bits);

            let z = cs.alloc(max + Fr::from(1u64));
            cs.enforce_range(z, num_bits);
            assert!(!cs.is_satisfied(), "num_bits = {}", num_bits);
        }
    }

    #[test]
    fn test_range_negative() {
        let mut cs = Composer::<Fr>::new(4);
        let x = cs.alloc(-Fr::from(1u64));
        cs.enforce_range(x, 8);
        assert!(!cs.is_satisfied());
    }

    #[test]
    fn test_decompose_bytes() {
        let mut cs = Composer::<Fr>::new(4);
        let x = cs.alloc(Fr::from(0x0102_03f4u64));
        let bytes = cs.decompose_bytes(x, 4);
        let values: Vec<_> = cs.get_assignments(&bytes);
        assert_eq!(
            values,
            vec![
                Fr::from(0xf4u64),
                Fr::from(0x03u64),
                Fr::from(0x02u64),
                Fr::from(0x01u64)
            ]
        );
        assert!(cs.is_satisfied());

        let y = cs.alloc(Fr::from(0x1_0000u64));
        cs.decompose_bytes(y, 2);
        assert!(!cs.is_satisfied());
    }
}
