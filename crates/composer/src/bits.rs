//! Bit decompositions and byte variables.
use crate::{field_to_bits_le, field_to_u64, Composer, Field, Variable};

/// split `var` into `num_bits` boolean variables, little-endian, and enforce the recomposition
pub fn num_to_bits<F: Field>(cs: &mut Composer<F>, var: Variable, num_bits: usize) -> Vec<Variable> {
    let bits = field_to_bits_le(cs.get_assignment(var), num_bits);

    let mut terms = Vec::with_capacity(num_bits + 1);
    let mut out = Vec::with_capacity(num_bits);
    let mut coeff = F::one();
    for bit in bits {
        let bit_var = cs.alloc(if bit { F::one() } else { F::zero() });
        cs.enforce_bool(bit_var);
        terms.push((bit_var, coeff));
        out.push(bit_var);
        coeff.double_in_place();
    }
    terms.push((var, -F::one()));
    cs.enforce_linear_combination(&terms, F::zero());

    out
}

/// sum(bits[i] * 2^i)
pub fn bits_to_num<F: Field>(cs: &mut Composer<F>, bits: &[Variable]) -> Variable {
    let mut coeff = F::one();
    let terms: Vec<_> = bits
        .iter()
        .map(|bit| {
            let term = (*bit, coeff);
            coeff.double_in_place();
            term
        })
        .collect();

    cs.linear_combination(&terms, F::zero())
}

/// a byte together with its bits, little-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteVar {
    pub var: Variable,
    pub bits: [Variable; 8],
}

impl ByteVar {
    /// the constant 0 without any gate
    pub fn zero<F: Field>() -> Self {
        Self {
            var: Composer::<F>::null(),
            bits: [Composer::<F>::null(); 8],
        }
    }

    /// a constant byte. the bits are the constant wires
    pub fn constant<F: Field>(cs: &mut Composer<F>, value: u8) -> Self {
        if value == 0 {
            return Self::zero::<F>();
        }
        let var = cs.alloc(F::from(value as u64));
        cs.enforce_constant(var, F::from(value as u64));

        let mut bits = [Composer::<F>::null(); 8];
        for (i, bit) in bits.iter_mut().enumerate() {
            if (value >> i) & 1 == 1 {
                *bit = Composer::<F>::one();
            }
        }

        Self { var, bits }
    }

    /// decompose an existing variable. constrains it to a byte
    pub fn new<F: Field>(cs: &mut Composer<F>, var: Variable) -> Self {
        let decomposed = num_to_bits(cs, var, 8);
        let mut bits = [Composer::<F>::null(); 8];
        bits.copy_from_slice(&decomposed);

        Self { var, bits }
    }

    pub fn alloc<F: Field>(cs: &mut Composer<F>, value: u8) -> Self {
        let var = cs.alloc(F::from(value as u64));
        Self::new(cs, var)
    }

    /// the byte of the assignment. garbage for unsatisfiable witnesses
    pub fn value<F: Field>(&self, cs: &Composer<F>) -> u8 {
        field_to_u64(cs.get_assignment(self.var)).unwrap_or(0) as u8
    }
}

pub fn bytes_values<F: Field>(cs: &Composer<F>, bytes: &[ByteVar]) -> Vec<u8> {
    bytes.iter().map(|b| b.value(cs)).collect()
}
