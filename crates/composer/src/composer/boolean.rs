use super::{Composer, Variable};
use crate::Field;
use ark_std::vec;

/// one-row gates over three boolean inputs, used by the sha256 rounds.
/// the output is `w_3`, the inputs `w_0, w_1, w_2`. inputs must already be boolean.
impl<F: Field> Composer<F> {
    /// a ^ b ^ c = a + b + c - 2(ab + ac + bc) + 4abc
    pub fn xor3(&mut self, a: Variable, b: Variable, c: Variable) -> Variable {
        self.boolean_gate("q_xor3", a, b, c, |x, y, z| {
            x + y + z - F::from(2u64) * (x * y + x * z + y * z) + F::from(4u64) * x * y * z
        })
    }

    /// a ^ b
    pub fn xor(&mut self, a: Variable, b: Variable) -> Variable {
        self.xor3(a, b, Self::null())
    }

    /// (e & f) ^ (!e & g) = ef + g - eg
    pub fn ch(&mut self, e: Variable, f: Variable, g: Variable) -> Variable {
        self.boolean_gate("q_ch", e, f, g, |x, y, z| x * y + z - x * z)
    }

    /// (a & b) ^ (a & c) ^ (b & c) = ab + ac + bc - 2abc
    pub fn maj(&mut self, a: Variable, b: Variable, c: Variable) -> Variable {
        self.boolean_gate("q_maj", a, b, c, |x, y, z| {
            x * y + x * z + y * z - F::from(2u64) * x * y * z
        })
    }

    fn boolean_gate(
        &mut self,
        label: &'static str,
        a: Variable,
        b: Variable,
        c: Variable,
        f: impl Fn(F, F, F) -> F,
    ) -> Variable {
        if !self.switches.enable_boolean {
            self.switches.enable_boolean = true;
        }

        let (x, y, z) = (
            self.assignments[a.0],
            self.assignments[b.0],
            self.assignments[c.0],
        );
        let value = f(x, y, z);
        let out = self.alloc_variable(value);

        let index = self.insert_gate(vec![a, b, c, out], &[(label, F::one())]);
        let holds = f(x, y, z) == self.assignments[out.0];
        self.check_gate(index, holds, label);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_ff::{One, Zero};

    #[test]
    fn test_boolean_gates_truth_table() {
        let mut cs = Composer::<Fr>::new(4);
        let bit = |b: bool| {
            if b {
                Composer::<Fr>::one()
            } else {
                Composer::<Fr>::null()
            }
        };

        for i in 0..8u8 {
            let (a, b, c) = (i & 1 == 1, i & 2 == 2, i & 4 == 4);
            let xor = cs.xor3(bit(a), bit(b), bit(c));
            let ch = cs.ch(bit(a), bit(b), bit(c));
            let maj = cs.maj(bit(a), bit(b), bit(c));

            let to_field = |v: bool| if v { Fr::one() } else { Fr::zero() };
            assert_eq!(cs.get_assignment(xor), to_field(a ^ b ^ c));
            assert_eq!(cs.get_assignment(ch), to_field((a & b) ^ (!a & c)));
            assert_eq!(cs.get_assignment(maj), to_field((a & b) ^ (a & c) ^ (b & c)));
        }
        assert!(cs.is_satisfied());
    }
}
