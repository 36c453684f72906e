use super::{Composer, Variable};
use crate::Field;
use ark_std::{vec, vec::Vec};

/// arithmetic gates
impl<F: Field> Composer<F> {
    pub(super) const WIRE_SELECTOR_LABELS: [&'static str; 5] = ["q_0", "q_1", "q_2", "q_3", "q_4"];

    /// o = l + r
    pub fn add(&mut self, var_l: Variable, var_r: Variable) -> Variable {
        let var_o = self.alloc_variable(self.assignments[var_l.0] + self.assignments[var_r.0]);
        self.add_gate(var_l, var_r, var_o);

        var_o
    }

    /// o = l + r
    pub fn add_gate(&mut self, var_l: Variable, var_r: Variable, var_o: Variable) {
        self.poly_gate(
            vec![(var_l, F::one()), (var_r, F::one()), (var_o, -F::one())],
            F::zero(),
            F::zero(),
        )
    }

    /// o = l - r
    pub fn sub(&mut self, var_l: Variable, var_r: Variable) -> Variable {
        let var_o = self.alloc_variable(self.assignments[var_l.0] - self.assignments[var_r.0]);
        self.poly_gate(
            vec![(var_l, F::one()), (var_r, -F::one()), (var_o, -F::one())],
            F::zero(),
            F::zero(),
        );

        var_o
    }

    /// o = l * r
    pub fn mul(&mut self, var_l: Variable, var_r: Variable) -> Variable {
        let var_o = self.alloc_variable(self.assignments[var_l.0] * self.assignments[var_r.0]);
        self.mul_gate(var_l, var_r, var_o);

        var_o
    }

    /// o = l * r
    pub fn mul_gate(&mut self, var_l: Variable, var_r: Variable, var_o: Variable) {
        self.poly_gate(
            vec![(var_l, F::zero()), (var_r, F::zero()), (var_o, -F::one())],
            F::one(),
            F::zero(),
        )
    }

    /// o = f + bit * (t - f). `bit` must be boolean for this to be a selection
    pub fn select(&mut self, bit: Variable, var_t: Variable, var_f: Variable) -> Variable {
        if var_t == var_f {
            return var_t;
        }
        let diff = self.sub(var_t, var_f);
        let value = self.assignments[var_f.0] + self.assignments[bit.0] * self.assignments[diff.0];
        let var_o = self.alloc_variable(value);
        self.poly_gate(
            vec![
                (bit, F::zero()),
                (diff, F::zero()),
                (var_f, F::one()),
                (var_o, -F::one()),
            ],
            F::one(),
            F::zero(),
        );

        var_o
    }

    /// var === value
    pub fn enforce_constant(&mut self, var: Variable, value: F) {
        self.poly_gate(vec![(var, F::one())], F::zero(), -value);
    }

    /// q_0 * w_0 + q_1 * w_1 + q_2 * w_2 + q_3 * w_3 + q_m * w_0 * w_1 + q_c = 0
    pub fn poly_gate(&mut self, wires: Vec<(Variable, F)>, mul_scaling: F, const_scaling: F) {
        assert!(wires.len() <= self.program_width);

        let mut value = const_scaling;
        for (var, scaling) in &wires {
            value += self.assignments[var.0] * scaling;
        }
        if !mul_scaling.is_zero() {
            let w_0 = wires.get(0).map(|(v, _)| self.assignments[v.0]);
            let w_1 = wires.get(1).map(|(v, _)| self.assignments[v.0]);
            value += mul_scaling * w_0.unwrap_or_else(F::zero) * w_1.unwrap_or_else(F::zero);
        }

        let mut selectors = Vec::with_capacity(wires.len() + 3);
        for (i, (_, scaling)) in wires.iter().enumerate() {
            if !scaling.is_zero() {
                selectors.push((Self::WIRE_SELECTOR_LABELS[i], *scaling));
            }
        }
        if !mul_scaling.is_zero() {
            selectors.push(("q_m", mul_scaling));
        }
        if !const_scaling.is_zero() {
            selectors.push(("q_c", const_scaling));
        }
        selectors.push(("q_arith", F::one()));

        let index = self.insert_gate(wires.iter().map(|(v, _)| *v).collect(), &selectors);
        self.check_gate(index, value.is_zero(), "arithmetic");
    }

    /// var === 0
    pub fn enforce_zero(&mut self, var: Variable) {
        self.enforce_constant(var, F::zero());
    }

    /// var = 0 or 1
    pub fn enforce_bool(&mut self, var: Variable) {
        self.poly_gate(
            vec![(var, -F::one()), (var, F::zero())],
            F::one(),
            F::zero(),
        );
    }

    /// var0 == var1
    pub fn enforce_eq(&mut self, var_0: Variable, var_1: Variable) {
        self.poly_gate(
            vec![(var_0, -F::one()), (var_1, F::one())],
            F::zero(),
            F::zero(),
        );
    }

    /// o = sum(coeff * var) + constant.
    /// a chain of gates folding two terms each into a running sum
    pub fn linear_combination(&mut self, terms: &[(Variable, F)], constant: F) -> Variable {
        let mut value = constant;
        for (var, coeff) in terms {
            value += self.assignments[var.0] * coeff;
        }
        let var_o = self.alloc_variable(value);

        let mut all_terms = terms.to_vec();
        all_terms.push((var_o, -F::one()));
        self.enforce_linear_combination(&all_terms, constant);

        var_o
    }

    /// sum(coeff * var) + constant = 0
    pub fn enforce_linear_combination(&mut self, terms: &[(Variable, F)], constant: F) {
        let terms: Vec<_> = terms
            .iter()
            .filter(|(v, c)| !c.is_zero() && *v != Self::null())
            .cloned()
            .collect();

        if terms.len() <= self.program_width {
            self.poly_gate(terms, F::zero(), constant);
            return;
        }

        // acc_0 = t_0 + t_1 + t_2 + constant, acc_{i+1} = acc_i + t_j + t_{j+1}, ...
        let mut acc_value = constant;
        let mut acc: Option<Variable> = None;
        let mut rest = &terms[..];
        loop {
            let capacity = self.program_width - usize::from(acc.is_some());
            if rest.len() <= capacity {
                break;
            }
            let take = capacity - 1;
            let (chunk, tail) = rest.split_at(take);
            rest = tail;

            for (var, coeff) in chunk {
                acc_value += self.assignments[var.0] * coeff;
            }
            let acc_next = self.alloc_variable(acc_value);

            let mut wires: Vec<(Variable, F)> = Vec::with_capacity(self.program_width);
            if let Some(prev) = acc {
                wires.push((prev, F::one()));
            }
            wires.extend_from_slice(chunk);
            wires.push((acc_next, -F::one()));
            let q_c = if acc.is_none() { constant } else { F::zero() };
            self.poly_gate(wires, F::zero(), q_c);

            acc = Some(acc_next);
        }

        let mut wires: Vec<(Variable, F)> = Vec::with_capacity(self.program_width);
        if let Some(prev) = acc {
            wires.push((prev, F::one()));
        }
        wires.extend_from_slice(rest);
        self.poly_gate(wires, F::zero(), F::zero());
    }
}
