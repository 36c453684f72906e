//! One-hot selectors and multiplexers over them.
use crate::{field_to_u64, Composer, Field, Variable};

/// one-hot vector of length `n` with a 1 at position `num`.
/// if `num` is not in `[0, n)` every selector is 0 and the sum gate fails.
pub fn num_to_selectors<F: Field>(cs: &mut Composer<F>, num: Variable, n: usize) -> Vec<Variable> {
    let position = field_to_u64(cs.get_assignment(num))
        .map(|v| v as usize)
        .filter(|v| *v < n);
    if position.is_none() {
        log::debug!("selector index out of [0, {})", n);
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let out_i = if Some(i) == position {
            //the selector eq to 1
            cs.alloc(F::one())
        } else {
            cs.alloc(F::zero())
        };

        cs.enforce_bool(out_i);
        out.push(out_i);

        //(num - CONSTi) * out == 0
        cs.poly_gate(
            vec![(num, F::zero()), (out_i, -F::from(i as u128))],
            F::one(),
            F::zero(),
        );
    }

    //all out sum === 1
    let terms: Vec<_> = out.iter().map(|s| (*s, F::one())).collect();
    cs.enforce_linear_combination(&terms, -F::one());

    out
}

///choose 1 from n, with n selectors(MUST and only one is 1)
pub fn mux1_from_selectors<F: Field>(
    cs: &mut Composer<F>,
    var_n: &[Variable],
    selectors: &[Variable],
) -> Variable {
    assert_eq!(var_n.len(), selectors.len());

    let mut tmp = Composer::<F>::null();
    let mut tmp_out = Composer::<F>::null();

    for i in 0..selectors.len() {
        if var_n[i] == Composer::<F>::null() {
            continue;
        }
        let tmp_out_value: F =
            cs.get_assignment(selectors[i]) * cs.get_assignment(var_n[i]) + cs.get_assignment(tmp);
        tmp_out = cs.alloc(tmp_out_value);

        // var[i] * selectors[i] + tmp = tmp_out
        cs.poly_gate(
            vec![
                (selectors[i], F::zero()),
                (var_n[i], F::zero()),
                (tmp, F::one()),
                (tmp_out, -F::one()),
            ],
            F::one(),
            F::zero(),
        );
        tmp = tmp_out;
    }

    tmp_out
}

/// `is_after[k] = sum(selectors[t] for t > k)`, for k in `[0, n - 1)`.
/// with one-hot selectors this is 1 exactly for the positions before the hot one
pub fn selectors_suffix_sums<F: Field>(cs: &mut Composer<F>, selectors: &[Variable]) -> Vec<Variable> {
    let n = selectors.len();
    if n < 2 {
        return Vec::new();
    }

    let mut out = vec![Composer::<F>::null(); n - 1];
    out[n - 2] = selectors[n - 1];
    for k in (0..n - 2).rev() {
        out[k] = cs.add(out[k + 1], selectors[k + 1]);
    }

    out
}
