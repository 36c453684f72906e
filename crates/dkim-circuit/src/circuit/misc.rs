use composer::{bits::num_to_bits, Composer, Field, Variable};

/// number of bits needed to write `input`
pub fn bit_length(input: usize) -> usize {
    (usize::BITS - input.leading_zeros()) as usize
}

fn barrel_shift<F: Field>(
    cs: &mut Composer<F>,
    slice: &[Variable],
    shift: Variable,
    max_shift: usize,
    left: bool,
) -> Vec<Variable> {
    let n = slice.len();
    let shift_bits = num_to_bits(cs, shift, bit_length(max_shift));

    let mut current = slice.to_vec();
    for (j, bit) in shift_bits.iter().enumerate() {
        let step = 1usize << j;
        let mut next = Vec::with_capacity(n);
        for i in 0..n {
            let moved = if left {
                current.get(i + step).copied()
            } else {
                i.checked_sub(step).map(|k| current[k])
            };
            let moved = moved.unwrap_or_else(Composer::<F>::null);
            next.push(cs.select(*bit, moved, current[i]));
        }
        current = next;
    }

    current
}

/// `out[i] = slice[i + shift]`, zero past the end. `shift` must be at most `max_shift`
pub fn slice_shift_left<F: Field>(
    cs: &mut Composer<F>,
    slice: &[Variable],
    shift: Variable,
    max_shift: usize,
) -> Vec<Variable> {
    barrel_shift(cs, slice, shift, max_shift, true)
}

/// `out[i] = slice[i - shift]`, zero before `shift`. bytes shifted past the end are lost
pub fn slice_shift_right<F: Field>(
    cs: &mut Composer<F>,
    slice: &[Variable],
    shift: Variable,
    max_shift: usize,
) -> Vec<Variable> {
    barrel_shift(cs, slice, shift, max_shift, false)
}
