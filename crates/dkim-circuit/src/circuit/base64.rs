use composer::{bits::ByteVar, Composer, ComposerResult, Field, Table, Variable};

pub const BASE64_ENCODE_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

pub const BASE64_TABLE_ID: &str = "base64chars";

/// length of the base64 text of a sha256 digest
pub const BODY_HASH_BASE64_LEN: usize = 44;

/// encoded length including `=` padding
pub fn get_encoded_len(input_len: usize) -> usize {
    (input_len + 2) / 3 * 4
}

/// 6-bit value -> alphabet character
pub fn new_base64_chars_table<F: Field>() -> Table<F> {
    let rows = BASE64_ENCODE_CHARS
        .iter()
        .enumerate()
        .map(|(key, c)| vec![F::from(key as u64), F::from(*c as u64)])
        .collect();

    Table::from_rows(BASE64_TABLE_ID, 1, rows)
}

// bits of the input, most significant first, in groups of 6 mapped through the
// alphabet table. the input bit length must leave `residue` bits mod 6
fn encode_groups<F: Field>(
    cs: &mut Composer<F>,
    input: &[ByteVar],
    residue: usize,
) -> ComposerResult<Vec<Variable>> {
    let residue_var = cs.alloc(F::from((input.len() * 8 % 6) as u64));
    cs.enforce_constant(residue_var, F::from(residue as u64));

    let table_index = cs.add_table(new_base64_chars_table());

    let mut bits: Vec<Variable> = input
        .iter()
        .flat_map(|byte| byte.bits.iter().rev().copied())
        .collect();
    // zero-extend to whole groups
    while bits.len() % 6 != 0 {
        bits.push(Composer::<F>::null());
    }

    let mut output = Vec::with_capacity(bits.len() / 6);
    for group in bits.chunks(6) {
        let terms: Vec<_> = group
            .iter()
            .enumerate()
            .map(|(i, bit)| (*bit, F::from(1u64 << (5 - i))))
            .collect();
        let index = cs.linear_combination(&terms, F::zero());
        let value = cs.read_from_table(table_index, vec![index])?;
        output.push(value[0]);
    }

    Ok(output)
}

fn push_pad_chars<F: Field>(cs: &mut Composer<F>, output: &mut Vec<Variable>, count: usize) {
    for _ in 0..count {
        let pad = cs.alloc(F::from(b'=' as u64));
        cs.enforce_constant(pad, F::from(b'=' as u64));
        output.push(pad);
    }
}

/// input bit length divisible by 6, no `=`
pub fn encode_exact_multiple<F: Field>(
    cs: &mut Composer<F>,
    input: &[ByteVar],
) -> ComposerResult<Vec<Variable>> {
    encode_groups(cs, input, 0)
}

/// input bit length leaving 4 bits mod 6, zero-extended by 2 bits, one `=`
pub fn encode_with_one_pad_char<F: Field>(
    cs: &mut Composer<F>,
    input: &[ByteVar],
) -> ComposerResult<Vec<Variable>> {
    let mut output = encode_groups(cs, input, 4)?;
    push_pad_chars(cs, &mut output, 1);
    Ok(output)
}

/// input bit length leaving 2 bits mod 6, zero-extended by 4 bits, two `=`
pub fn encode_with_two_pad_chars<F: Field>(
    cs: &mut Composer<F>,
    input: &[ByteVar],
) -> ComposerResult<Vec<Variable>> {
    let mut output = encode_groups(cs, input, 2)?;
    push_pad_chars(cs, &mut output, 2);
    Ok(output)
}

/// standard base64 of an input whose length is fixed by the circuit
pub fn base64_encode_gadget<F: Field>(
    cs: &mut Composer<F>,
    input: &[ByteVar],
) -> ComposerResult<Vec<Variable>> {
    match input.len() % 3 {
        0 => encode_exact_multiple(cs, input),
        2 => encode_with_one_pad_char(cs, input),
        _ => encode_with_two_pad_chars(cs, input),
    }
}
