use ark_std::{cfg_iter, format, vec, vec::Vec};
use sha2::{Digest, Sha256};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{Error, Field, Map};

mod arithmetic;
mod boolean;
mod lookup;
mod range;
pub use lookup::Table;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Ord, PartialOrd, Default)]
pub struct Variable(usize);

impl Variable {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct ComposerConfig {
    pub enable_range: bool,
    pub enable_lookup: bool,
    pub enable_boolean: bool,
    /// keep the selector and wire columns in memory. only the digest is kept otherwise
    pub record_rows: bool,
}

/// a gate whose identity does not hold under the current assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedGate {
    pub row: usize,
    pub gate: String,
}

// failing gates kept with details. the rest are only counted
const MAX_RECORDED_FAILURES: usize = 64;

pub struct Composer<F: Field> {
    // number of witness columns of the circuit
    pub program_width: usize,
    // rows of the circuit
    size: usize,

    // witness columns, only filled with `record_rows`
    wires: Map<String, Vec<Variable>>,
    selectors: Map<String, Vec<F>>,
    public_input: Vec<Variable>,

    // value in the Variable
    assignments: Vec<F>,

    // tables for lookup
    tables: Vec<Table<F>>,

    pub switches: ComposerConfig,

    unsatisfied: Vec<UnsatisfiedGate>,
    unsatisfied_count: usize,
    shape: Sha256,
}

/// basics
impl<F: Field> Composer<F> {
    /// new circuit of "program_width" column witness
    pub fn new(program_width: usize) -> Composer<F> {
        Self::new_with_config(program_width, ComposerConfig::default())
    }

    pub fn new_with_config(program_width: usize, switches: ComposerConfig) -> Composer<F> {
        assert!((3..=Self::WIRE_SELECTOR_LABELS.len()).contains(&program_width));

        let mut cs = Composer {
            program_width,
            size: 0,
            wires: Map::new(),
            selectors: Map::new(),
            public_input: Vec::new(),
            assignments: Vec::new(),
            tables: Vec::new(),
            switches,
            unsatisfied: Vec::new(),
            unsatisfied_count: 0,
            shape: Sha256::new(),
        };
        cs.shape.update((program_width as u64).to_le_bytes());

        let null = cs.alloc(F::zero());
        cs.enforce_constant(null, F::zero());
        let one = cs.alloc(F::one());
        cs.enforce_constant(one, F::one());

        cs
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// public_input size
    #[inline]
    pub fn input_size(&self) -> usize {
        self.public_input.len()
    }

    /// number of allocated variables
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.assignments.len()
    }

    /// alloc a variable
    pub fn alloc(&mut self, value: F) -> Variable {
        self.alloc_variable(value)
    }

    ///alloc a public input variable
    pub fn alloc_input(&mut self, value: F) -> Variable {
        let var = self.alloc_variable(value);
        self.set_variable_public_input(var);

        var
    }

    /// set a variable public input
    pub fn set_variable_public_input(&mut self, var: Variable) {
        self.shape.update(b"pi");
        self.shape.update((var.0 as u64).to_le_bytes());
        self.public_input.push(var);
    }

    /// const 0
    pub fn null() -> Variable {
        Variable(0)
    }

    /// const 1
    pub fn one() -> Variable {
        Variable(1)
    }

    #[inline]
    fn alloc_variable(&mut self, value: F) -> Variable {
        let var = Variable(self.assignments.len());
        self.assignments.push(value);

        var
    }

    /// add a row with the given non-zero selectors. returns the row index
    fn insert_gate(
        &mut self,
        mut gate_wires: Vec<Variable>,
        gate_selectors: &[(&'static str, F)],
    ) -> usize {
        assert!(gate_wires.len() <= self.program_width);
        while gate_wires.len() < self.program_width {
            gate_wires.push(Self::null());
        }

        let index = self.size;
        self.hash_row(&gate_wires, gate_selectors);

        if self.switches.record_rows {
            for (j, var) in gate_wires.iter().enumerate() {
                self.wires
                    .entry(format!("w_{}", j))
                    .or_insert_with(Vec::new)
                    .push(*var);
            }
            for (_, values) in self.selectors.iter_mut() {
                values.push(F::zero());
            }
            for (label, value) in gate_selectors {
                let column = self
                    .selectors
                    .entry(label.to_string())
                    .or_insert_with(|| vec![F::zero(); index + 1]);
                column[index] = *value;
            }
        }

        self.size += 1;

        index
    }

    fn hash_row(&mut self, wires: &[Variable], selectors: &[(&'static str, F)]) {
        let mut row = Vec::with_capacity(8 * wires.len() + 48 * selectors.len());
        for var in wires {
            row.extend_from_slice(&(var.0 as u64).to_le_bytes());
        }
        for (label, value) in selectors {
            row.extend_from_slice(label.as_bytes());
            for limb in value.into_repr().as_ref() {
                row.extend_from_slice(&limb.to_le_bytes());
            }
        }
        self.shape.update(&row);
    }

    /// note the outcome of evaluating the gate at `row`
    fn check_gate(&mut self, row: usize, holds: bool, gate: &str) {
        if holds {
            return;
        }

        self.unsatisfied_count += 1;
        if self.unsatisfied.len() < MAX_RECORDED_FAILURES {
            log::debug!("gate {} at row {} is not satisfied", gate, row);
            self.unsatisfied.push(UnsatisfiedGate {
                row,
                gate: gate.to_string(),
            });
        }
    }

    /// get values of vars
    pub fn get_assignments(&self, vars: &[Variable]) -> Vec<F> {
        cfg_iter!(vars).map(|&v| self.assignments[v.0]).collect()
    }

    /// get value of var
    pub fn get_assignment(&self, var: Variable) -> F {
        self.assignments[var.0]
    }
}

/// satisfiability and shape
impl<F: Field> Composer<F> {
    /// whether every gate inserted so far holds
    pub fn is_satisfied(&self) -> bool {
        self.unsatisfied_count == 0
    }

    /// the first failing gates, in row order
    pub fn unsatisfied_gates(&self) -> &[UnsatisfiedGate] {
        &self.unsatisfied
    }

    pub fn check_satisfied(&self) -> Result<(), Error> {
        match self.unsatisfied.first() {
            None => Ok(()),
            Some(gate) => Err(Error::Unsatisfied {
                row: gate.row,
                gate: gate.gate.clone(),
                total: self.unsatisfied_count,
            }),
        }
    }

    /// digest over every row's wires and selectors, the public input positions and
    /// the registered tables. witness values do not enter it
    pub fn shape_digest(&self) -> [u8; 32] {
        let mut hasher = self.shape.clone();
        for table in &self.tables {
            hasher.update(table.id.as_bytes());
            hasher.update((table.size as u64).to_le_bytes());
        }

        hasher.finalize().into()
    }

    pub fn compute_public_input(&self) -> Vec<F> {
        cfg_iter!(self.public_input)
            .map(|v| self.assignments[v.0])
            .collect()
    }

    /// values of every wire column, row by row. empty unless `record_rows` is set
    pub fn compute_wire_values(&self) -> Map<String, Vec<F>> {
        let mut wires = Map::new();

        let assign = |v: &Variable| self.assignments[v.0];
        for (l, w) in self.wires.iter() {
            wires.insert(l.to_string(), w.iter().map(assign).collect());
        }

        wires
    }

    /// selector columns. empty unless `record_rows` is set
    pub fn selector_columns(&self) -> &Map<String, Vec<F>> {
        &self.selectors
    }

    pub fn tables(&self) -> &[Table<F>] {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_ff::{One, Zero};

    fn composer_basic(cs: &mut Composer<Fr>) {
        // x^3 + x + pi = 35
        let pi = cs.alloc_input(Fr::from(5_u64));
        let x = cs.alloc(Fr::from(3u64));
        let y = cs.mul(x, x);
        let z = cs.mul(x, y);
        let u = cs.add(x, z);
        let v = cs.add(pi, u);
        cs.enforce_constant(v, Fr::from(35u64));
    }

    fn composer_arithmetic(cs: &mut Composer<Fr>) {
        let x = cs.alloc(Fr::from(7u64));
        let y = cs.alloc(Fr::from(5u64));
        let z = cs.add(x, y);
        cs.enforce_constant(z, Fr::from(12u64));

        let u = cs.mul(x, y);
        cs.enforce_constant(u, Fr::from(35u64));

        let v = cs.sub(u, z);
        cs.enforce_constant(v, Fr::from(23u64));

        let one = cs.alloc(Fr::one());
        let zero = cs.alloc(Fr::zero());
        // 1*5*3 +2*1 -5 + 7 -19 = 0
        cs.poly_gate(
            vec![(one, Fr::from(2u64)), (y, -Fr::one()), (x, Fr::one())],
            Fr::from(3u64),
            -Fr::from(19u64),
        );

        cs.enforce_bool(one);
        cs.enforce_bool(zero);

        cs.enforce_eq(zero, Composer::<Fr>::null());
        cs.enforce_eq(one, Composer::<Fr>::one());
    }

    #[test]
    fn test_composer_basic() {
        let mut cs = Composer::new(4);
        composer_basic(&mut cs);
        assert!(cs.is_satisfied());
        assert_eq!(cs.compute_public_input(), vec![Fr::from(5u64)]);

        let mut cs = Composer::new(4);
        composer_arithmetic(&mut cs);
        assert!(cs.check_satisfied().is_ok());
    }

    #[test]
    fn test_unsatisfied_is_recorded() {
        let mut cs = Composer::<Fr>::new(4);
        let x = cs.alloc(Fr::from(2u64));
        let before = cs.size();
        cs.enforce_bool(x);
        assert!(!cs.is_satisfied());

        let gates = cs.unsatisfied_gates();
        assert_eq!(gates.len(), 1);
        assert_eq!(gates[0].row, before);
        assert_eq!(gates[0].gate, "arithmetic");
        match cs.check_satisfied() {
            Err(Error::Unsatisfied { row, total, .. }) => {
                assert_eq!(row, before);
                assert_eq!(total, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shape_ignores_witness() {
        let build = |value: u64| {
            let mut cs = Composer::<Fr>::new(4);
            let x = cs.alloc(Fr::from(value));
            let y = cs.mul(x, x);
            let z = cs.add(y, x);
            cs.enforce_constant(z, Fr::from(12u64));
            cs
        };

        let good = build(3);
        let bad = build(4);
        assert!(good.is_satisfied());
        assert!(!bad.is_satisfied());
        assert_eq!(good.shape_digest(), bad.shape_digest());

        let mut other = build(3);
        let x = other.alloc(Fr::one());
        other.enforce_bool(x);
        assert_ne!(good.shape_digest(), other.shape_digest());
    }

    #[test]
    fn test_record_rows() {
        let config = ComposerConfig {
            record_rows: true,
            ..Default::default()
        };
        let mut cs = Composer::<Fr>::new_with_config(4, config);
        composer_basic(&mut cs);

        let wires = cs.compute_wire_values();
        assert_eq!(wires.len(), 4);
        for column in wires.values() {
            assert_eq!(column.len(), cs.size());
        }
        for column in cs.selector_columns().values() {
            assert_eq!(column.len(), cs.size());
        }
        // the two constant rows allocated by `new`
        assert_eq!(wires["w_0"][0], Fr::zero());
        assert_eq!(wires["w_0"][1], Fr::one());
    }
}
