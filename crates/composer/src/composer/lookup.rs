use super::{Composer, Variable};
use crate::{Error, Field, Map};
use ark_std::{vec, vec::Vec};

#[derive(Debug, Default)]
pub struct Table<F: Field> {
    pub id: String,
    //only set in circuit. start from 1.
    pub index: usize,
    pub size: usize,
    pub width: usize,
    pub key_width: usize,

    //the table. inner vec are columns
    pub columns: Vec<Vec<F>>,
    //number of reads against this table
    pub lookups: usize,

    // key may have multiple elements. value is index in this table
    pub key_map: Map<Vec<F>, usize>,
}

impl<F: Field> Table<F> {
    /// a table from rows of `width` values, the first `key_width` of which form the key
    pub fn from_rows(id: &str, key_width: usize, rows: Vec<Vec<F>>) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(key_width);
        assert!(key_width <= width);

        let size = rows.len();
        let mut columns = vec![Vec::with_capacity(size); width];
        let mut key_map = Map::new();
        for (row, values) in rows.into_iter().enumerate() {
            assert_eq!(values.len(), width);
            key_map.insert(values[..key_width].to_vec(), row);
            for (col, v) in values.into_iter().enumerate() {
                columns[col].push(v);
            }
        }

        Self {
            id: id.to_string(),
            index: 0,
            size,
            width,
            key_width,
            columns,
            lookups: 0,
            key_map,
        }
    }

    fn get_value_by_key(&mut self, key: &[F]) -> Option<Vec<F>> {
        assert_eq!(key.len(), self.key_width);

        self.lookups += 1;
        let index = *self.key_map.get(key)?;
        // value may have multiple elements.
        Some(
            (self.key_width..self.width)
                .map(|i| self.columns[i][index])
                .collect(),
        )
    }

    fn set_table_index(&mut self, index: usize) {
        self.index = index;
    }
}

impl<F: Field> Composer<F> {
    /// add a new table into the circuit.
    /// table index starts at 1.
    /// return index of the table.
    pub fn add_table(&mut self, mut table: Table<F>) -> usize {
        if !self.switches.enable_lookup {
            self.switches.enable_lookup = true;
        }
        let result = self.get_table_index(&table.id);
        if result != 0 {
            return result;
        }

        let index = self.tables.len() + 1;
        table.set_table_index(index);

        self.tables.push(table);

        index
    }

    /// if id not exist, return 0
    pub fn get_table_index(&self, table_id: &str) -> usize {
        self.tables
            .iter()
            .find(|table| table.id == table_id)
            .map(|table| table.index)
            .unwrap_or(0)
    }

    pub fn get_table(&self, index: usize) -> Result<&Table<F>, Error> {
        if (index == 0) || (index - 1 >= self.tables.len()) {
            return Err(Error::NoSuchTable);
        }

        Ok(&self.tables[index - 1])
    }

    fn get_table_mut(&mut self, index: usize) -> Result<&mut Table<F>, Error> {
        if (index == 0) || (index - 1 >= self.tables.len()) {
            return Err(Error::NoSuchTable);
        }

        Ok(&mut self.tables[index - 1])
    }

    /// like "map", use key to "lookup" the value.
    /// will add a line as lookup.
    /// return the value vars. a key missing from the table leaves the gate
    /// unsatisfied and the values zero
    pub fn read_from_table(
        &mut self,
        table_index: usize,
        key: Vec<Variable>,
    ) -> Result<Vec<Variable>, Error> {
        let lookup_key = self.get_assignments(&key);
        let table = self.get_table_mut(table_index)?;
        let value_width = table.width - table.key_width;
        let (lookup_value, found) = match table.get_value_by_key(&lookup_key) {
            Some(values) => (values, true),
            None => (vec![F::zero(); value_width], false),
        };
        //alloc variable for lookup result
        let value: Vec<_> = lookup_value.into_iter().map(|v| self.alloc(v)).collect();

        let wires = key.into_iter().chain(value.clone()).collect();
        // extra column, distinguish different tables. start from 1.
        let index = self.insert_gate(
            wires,
            &[
                ("q_lookup", F::one()),
                ("q_table", F::from(table_index as u64)),
            ],
        );
        self.check_gate(index, found, "lookup");

        Ok(value)
    }
}
