//! Data
//!
//! Containers used throughout the crate: a borrowed column-major [`Matrix`]
//! consumed by the learners, and an owned, named, column-oriented [`Dataset`]
//! holding the analysis table.
use crate::errors::DisparityError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Contiguous Column Major Matrix data container.
///
/// This structure holds a dense matrix of values in a single contiguous memory block.
/// It follows column-major order (Fortran-style), which allows for efficient
/// column slicing when building design matrices.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f64`).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Matrix { data, rows, cols }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[j * self.rows + i]
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Copy the rows at `index` into a new column-major buffer.
    pub fn take_rows(&self, index: &[usize]) -> Vec<T> {
        let mut out = Vec::with_capacity(index.len() * self.cols);
        for col in 0..self.cols {
            let col_data = self.get_col(col);
            out.extend(index.iter().map(|&i| col_data[i]));
        }
        out
    }
}

/// Named, column-oriented table of observations.
///
/// Every column has the same number of rows. Columns keep their insertion
/// order so that design matrices are built deterministically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
    rows: usize,
}

impl Dataset {
    /// Create an empty dataset that will hold `rows` observations.
    pub fn new(rows: usize) -> Self {
        Dataset {
            names: Vec::new(),
            columns: HashMap::new(),
            rows,
        }
    }

    /// Build a dataset from `(name, values)` pairs. The row count is taken
    /// from the first column.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self, DisparityError> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut data = Dataset::new(rows);
        for (name, values) in columns {
            data.add_column(name, values)?;
        }
        Ok(data)
    }

    /// Add a column, replacing any existing column with the same name.
    pub fn add_column<S: Into<String>>(&mut self, name: S, values: Vec<f64>) -> Result<(), DisparityError> {
        let name = name.into();
        if values.len() != self.rows {
            return Err(DisparityError::LengthMismatch(name, self.rows, values.len()));
        }
        if self.columns.insert(name.clone(), values).is_none() {
            self.names.push(name);
        }
        Ok(())
    }

    /// Number of observations.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Borrow a column by name.
    pub fn column(&self, name: &str) -> Result<&[f64], DisparityError> {
        self.columns
            .get(name)
            .map(|c| c.as_slice())
            .ok_or_else(|| DisparityError::MissingVariable(name.to_string()))
    }

    /// Build a fresh column-major design buffer over `names`.
    ///
    /// Any column listed in `forced` is replaced by the constant given for it,
    /// so counterfactual settings never touch the stored columns.
    pub fn design(&self, names: &[String], forced: &[(&str, f64)]) -> Result<Vec<f64>, DisparityError> {
        let mut out = Vec::with_capacity(names.len() * self.rows);
        for name in names {
            match forced.iter().find(|(f, _)| f == name) {
                Some((_, value)) => out.extend(std::iter::repeat(*value).take(self.rows)),
                None => out.extend_from_slice(self.column(name)?),
            }
        }
        Ok(out)
    }
}
