use crate::{BoostError, FitResult};
use core::ops::Index;

/// Slice of data with a stride, used to look at one row of a column-major matrix.
#[derive(Debug, Clone, Copy)]
pub struct StridedVecView<'a, A: 'a> {
    pub data: &'a [A],
    pub start: usize,
    pub stride: usize,
    len: usize,
}

impl<'a, A: 'a> StridedVecView<'a, A> {
    pub fn new(data: &'a [A], start: usize, stride: usize, len: usize) -> Self {
        Self {
            data,
            start,
            stride,
            len,
        }
    }

    pub fn from_slice(data: &'a [A]) -> Self {
        Self {
            data,
            start: 0,
            stride: 1,
            len: data.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a A> {
        let (data, start, stride) = (self.data, self.start, self.stride);
        (0..self.len).map(move |pos| &data[start + pos * stride])
    }
}

impl<'a, A: 'a + Clone> StridedVecView<'a, A> {
    pub fn to_vec(&self) -> Vec<A> {
        self.iter().cloned().collect()
    }
}

impl<'a, A: 'a> Index<usize> for StridedVecView<'a, A> {
    type Output = A;
    fn index(&self, pos: usize) -> &A {
        &self.data[self.start + pos * self.stride]
    }
}

/// Store a dense matrix in a column-major way.
///
/// The split search of the trees scans one feature at a time, so the values of a column are
/// contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMajorMatrix<A> {
    /// Number of rows in the matrix
    n_rows: usize,
    /// Number of columns in the matrix
    n_cols: usize,
    /// Values, column after column
    values: Vec<A>,
}

impl<A> ColumnMajorMatrix<A> {
    /// # Panics
    /// If the columns don't all have the same length.
    pub fn from_columns(columns: Vec<Vec<A>>) -> Self {
        let (n_cols, n_rows) = (columns.len(), columns.first().map_or(0, |col| col.len()));
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for column in columns {
            assert_eq!(column.len(), n_rows, "all the columns must have the same length");
            values.extend(column);
        }
        Self {
            n_rows,
            n_cols,
            values,
        }
    }

    /// # Panics
    /// If the rows don't all have the same length. Use [`ColumnMajorMatrix::try_from_rows`]
    /// for input that is not trusted.
    pub fn from_rows(rows: Vec<Vec<A>>) -> Self {
        match Self::try_from_rows(rows) {
            Ok(matrix) => matrix,
            Err(err) => panic!("{}", err),
        }
    }

    /// Build the matrix from rows, failing on ragged input. Zero rows give an empty matrix.
    pub fn try_from_rows(rows: Vec<Vec<A>>) -> FitResult<Self> {
        let (n_rows, n_cols) = (rows.len(), rows.first().map_or(0, |row| row.len()));
        if let Some(row) = rows.iter().find(|row| row.len() != n_cols) {
            return Err(BoostError::shape("row length", n_cols, row.len()));
        }
        let mut values: Vec<A> = Vec::with_capacity(n_rows * n_cols);
        let mut rows: Vec<_> = rows.into_iter().map(|c| c.into_iter()).collect();
        for _ in 0..n_cols {
            for row in &mut rows {
                if let Some(item) = row.next() {
                    values.push(item)
                }
            }
        }
        debug_assert_eq!(n_rows * n_cols, values.len());
        Ok(Self {
            n_rows,
            n_cols,
            values,
        })
    }

    pub fn from_function(n_rows: usize, n_cols: usize, f: impl Fn(usize, usize) -> A) -> Self {
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for col in 0..n_cols {
            for row in 0..n_rows {
                values.push(f(row, col));
            }
        }
        Self {
            n_rows,
            n_cols,
            values,
        }
    }

    pub fn column(&self, col: usize) -> &[A] {
        let start = col * self.n_rows;
        &self.values[start..start + self.n_rows]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut [A] {
        let start = col * self.n_rows;
        &mut self.values[start..start + self.n_rows]
    }

    pub fn columns(&self) -> impl Iterator<Item = &[A]> {
        // chunks(0) panics, and an empty matrix has no values anyway
        self.values.chunks(self.n_rows.max(1))
    }

    pub fn row(&self, row: usize) -> StridedVecView<'_, A> {
        assert!(row < self.n_rows, "row {} out of {}", row, self.n_rows);
        StridedVecView::new(&self.values, row, self.n_rows, self.n_cols)
    }

    pub fn rows(&self) -> impl Iterator<Item = StridedVecView<'_, A>> {
        (0..self.n_rows).map(move |row| self.row(row))
    }

    pub fn flat(&self) -> &[A] {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }
}

impl<A: Clone> ColumnMajorMatrix<A> {
    /// Copy a subset of the rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self::from_function(rows.len(), self.n_cols, |row, col| {
            self[(rows[row], col)].clone()
        })
    }
}

impl<A> Index<(usize, usize)> for ColumnMajorMatrix<A> {
    type Output = A;
    fn index(&self, (row, col): (usize, usize)) -> &A {
        // No need to check for col because it will be out of the buffer
        assert!(row < self.n_rows);
        &self.values[row + col * self.n_rows]
    }
}
