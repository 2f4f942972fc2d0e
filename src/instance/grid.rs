//! Flat dense arenas for instance data.

use std::ops::{Index, IndexMut};

/// A dense two-dimensional array stored row-major in a single `Vec`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid2<T> {
    dims: [usize; 2],
    data: Vec<T>,
}

impl<T: Clone> Grid2<T> {
    /// Creates a grid filled with `value`.
    pub fn filled(d0: usize, d1: usize, value: T) -> Self {
        Self {
            dims: [d0, d1],
            data: vec![value; d0 * d1],
        }
    }
}

impl<T> Grid2<T> {
    /// Creates a grid by evaluating `f(i, j)` for every cell in row-major order.
    pub fn from_fn(d0: usize, d1: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(d0 * d1);
        for i in 0..d0 {
            for j in 0..d1 {
                data.push(f(i, j));
            }
        }
        Self { dims: [d0, d1], data }
    }

    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the cell at `(i, j)`, or `None` when out of bounds.
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i < self.dims[0] && j < self.dims[1] {
            self.data.get(i * self.dims[1] + j)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut T> {
        if i < self.dims[0] && j < self.dims[1] {
            self.data.get_mut(i * self.dims[1] + j)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterates `((i, j), value)` in row-major order.
    pub fn indexed(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let d1 = self.dims[1].max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(n, v)| ((n / d1, n % d1), v))
    }
}

impl<T> Index<(usize, usize)> for Grid2<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.dims[0] && j < self.dims[1]);
        &self.data[i * self.dims[1] + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid2<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(i < self.dims[0] && j < self.dims[1]);
        &mut self.data[i * self.dims[1] + j]
    }
}

/// A dense three-dimensional array stored row-major in a single `Vec`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid3<T> {
    dims: [usize; 3],
    data: Vec<T>,
}

impl<T: Clone> Grid3<T> {
    /// Creates a grid filled with `value`.
    pub fn filled(d0: usize, d1: usize, d2: usize, value: T) -> Self {
        Self {
            dims: [d0, d1, d2],
            data: vec![value; d0 * d1 * d2],
        }
    }
}

impl<T> Grid3<T> {
    /// Creates a grid by evaluating `f(i, j, k)` for every cell in row-major order.
    pub fn from_fn(
        d0: usize,
        d1: usize,
        d2: usize,
        mut f: impl FnMut(usize, usize, usize) -> T,
    ) -> Self {
        let mut data = Vec::with_capacity(d0 * d1 * d2);
        for i in 0..d0 {
            for j in 0..d1 {
                for k in 0..d2 {
                    data.push(f(i, j, k));
                }
            }
        }
        Self {
            dims: [d0, d1, d2],
            data,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.dims[1] + j) * self.dims[2] + k
    }

    /// Returns the cell at `(i, j, k)`, or `None` when out of bounds.
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<&T> {
        if i < self.dims[0] && j < self.dims[1] && k < self.dims[2] {
            self.data.get(self.offset(i, j, k))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, i: usize, j: usize, k: usize) -> Option<&mut T> {
        if i < self.dims[0] && j < self.dims[1] && k < self.dims[2] {
            let offset = self.offset(i, j, k);
            self.data.get_mut(offset)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterates `((i, j, k), value)` in row-major order.
    pub fn indexed(&self) -> impl Iterator<Item = ((usize, usize, usize), &T)> {
        let d1 = self.dims[1].max(1);
        let d2 = self.dims[2].max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(n, v)| ((n / (d1 * d2), (n / d2) % d1, n % d2), v))
    }
}

impl<T> Index<(usize, usize, usize)> for Grid3<T> {
    type Output = T;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &T {
        debug_assert!(i < self.dims[0] && j < self.dims[1] && k < self.dims[2]);
        &self.data[self.offset(i, j, k)]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Grid3<T> {
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut T {
        debug_assert!(i < self.dims[0] && j < self.dims[1] && k < self.dims[2]);
        let offset = self.offset(i, j, k);
        &mut self.data[offset]
    }
}
