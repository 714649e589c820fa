//! Dense row-major matrix used for network weights, biases and activations.
//!
//! Shape mismatches are construction bugs, not runtime conditions, so every
//! binary operation asserts exact shape equality instead of returning a
//! `Result`.

use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Dense 2D buffer of `f32`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Allocate a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "buffer length {} does not match {}x{}",
            data.len(),
            rows,
            cols
        );
        Self { rows, cols, data }
    }

    /// Allocate a matrix filled uniformly in [-1, 1].
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let mut m = Self::zeros(rows, cols);
        m.randomize(rng);
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Value at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    /// Set value at (row, col).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    /// Fill uniformly in [-1, 1].
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let dist = Uniform::new_inclusive(-1.0f32, 1.0);
        for v in &mut self.data {
            *v = dist.sample(rng);
        }
    }

    /// Apply `f(x) = 2 / (1 + e^-x) - 1` in place.
    pub fn activate(&mut self) {
        for v in &mut self.data {
            *v = activation(*v);
        }
    }

    /// Matrix product `a × b`, allocating the result.
    pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
        let mut c = Matrix::zeros(a.rows, b.cols);
        Matrix::multiply_into(a, b, &mut c);
        c
    }

    /// Matrix product `a × b` written into `c`.
    ///
    /// Column vectors (`b.cols == 1`) take a fast path, which is the shape
    /// every forward pass uses.
    pub fn multiply_into(a: &Matrix, b: &Matrix, c: &mut Matrix) {
        assert_eq!(a.cols, b.rows, "inner dimensions differ");
        assert_eq!(c.shape(), (a.rows, b.cols), "output shape mismatch");

        if b.cols == 1 {
            for (out, row) in c.data.iter_mut().zip(a.data.chunks_exact(a.cols.max(1))) {
                *out = row.iter().zip(&b.data).map(|(w, x)| w * x).sum();
            }
            if a.cols == 0 {
                c.data.fill(0.0);
            }
            return;
        }

        for i in 0..a.rows {
            for j in 0..b.cols {
                let mut sum = 0.0;
                for k in 0..a.cols {
                    sum += a.get(i, k) * b.get(k, j);
                }
                c.set(i, j, sum);
            }
        }
    }

    /// Element-wise `a + b`, allocating the result.
    pub fn add(a: &Matrix, b: &Matrix) -> Matrix {
        let mut c = Matrix::zeros(a.rows, a.cols);
        Matrix::add_into(a, b, &mut c);
        c
    }

    /// Element-wise `a + b` written into `c`.
    pub fn add_into(a: &Matrix, b: &Matrix, c: &mut Matrix) {
        assert_eq!(a.shape(), b.shape(), "operand shapes differ");
        assert_eq!(c.shape(), a.shape(), "output shape mismatch");
        for ((out, x), y) in c.data.iter_mut().zip(&a.data).zip(&b.data) {
            *out = x + y;
        }
    }

    /// Element-wise `self += other`.
    pub fn add_assign(&mut self, other: &Matrix) {
        assert_eq!(self.shape(), other.shape(), "operand shapes differ");
        for (x, y) in self.data.iter_mut().zip(&other.data) {
            *x += y;
        }
    }

    /// `(a + b) / 2` plus independent uniform noise in `[-mutation_max, mutation_max]`
    /// per element. A magnitude of zero yields the exact average.
    pub fn average_with_mutation<R: Rng + ?Sized>(
        a: &Matrix,
        b: &Matrix,
        mutation_max: f32,
        rng: &mut R,
    ) -> Matrix {
        assert_eq!(a.shape(), b.shape(), "operand shapes differ");

        let noise = (mutation_max > 0.0).then(|| Uniform::new_inclusive(-mutation_max, mutation_max));
        let data = a
            .data
            .iter()
            .zip(&b.data)
            .map(|(x, y)| {
                let mutation = noise.map_or(0.0, |dist| dist.sample(rng));
                (x + y) / 2.0 + mutation
            })
            .collect();

        Matrix {
            rows: a.rows,
            cols: a.cols,
            data,
        }
    }
}

/// Zero-centered sigmoid with range (-1, 1).
///
/// The f32 result saturates to ±1 for |x| beyond about 17; it is held one
/// ulp inside the bounds.
#[inline]
pub fn activation(x: f32) -> f32 {
    (2.0 / (1.0 + (-x).exp()) - 1.0).clamp((-1.0f32).next_up(), 1.0f32.next_down())
}
