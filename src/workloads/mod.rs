//! CPU-bound workloads that make up one benchmark work unit.
//!
//! Every function here is pure apart from burning CPU and, for the
//! randomized workloads, drawing from the caller-supplied random source.
//! Nothing is shared between calls, so workers can run them side by side
//! without coordination.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fibonacci index computed per work unit.
pub const FIBONACCI_INDEX: u32 = 10_000;

/// Side length of the square matrices multiplied per work unit.
pub const MATRIX_SIZE: usize = 100;

/// Random points drawn by the Monte-Carlo estimator per work unit.
pub const MONTE_CARLO_ITERATIONS: u32 = 50_000;

/// Upper bound (inclusive) for prime counting per work unit.
pub const PRIME_LIMIT: u32 = 100_000;

/// Parameters for a single work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadParams {
    pub fibonacci_index: u32,
    pub matrix_size: usize,
    pub monte_carlo_iterations: u32,
    pub prime_limit: u32,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            fibonacci_index: FIBONACCI_INDEX,
            matrix_size: MATRIX_SIZE,
            monte_carlo_iterations: MONTE_CARLO_ITERATIONS,
            prime_limit: PRIME_LIMIT,
        }
    }
}

impl WorkloadParams {
    /// Much smaller parameters for smoke runs and tests.
    pub fn light() -> Self {
        Self {
            fibonacci_index: 500,
            matrix_size: 8,
            monte_carlo_iterations: 500,
            prime_limit: 500,
        }
    }

    /// Returns the name of the first parameter that is zero, if any.
    pub fn first_zero_field(&self) -> Option<&'static str> {
        if self.fibonacci_index == 0 {
            Some("fibonacci_index")
        } else if self.matrix_size == 0 {
            Some("matrix_size")
        } else if self.monte_carlo_iterations == 0 {
            Some("monte_carlo_iterations")
        } else if self.prime_limit == 0 {
            Some("prime_limit")
        } else {
            None
        }
    }

    /// Element count of one matrix, or `None` if it does not fit in memory.
    pub fn matrix_elements(&self) -> Option<usize> {
        let elements = self.matrix_size.checked_mul(self.matrix_size)?;
        let bytes = elements.checked_mul(std::mem::size_of::<f64>())?;
        (bytes <= isize::MAX as usize).then_some(elements)
    }
}

/// Computes the n-th Fibonacci number iteratively.
///
/// Uses wrapping 64-bit arithmetic: large indices overflow, and the value
/// itself is irrelevant to the benchmark, only the loop is.
pub fn fibonacci(n: u32) -> u64 {
    if n <= 1 {
        return u64::from(n);
    }

    let mut a = 0u64;
    let mut b = 1u64;
    let mut result = 0u64;

    for _ in 2..=n {
        result = a.wrapping_add(b);
        a = b;
        b = result;
    }

    result
}

/// Multiplies two random `size x size` matrices with the naive triple loop.
///
/// Matrices are stored row-major in flat vectors.
pub fn matrix_multiply<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Vec<f64> {
    let a: Vec<f64> = (0..size * size).map(|_| rng.gen::<f64>()).collect();
    let b: Vec<f64> = (0..size * size).map(|_| rng.gen::<f64>()).collect();
    let mut c = vec![0.0f64; size * size];

    for i in 0..size {
        for j in 0..size {
            let mut sum = 0.0;
            for k in 0..size {
                sum += a[i * size + k] * b[k * size + j];
            }
            c[i * size + j] = sum;
        }
    }

    c
}

/// Estimates pi from `iterations` random points in the unit square.
pub fn monte_carlo_pi<R: Rng + ?Sized>(iterations: u32, rng: &mut R) -> f64 {
    if iterations == 0 {
        return 0.0;
    }

    let mut inside = 0u32;
    for _ in 0..iterations {
        let x: f64 = rng.gen();
        let y: f64 = rng.gen();
        if x * x + y * y <= 1.0 {
            inside += 1;
        }
    }

    (f64::from(inside) / f64::from(iterations)) * 4.0
}

/// Counts primes in `2..=limit` by trial division up to the square root.
pub fn count_primes(limit: u32) -> u32 {
    let mut count = 0;

    for n in 2..=limit {
        let root = (f64::from(n)).sqrt() as u32;
        let mut is_prime = true;

        for d in 2..=root {
            if n % d == 0 {
                is_prime = false;
                break;
            }
        }

        if is_prime {
            count += 1;
        }
    }

    count
}

/// Runs one work unit: all four workloads, in order.
pub fn run_work_unit<R: Rng + ?Sized>(params: &WorkloadParams, rng: &mut R) {
    std::hint::black_box(fibonacci(params.fibonacci_index));
    std::hint::black_box(matrix_multiply(params.matrix_size, rng));
    std::hint::black_box(monte_carlo_pi(params.monte_carlo_iterations, rng));
    std::hint::black_box(count_primes(params.prime_limit));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fibonacci_small_values() {
        assert_eq!(fibonacci(0), 0);
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(2), 1);
        assert_eq!(fibonacci(10), 55);
        assert_eq!(fibonacci(50), 12_586_269_025);
        assert_eq!(fibonacci(93), 12_200_160_415_121_876_738);
    }

    #[test]
    fn test_fibonacci_large_index_does_not_panic() {
        assert_eq!(fibonacci(FIBONACCI_INDEX), fibonacci(FIBONACCI_INDEX));
    }

    #[test]
    fn test_matrix_multiply_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let product = matrix_multiply(10, &mut rng);
        assert_eq!(product.len(), 100);
        // Each entry sums 10 products of values in [0, 1).
        assert!(product.iter().all(|&v| (0.0..10.0).contains(&v)));
    }

    #[test]
    fn test_matrix_multiply_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matrix_multiply(0, &mut rng).is_empty());
    }

    #[test]
    fn test_monte_carlo_pi_is_close() {
        let mut rng = StdRng::seed_from_u64(42);
        let estimate = monte_carlo_pi(200_000, &mut rng);
        assert!((estimate - std::f64::consts::PI).abs() < 0.05, "estimate was {}", estimate);
    }

    #[test]
    fn test_monte_carlo_pi_zero_iterations() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(monte_carlo_pi(0, &mut rng), 0.0);
    }

    #[test]
    fn test_count_primes() {
        assert_eq!(count_primes(0), 0);
        assert_eq!(count_primes(1), 0);
        assert_eq!(count_primes(2), 1);
        assert_eq!(count_primes(10), 4);
        assert_eq!(count_primes(100), 25);
        assert_eq!(count_primes(10_000), 1_229);
    }

    #[test]
    fn test_count_primes_default_limit() {
        assert_eq!(count_primes(PRIME_LIMIT), 9_592);
    }

    #[test]
    fn test_default_params_match_constants() {
        let params = WorkloadParams::default();
        assert_eq!(params.fibonacci_index, 10_000);
        assert_eq!(params.matrix_size, 100);
        assert_eq!(params.monte_carlo_iterations, 50_000);
        assert_eq!(params.prime_limit, 100_000);
        assert_eq!(params.first_zero_field(), None);
    }

    #[test]
    fn test_first_zero_field() {
        let mut params = WorkloadParams::light();
        params.matrix_size = 0;
        assert_eq!(params.first_zero_field(), Some("matrix_size"));
    }

    #[test]
    fn test_matrix_elements() {
        assert_eq!(WorkloadParams::default().matrix_elements(), Some(MATRIX_SIZE * MATRIX_SIZE));

        let mut params = WorkloadParams::light();
        params.matrix_size = usize::MAX;
        assert_eq!(params.matrix_elements(), None);
    }
}
