//! Pure computational tools.

/// Odd divisors tried between scheduler yields.
const PRIME_CHUNK: u32 = 1 << 16;

/// Sum of two numbers.
pub fn sum(num1: f64, num2: f64) -> f64 {
    num1 + num2
}

/// Trial-division primality test.
///
/// Yields to the scheduler every `PRIME_CHUNK` divisors so the tool
/// timeout and task aborts can interrupt large inputs.
pub async fn is_prime(n: i64) -> bool {
    let mut check = TrialDivision::new(n);
    loop {
        if let Some(verdict) = check.advance(PRIME_CHUNK) {
            return verdict;
        }
        tokio::task::yield_now().await;
    }
}

struct TrialDivision {
    n: i64,
    divisor: i64,
    limit: i64,
}

impl TrialDivision {
    fn new(n: i64) -> Self {
        Self {
            n,
            divisor: 3,
            limit: isqrt(n),
        }
    }

    /// Try up to `budget` divisors; `None` means not decided yet.
    fn advance(&mut self, budget: u32) -> Option<bool> {
        if self.n < 2 {
            return Some(false);
        }
        if self.n == 2 {
            return Some(true);
        }
        if self.n % 2 == 0 {
            return Some(false);
        }

        for _ in 0..budget {
            if self.divisor > self.limit {
                return Some(true);
            }
            if self.n % self.divisor == 0 {
                return Some(false);
            }
            self.divisor += 2;
        }
        None
    }
}

/// Floor square root, corrected for f64 rounding near `i64::MAX`.
fn isqrt(n: i64) -> i64 {
    if n < 2 {
        return n.max(0);
    }
    let mut root = (n as f64).sqrt() as i64;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    root
}
