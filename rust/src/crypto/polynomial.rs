//! Polynomials over GF(2^8) used to hide one secret byte each.

use rand::RngCore;

use super::gf256;

/// Upper bound on redraws for a zero leading coefficient.
const LEADING_RETRIES: usize = 50;

/// Coefficients in ascending order; `coefficients[0]` is the secret byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<u8>,
}

impl Polynomial {
    pub fn from_coefficients(coefficients: Vec<u8>) -> Self {
        Self { coefficients }
    }

    /// Builds a polynomial of exactly `degree` whose intercept is `intercept`
    /// and whose other coefficients come from `rng`.
    pub fn random<R: RngCore + ?Sized>(
        intercept: u8,
        degree: u8,
        rng: &mut R,
    ) -> Result<Self, rand::Error> {
        let mut coefficients = vec![0u8; degree as usize + 1];
        coefficients[0] = intercept;
        if degree == 0 {
            return Ok(Self { coefficients });
        }
        rng.try_fill_bytes(&mut coefficients[1..])?;

        let leading = degree as usize;
        let mut draw = [0u8; 1];
        for _ in 0..LEADING_RETRIES {
            if coefficients[leading] != 0 {
                break;
            }
            rng.try_fill_bytes(&mut draw)?;
            coefficients[leading] = draw[0];
        }
        if coefficients[leading] == 0 {
            coefficients[leading] = 1;
        }
        Ok(Self { coefficients })
    }

    pub fn coefficients(&self) -> &[u8] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Horner evaluation at `x`.
    pub fn evaluate(&self, x: u8) -> u8 {
        let Some((&last, rest)) = self.coefficients.split_last() else {
            return 0;
        };
        if x == 0 {
            return self.coefficients[0];
        }
        rest.iter()
            .rev()
            .fold(last, |acc, &c| gf256::add(gf256::mul(acc, x), c))
    }
}

/// Lagrange interpolation through `(xs[i], ys[i])`, evaluated at `x`.
///
/// Only the first `min(xs.len(), ys.len())` samples are used. The sample x
/// values must be distinct.
pub fn interpolate(xs: &[u8], ys: &[u8], x: u8) -> u8 {
    let limit = xs.len().min(ys.len());
    if limit == 0 {
        return 0;
    }
    let (xs, ys) = (&xs[..limit], &ys[..limit]);
    if let Some(i) = xs.iter().position(|&xi| xi == x) {
        return ys[i];
    }

    let mut result = 0u8;
    for (i, (&xi, &yi)) in xs.iter().zip(ys).enumerate() {
        if yi == 0 {
            continue;
        }
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, &xj) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = gf256::mul(numerator, gf256::add(x, xj));
            denominator = gf256::mul(denominator, gf256::add(xi, xj));
        }
        let basis = gf256::div(numerator, denominator);
        result = gf256::add(result, gf256::mul(yi, basis));
    }
    result
}
