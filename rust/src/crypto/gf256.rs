//! Arithmetic in the Galois field GF(2^8), reduced by the AES polynomial
//! x^8 + x^4 + x^3 + x + 1 (0x11B). Shamir shares are evaluated byte by byte
//! in this field, so every operation here works on plain `u8` values.
//!
//! Multiplication and inversion go through lookup tables that are built once
//! on first use; `mul_slow` and `inverse_slow` are the reference routines the
//! tables are generated from.

use std::sync::OnceLock;

/// Low byte of the reduction polynomial; the x^8 term falls off the shift.
pub const REDUCTION: u8 = 0x1B;

struct Tables {
    mul: Box<[[u8; 256]; 256]>,
    inv: [u8; 256],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(|| {
        let mut mul = Box::new([[0u8; 256]; 256]);
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                mul[a as usize][b as usize] = mul_slow(a, b);
            }
        }
        let mut inv = [0u8; 256];
        for a in 1..=255u8 {
            inv[a as usize] = pow254(a, &mul);
        }
        Tables { mul, inv }
    })
}

/// Addition is XOR.
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Subtraction is the same operation as addition in characteristic 2.
#[inline]
pub fn sub(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Table-driven multiplication.
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    tables().mul[a as usize][b as usize]
}

/// Multiplicative inverse.
///
/// # Panics
///
/// Zero has no inverse; asking for one is a caller bug.
pub fn inverse(a: u8) -> u8 {
    assert!(a != 0, "cannot invert 0 in GF(2^8)");
    tables().inv[a as usize]
}

/// Division `a / b`, computed as `a * b^-1`.
///
/// # Panics
///
/// Panics when `b` is zero.
pub fn div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by zero in GF(2^8)");
    let c = mul(a, inverse(b));
    // Select 0 for a == 0 without a data-dependent branch.
    let zero_mask = ((a == 0) as u8).wrapping_neg();
    c & !zero_mask
}

/// Russian-peasant multiplication with reduction, eight rounds regardless
/// of the operands.
pub fn mul_slow(a: u8, b: u8) -> u8 {
    let mut product = 0u8;
    let mut temp = b;
    for i in 0..8 {
        if a & (1 << i) != 0 {
            product ^= temp;
        }
        let carry = temp & 0x80 != 0;
        temp <<= 1;
        if carry {
            temp ^= REDUCTION;
        }
    }
    product
}

/// Inverse by Fermat: a^254 = a^-1 since a^255 = 1 for every non-zero a.
///
/// # Panics
///
/// Panics when `a` is zero.
pub fn inverse_slow(a: u8) -> u8 {
    assert!(a != 0, "cannot invert 0 in GF(2^8)");
    let mut result = 1u8;
    let mut base = a;
    for i in 0..8 {
        if (254u32 >> i) & 1 == 1 {
            result = mul_slow(result, base);
        }
        base = mul_slow(base, base);
    }
    result
}

fn pow254(a: u8, mul: &[[u8; 256]; 256]) -> u8 {
    let mut result = 1u8;
    let mut base = a;
    for i in 0..8 {
        if (254u32 >> i) & 1 == 1 {
            result = mul[result as usize][base as usize];
        }
        base = mul[base as usize][base as usize];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_is_xor_and_matches_subtraction() {
        let cases = [
            (0u8, 0u8, 0u8),
            (1, 0, 1),
            (255, 255, 0),
            (0x0F, 0xF0, 0xFF),
            (0x53, 0xCA, 0x99),
            (0xAA, 0x55, 0xFF),
        ];
        for (a, b, expected) in cases {
            assert_eq!(add(a, b), expected, "add({a:#04x}, {b:#04x})");
            assert_eq!(add(b, a), expected, "add is commutative");
            assert_eq!(sub(a, b), expected, "sub({a:#04x}, {b:#04x})");
        }
    }

    #[test]
    fn multiplies_known_vectors() {
        let cases = [
            (0u8, 0u8, 0u8),
            (0, 1, 0),
            (1, 1, 1),
            (2, 3, 6),
            (3, 7, 9),
            (0xFF, 0x01, 0xFF),
            (0x53, 0xCA, 0x01),
            (0x02, 0x80, 0x1B),
            (0x57, 0x83, 0xC1),
        ];
        for (a, b, expected) in cases {
            assert_eq!(mul(a, b), expected, "mul({a:#04x}, {b:#04x})");
            assert_eq!(mul(b, a), expected, "mul is commutative");
        }
    }

    #[test]
    fn table_agrees_with_reference_multiplication() {
        for a in 0..=255u8 {
            for b in [0u8, 1, 2, 0x1B, 0x53, 0x80, 0xCA, 0xFF] {
                assert_eq!(mul(a, b), mul_slow(a, b));
            }
        }
    }

    #[test]
    fn every_non_zero_element_has_an_inverse() {
        assert_eq!(inverse(1), 1);
        assert_eq!(inverse(0x53), 0xCA);
        assert_eq!(inverse(0xFF), 0x1C);
        assert_eq!(inverse(0x55), 0x24);
        for a in 1..=255u8 {
            let inv = inverse(a);
            assert_eq!(mul(a, inv), 1, "a={a:#04x}");
            assert_eq!(inv, inverse_slow(a));
        }
    }

    #[test]
    fn divides() {
        assert_eq!(div(0, 1), 0);
        assert_eq!(div(1, 1), 1);
        assert_eq!(div(2, 1), 2);
        assert_eq!(div(2, 2), 1);
        assert_eq!(div(0x53, 0xCA), mul(0x53, inverse(0xCA)));
        assert_eq!(div(mul(0x53, 0xCA), 0x53), 0xCA);
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn division_by_zero_panics() {
        div(1, 0);
    }

    #[test]
    #[should_panic(expected = "cannot invert 0")]
    fn inverse_of_zero_panics() {
        inverse(0);
    }
}
