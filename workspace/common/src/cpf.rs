//! Validation of the Brazilian taxpayer identifier (CPF).
//!
//! A CPF is 11 digits: nine base digits followed by two check digits. Each
//! check digit is derived from a weighted sum modulo 11 of the digits before
//! it. Strings made of one repeated digit satisfy the arithmetic but are not
//! issued, so they are rejected explicitly.

use tracing::trace;

const CPF_LEN: usize = 11;

/// Returns true when `raw` is exactly 11 ASCII digits with matching check digits.
pub fn is_valid_cpf(raw: &str) -> bool {
    if raw.len() != CPF_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
        trace!("CPF rejected: not {} ASCII digits", CPF_LEN);
        return false;
    }

    let digits: Vec<u32> = raw.bytes().map(|b| u32::from(b - b'0')).collect();

    if digits.iter().all(|&d| d == digits[0]) {
        trace!("CPF rejected: all digits identical");
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Check digit for `prefix`, weighting the first digit with `len + 1` down to 2.
fn check_digit(prefix: &[u32]) -> u32 {
    let top_weight = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top_weight - i as u32))
        .sum();

    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}
