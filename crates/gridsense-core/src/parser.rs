//! Matrix parsing from a sanitized token stream
//!
//! The stream is a comma-separated list of numeric tokens. Exactly
//! [`GRID_CELLS`] tokens are consumed, row-major; anything after that is
//! ignored. Parsing is all-or-nothing: on error no matrix is produced and a
//! caller-held matrix is left untouched.

use crate::sanitize::sanitize;
use crate::types::{Matrix, GRID_CELLS};
use crate::{Error, Result};
use tracing::debug;

/// Parse exactly `GRID_CELLS` values from an already sanitized stream.
///
/// # Errors
/// - [`Error::MalformedToken`] if a token is empty (`"1,,2"`, a leading comma,
///   a trailing comma before enough values were read, or an empty stream)
/// - [`Error::InsufficientValues`] if the stream ends before `GRID_CELLS` tokens
pub fn parse_matrix(stream: &str) -> Result<Matrix> {
    let mut values = [0.0f32; GRID_CELLS];
    let mut rest = Some(stream);

    for (index, slot) in values.iter_mut().enumerate() {
        let Some(cursor) = rest else {
            return Err(Error::InsufficientValues {
                expected: GRID_CELLS,
                found: index,
            });
        };

        let (token, tail) = match cursor.find(',') {
            Some(pos) => (&cursor[..pos], Some(&cursor[pos + 1..])),
            None => (cursor, None),
        };

        if token.is_empty() {
            return Err(Error::MalformedToken { index });
        }

        if numeric_prefix_len(token) < token.len() {
            debug!(index, token, "token is not fully numeric, using its numeric prefix");
        }
        *slot = lenient_float(token);
        rest = tail;
    }

    Ok(Matrix::from_row_major(&values))
}

/// Sanitize a raw line and parse it into `target`.
///
/// `target` is only overwritten when the whole parse succeeds.
pub fn parse_line_into(raw: &str, target: &mut Matrix) -> Result<()> {
    let parsed = parse_matrix(&sanitize(raw))?;
    *target = parsed;
    Ok(())
}

/// Best-effort numeric conversion that never fails.
///
/// Converts the longest prefix of `token` that forms a decimal number
/// (optional sign, digits with an optional fraction, optional exponent).
/// A token with no numeric prefix converts to `0.0`, so `"1.5abc"` is `1.5`
/// and `"abc"` is `0.0`.
pub fn lenient_float(token: &str) -> f32 {
    match numeric_prefix_len(token) {
        0 => 0.0,
        end => token[..end].parse().unwrap_or(0.0),
    }
}

/// Length in bytes of the numeric prefix of `token`, 0 if there is none
fn numeric_prefix_len(token: &str) -> usize {
    let bytes = token.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        end += 1 + frac_digits;
    }

    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits_from(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    end
}
