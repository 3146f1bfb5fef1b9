//! Spill string codec.
//!
//! A spill string is a comma-joined token list `N,ch1,...,chN,m11,m12,...,mNN`:
//! the channel count, the channel names, then the matrix in row-major order.

use itertools::Itertools;
use ndarray::Array2;

use crate::error::{EventError, Result};

/// Parse a spill string into its channel list and `N×N` spillover matrix.
///
/// # Errors
/// Returns `EventError::MalformedSpillString` if the count is not a positive
/// integer, the token count is not exactly `1 + N + N²`, a channel name is empty
/// or repeated, or a matrix value is not a number.
pub fn parse_spill_string(spill: &str) -> Result<(Vec<String>, Array2<f64>)> {
    let tokens: Vec<&str> = spill.trim().split(',').map(str::trim).collect();

    let n: usize = tokens
        .first()
        .and_then(|t| t.parse().ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            EventError::malformed_spill_string(format!(
                "first token '{}' is not a positive channel count",
                tokens.first().copied().unwrap_or_default()
            ))
        })?;

    // A count at or above the token count can never fit
    let expected = Some(n)
        .filter(|&n| n < tokens.len())
        .and_then(|n| n.checked_mul(n))
        .and_then(|square| square.checked_add(n + 1))
        .ok_or_else(|| {
            EventError::malformed_spill_string(format!(
                "channel count {} does not fit {} tokens",
                n,
                tokens.len()
            ))
        })?;
    if tokens.len() != expected {
        return Err(EventError::malformed_spill_string(format!(
            "expected {} tokens for {} channels, got {}",
            expected,
            n,
            tokens.len()
        )));
    }

    let channels: Vec<String> = tokens[1..=n].iter().map(|t| t.to_string()).collect();
    if let Some(empty) = channels.iter().position(String::is_empty) {
        return Err(EventError::malformed_spill_string(format!(
            "channel name {} is empty",
            empty + 1
        )));
    }
    if let Some(dup) = channels.iter().duplicates().next() {
        return Err(EventError::malformed_spill_string(format!(
            "channel '{}' appears more than once",
            dup
        )));
    }

    let values = tokens[n + 1..]
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            t.parse::<f64>().map_err(|_| {
                EventError::malformed_spill_string(format!(
                    "matrix value {} ('{}') is not a number",
                    idx, t
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let matrix = Array2::from_shape_vec((n, n), values)
        .map_err(|e| EventError::malformed_spill_string(e.to_string()))?;

    Ok((channels, matrix))
}

/// Format channels and a row-major matrix as a spill string.
///
/// # Errors
/// Returns `EventError::DimensionMismatch` if the matrix is not `N×N` for
/// `N = channels.len()`.
pub fn to_spill_string(channels: &[String], matrix: &Array2<f64>) -> Result<String> {
    let n = channels.len();
    if matrix.dim() != (n, n) {
        return Err(EventError::dimension_mismatch(format!(
            "{} channels but a {}x{} matrix",
            n,
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let head = std::iter::once(n.to_string()).chain(channels.iter().cloned());
    let body = matrix.iter().map(|v| v.to_string());
    Ok(head.chain(body).join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_two_channels() {
        let (channels, m) = parse_spill_string("2,FL1-A,FL2-A,1,0.02,0,1").unwrap();
        assert_eq!(channels, vec!["FL1-A", "FL2-A"]);
        assert_eq!(m, array![[1.0, 0.02], [0.0, 1.0]]);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let (channels, m) = parse_spill_string(" 1, A ,1 \n").unwrap();
        assert_eq!(channels, vec!["A"]);
        assert_eq!(m, array![[1.0]]);
    }

    #[test]
    fn test_format_then_parse() {
        let channels = vec!["A".to_string(), "B".to_string()];
        let m = array![[1.0, 0.125], [0.5, 1.0]];
        let s = to_spill_string(&channels, &m).unwrap();
        assert_eq!(s, "2,A,B,1,0.125,0.5,1");
        assert_eq!(parse_spill_string(&s).unwrap(), (channels, m));
    }

    #[test]
    fn test_malformed() {
        for bad in [
            "",
            "x,A,1",
            "0",
            "2,A,B,1,0,0",
            "2,A,B,1,0,0,1,7",
            "2,A,A,1,0,0,1",
            "2,A,,1,0,0,1",
            "1,A,one",
            "4294967296,A,1",
            "18446744073709551615,A,1",
        ] {
            let err = parse_spill_string(bad).unwrap_err();
            assert!(
                matches!(err, EventError::MalformedSpillString { .. }),
                "expected malformed error for {:?}, got {:?}",
                bad,
                err
            );
        }
    }
}
