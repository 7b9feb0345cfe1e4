use crate::error::{Result, ScanError};

/// Estimate the noise floor of a magnitude vector as its median.
///
/// Sorts a copy, so the caller's vector keeps its bin order. Even lengths
/// average the two central elements.
///
/// # Errors
/// Returns [`ScanError::InvalidInput`] for an empty vector.
pub fn noise_floor(magnitudes: &[f64]) -> Result<f64> {
    let mut scratch = Vec::with_capacity(magnitudes.len());
    noise_floor_with_scratch(magnitudes, &mut scratch)
}

/// Median estimate using a caller-owned sort buffer.
///
/// The scratch buffer is overwritten; reusing it across blocks avoids a
/// per-block allocation in the acquisition loop.
pub fn noise_floor_with_scratch(magnitudes: &[f64], scratch: &mut Vec<f64>) -> Result<f64> {
    if magnitudes.is_empty() {
        return Err(ScanError::InvalidInput(
            "noise floor of an empty magnitude vector".into(),
        ));
    }

    scratch.clear();
    scratch.extend_from_slice(magnitudes);
    scratch.sort_unstable_by(f64::total_cmp);

    let mid = scratch.len() / 2;
    if scratch.len() % 2 == 0 {
        Ok((scratch[mid - 1] + scratch[mid]) / 2.0)
    } else {
        Ok(scratch[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_even() {
        assert_relative_eq!(noise_floor(&[1.0, 3.0, 2.0, 4.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_median_odd() {
        assert_relative_eq!(noise_floor(&[1.0, 3.0, 2.0]).unwrap(), 2.0);
        assert_relative_eq!(noise_floor(&[7.5]).unwrap(), 7.5);
    }

    #[test]
    fn test_median_ignores_outliers() {
        let mags = [1.0, 1.1, 0.9, 1000.0, 1.05, 0.95, 1.0];
        assert_relative_eq!(noise_floor(&mags).unwrap(), 1.0);
    }

    #[test]
    fn test_input_order_preserved() {
        let mags = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        let before = mags.clone();
        let _ = noise_floor(&mags).unwrap();
        assert_eq!(mags, before);
    }

    #[test]
    fn test_empty_is_invalid_input() {
        let err = noise_floor(&[]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn test_scratch_reuse() {
        let mut scratch = Vec::new();
        assert_relative_eq!(
            noise_floor_with_scratch(&[4.0, 1.0, 3.0, 2.0], &mut scratch).unwrap(),
            2.5
        );
        assert_relative_eq!(
            noise_floor_with_scratch(&[9.0, 8.0, 7.0], &mut scratch).unwrap(),
            8.0
        );
        assert_eq!(scratch.len(), 3);
    }
}
