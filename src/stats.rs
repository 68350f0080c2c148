//! Sample statistics on dense signals

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub fn centered(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    values.iter().map(|&v| v - m).collect()
}

/// Zero-mean, unit-variance copy. A constant signal is only centered.
pub fn standardized(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = std_dev(values);
    if s > 0.0 {
        values.iter().map(|&v| (v - m) / s).collect()
    } else {
        values.iter().map(|&v| v - m).collect()
    }
}

/// Root mean square.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&values) - 2.5).abs() < 1e-12);
        assert!((std_dev(&values) - 1.25_f64.sqrt()).abs() < 1e-12);
        assert!((rms(&[3.0, -3.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardized() {
        let z = standardized(&[2.0, 4.0, 6.0, 8.0]);
        assert!(mean(&z).abs() < 1e-12);
        assert!((std_dev(&z) - 1.0).abs() < 1e-12);

        let flat = standardized(&[5.0; 4]);
        assert!(flat.iter().all(|&v| v == 0.0));
        assert_eq!(mean(&[]), 0.0);
    }
}
