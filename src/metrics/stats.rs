//! Null-skipping descriptive statistics over one column of a group.

use statrs::statistics::Statistics;

/// The non-null values of a column within a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    /// Collect the present values, skipping nulls.
    pub fn from_options<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        Self {
            values: values.into_iter().flatten().collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Sum of the present values; zero when there are none.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        finite(self.values.iter().mean())
    }

    /// Sample standard deviation (n - 1 denominator); needs at least two values.
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        finite(self.values.iter().std_dev())
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Quantile with linear interpolation between the closest order statistics.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.values.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let position = q * (sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;

        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Pearson correlation over the positions where both series are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();

    if xs.len() < 2 {
        return None;
    }

    let std_x = xs.iter().std_dev();
    let std_y = ys.iter().std_dev();
    if !(std_x > 0.0 && std_y > 0.0) {
        return None;
    }

    let covariance = xs.iter().covariance(ys.iter());
    finite(covariance / (std_x * std_y))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_skips_nulls() {
        let sample = Sample::from_options(vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(sample.count(), 2);
        assert_eq!(sample.sum(), 4.0);
        assert!(approx(sample.mean(), 2.0));
    }

    #[test]
    fn test_empty_sample() {
        let sample = Sample::from_options(vec![None, None]);
        assert_eq!(sample.sum(), 0.0);
        assert_eq!(sample.mean(), None);
        assert_eq!(sample.median(), None);
        assert_eq!(sample.std_dev(), None);
    }

    #[test]
    fn test_sample_std_dev() {
        let sample = Sample::from_options(vec![Some(2.0), Some(4.0), Some(4.0), Some(4.0), Some(5.0), Some(5.0), Some(7.0), Some(9.0)]);
        // Sample variance = 32 / 7
        assert!(approx(sample.std_dev(), (32.0f64 / 7.0).sqrt()));

        let single = Sample::from_options(vec![Some(5.0)]);
        assert_eq!(single.std_dev(), None);
    }

    #[test]
    fn test_median_and_quantiles() {
        let odd = Sample::from_options(vec![Some(3.0), Some(1.0), Some(2.0)]);
        assert!(approx(odd.median(), 2.0));

        let even = Sample::from_options(vec![Some(4.0), Some(1.0), Some(3.0), Some(2.0)]);
        assert!(approx(even.median(), 2.5));
        assert!(approx(even.quantile(0.25), 1.75));
        assert!(approx(even.quantile(0.75), 3.25));
        assert_eq!(even.quantile(1.5), None);
    }

    #[test]
    fn test_pearson() {
        let x = vec![Some(1.0), Some(2.0), Some(3.0), None];
        let y = vec![Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert!(approx(pearson(&x, &y), 1.0));

        let inverse = vec![Some(3.0), Some(2.0), Some(1.0), Some(0.0)];
        assert!(approx(pearson(&x, &inverse), -1.0));

        let flat = vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&x, &flat), None);
    }
}
