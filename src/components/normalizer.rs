use {
    crate::error::{
        ExperienceError,
        Result,
    },
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    tracing::trace,
};

/// Added to the standard deviation before dividing.
const STD_EPSILON: f64 = 1e-2;

/// Running statistics, established by the first observation.
///
/// `mean` doubles as the previous mean during an update, it is only replaced
/// once the new variance has been accumulated.
#[derive(Clone, Debug)]
struct RunningStats {
    mean: Tensor,
    sum_sq_dev: Tensor,
}

/// Online observation normalizer.
///
/// Keeps a per-element running mean and variance of everything passed to
/// [`Normalizer::update_stats`] using Welford's algorithm, and standardizes
/// new observations with them. Inputs are clipped to `pre_norm_clip` before
/// anything else happens, and outputs are clipped to `post_norm_clip`.
///
/// Statistics are accumulated in `f64` and cast to the dtype of whatever is
/// being normalized.
///
/// # Fields
///
/// * `count` - The number of observations folded into the statistics.
/// * `stats` - The running mean and sum of squared deviations, if any.
/// * `pre_norm_clip` - Bound applied to raw observations.
/// * `post_norm_clip` - Bound applied to normalized observations.
#[derive(Clone, Debug)]
pub struct Normalizer {
    count: f64,
    stats: Option<RunningStats>,
    pre_norm_clip: f64,
    post_norm_clip: f64,
}
impl Default for Normalizer {
    fn default() -> Self {
        Self::new(200.0, 5.0)
    }
}
impl Normalizer {
    pub fn new(
        pre_norm_clip: f64,
        post_norm_clip: f64,
    ) -> Self {
        Self {
            count: 0.0,
            stats: None,
            pre_norm_clip,
            post_norm_clip,
        }
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn pre_norm_clip(&self) -> f64 {
        self.pre_norm_clip
    }

    pub fn post_norm_clip(&self) -> f64 {
        self.post_norm_clip
    }

    /// The shape fixed by the first observation, if there has been one.
    pub fn shape(&self) -> Option<&[usize]> {
        self.stats.as_ref().map(|s| s.mean.dims())
    }

    /// The running mean, if there has been at least one observation.
    pub fn mean(&self) -> Option<&Tensor> {
        self.stats.as_ref().map(|s| &s.mean)
    }

    /// The accumulated sum of squared deviations from the mean.
    pub fn sum_sq_dev(&self) -> Option<&Tensor> {
        self.stats.as_ref().map(|s| &s.sum_sq_dev)
    }

    fn check_shape(
        &self,
        x: &Tensor,
    ) -> Result<()> {
        match self.shape() {
            Some(expected) if expected != x.dims() => Err(ExperienceError::ShapeMismatch {
                expected: expected.to_vec(),
                found: x.dims().to_vec(),
            }),
            _ => Ok(()),
        }
    }

    /// Fold one observation into the running statistics.
    ///
    /// The first observation fixes the shape, later observations of another
    /// shape are rejected without touching the statistics.
    pub fn update_stats(
        &mut self,
        x: &Tensor,
    ) -> Result<()> {
        self.check_shape(x)?;
        let x = x.to_dtype(DType::F64)?;

        let stats = match &self.stats {
            None => RunningStats {
                sum_sq_dev: x.zeros_like()?,
                mean: x,
            },
            Some(RunningStats { mean: old_mean, sum_sq_dev }) => {
                let n = self.count + 1.0;
                let delta = (&x - old_mean)?;
                let mean = (old_mean + (&delta / n)?)?;
                let sum_sq_dev = (sum_sq_dev + (&delta * (&x - &mean)?)?)?;
                RunningStats { mean, sum_sq_dev }
            }
        };

        self.stats = Some(stats);
        self.count += 1.0;
        trace!("normalizer folded observation {}", self.count);
        Ok(())
    }

    /// The current mean and sample standard deviation.
    ///
    /// With fewer than two observations this is the neutral pair `(0.0, 1.0)`
    /// as scalar tensors, which makes normalization a plain rescale.
    pub fn get_stats(&self) -> Result<(Tensor, Tensor)> {
        match &self.stats {
            Some(stats) if self.count >= 2.0 => {
                let std = (&stats.sum_sq_dev / (self.count - 1.0))?.sqrt()?;
                Ok((stats.mean.clone(), std))
            }
            stats => {
                let device = stats
                    .as_ref()
                    .map(|s| s.mean.device().clone())
                    .unwrap_or(Device::Cpu);
                Ok((
                    Tensor::new(0.0f64, &device)?,
                    Tensor::new(1.0f64, &device)?,
                ))
            }
        }
    }

    fn pre_clip(
        &self,
        x: &Tensor,
    ) -> Result<Tensor> {
        Ok(x.clamp(-self.pre_norm_clip, self.pre_norm_clip)?)
    }

    fn normalize(
        &self,
        x: &Tensor,
    ) -> Result<Tensor> {
        let (mean, std) = self.get_stats()?;
        let mean = mean.to_dtype(x.dtype())?.to_device(x.device())?;
        let std = (std + STD_EPSILON)?.to_dtype(x.dtype())?.to_device(x.device())?;

        let x = x.broadcast_sub(&mean)?.broadcast_div(&std)?;
        Ok(x.clamp(-self.post_norm_clip, self.post_norm_clip)?)
    }

    /// Clip, standardize and clip `x` without updating the statistics.
    pub fn preprocess(
        &self,
        x: &Tensor,
    ) -> Result<Tensor> {
        self.check_shape(x)?;
        let x = self.pre_clip(x)?;
        self.normalize(&x)
    }

    /// Like [`Normalizer::preprocess`], but first folds the clipped `x` into
    /// the statistics, so the normalization already accounts for it.
    pub fn preprocess_with_update(
        &mut self,
        x: &Tensor,
    ) -> Result<Tensor> {
        let x = self.pre_clip(x)?;
        self.update_stats(&x)?;
        self.normalize(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(values: &[f64]) -> Tensor {
        Tensor::new(values, &Device::Cpu).unwrap()
    }

    fn v(tensor: &Tensor) -> Vec<f64> {
        tensor.to_dtype(DType::F64).unwrap().to_vec1::<f64>().unwrap()
    }

    fn scalar(tensor: &Tensor) -> f64 {
        tensor.to_scalar::<f64>().unwrap()
    }

    fn assert_close(
        a: &[f64],
        b: &[f64],
    ) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn defaults() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.pre_norm_clip(), 200.0);
        assert_eq!(normalizer.post_norm_clip(), 5.0);
        assert_eq!(normalizer.count(), 0.0);
        assert!(normalizer.shape().is_none());
    }

    #[test]
    fn neutral_stats_until_two_observations() {
        let mut normalizer = Normalizer::default();
        let (mean, std) = normalizer.get_stats().unwrap();
        assert_eq!((scalar(&mean), scalar(&std)), (0.0, 1.0));

        normalizer.update_stats(&t(&[3.0, -4.0])).unwrap();
        let (mean, std) = normalizer.get_stats().unwrap();
        assert_eq!((scalar(&mean), scalar(&std)), (0.0, 1.0));
        assert_eq!(normalizer.shape(), Some(&[2][..]));
        assert_eq!(v(normalizer.sum_sq_dev().unwrap()), vec![0.0, 0.0]);
    }

    #[test]
    fn two_point_welford() {
        let mut normalizer = Normalizer::default();
        normalizer.update_stats(&t(&[0.0])).unwrap();
        normalizer.update_stats(&t(&[2.0])).unwrap();

        assert_eq!(normalizer.count(), 2.0);
        assert_close(&v(normalizer.mean().unwrap()), &[1.0]);
        assert_close(&v(normalizer.sum_sq_dev().unwrap()), &[2.0]);

        let (mean, std) = normalizer.get_stats().unwrap();
        assert_close(&v(&mean), &[1.0]);
        assert_close(&v(&std), &[2.0f64.sqrt()]);
    }

    #[test]
    fn matches_two_pass_statistics() {
        let data = [
            [1.0, 10.0],
            [4.0, 12.0],
            [-2.0, 11.0],
            [7.5, 9.0],
            [0.5, 13.0],
        ];
        let mut normalizer = Normalizer::default();
        for row in &data {
            normalizer.update_stats(&t(row)).unwrap();
        }

        let n = data.len() as f64;
        let mean: Vec<f64> = (0..2)
            .map(|j| data.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let std: Vec<f64> = (0..2)
            .map(|j| {
                let ss: f64 = data.iter().map(|r| (r[j] - mean[j]).powi(2)).sum();
                (ss / (n - 1.0)).sqrt()
            })
            .collect();

        let (m, s) = normalizer.get_stats().unwrap();
        assert_close(&v(&m), &mean);
        assert_close(&v(&s), &std);
    }

    #[test]
    fn constant_stream_has_zero_std() {
        let mut normalizer = Normalizer::default();
        for _ in 0..6 {
            normalizer.update_stats(&t(&[1.5, -3.0, 0.0])).unwrap();
        }
        let (mean, std) = normalizer.get_stats().unwrap();
        assert_close(&v(&mean), &[1.5, -3.0, 0.0]);
        assert_close(&v(&std), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn shape_mismatch_leaves_state_untouched() {
        let mut normalizer = Normalizer::default();
        normalizer.update_stats(&t(&[1.0, 2.0])).unwrap();

        match normalizer.update_stats(&t(&[1.0, 2.0, 3.0])) {
            Err(ExperienceError::ShapeMismatch { expected, found }) => {
                assert_eq!(expected, vec![2]);
                assert_eq!(found, vec![3]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(normalizer.count(), 1.0);
        assert!(normalizer.preprocess(&t(&[1.0])).is_err());
        assert!(normalizer.preprocess_with_update(&t(&[1.0])).is_err());
        assert_eq!(normalizer.count(), 1.0);
    }

    #[test]
    fn preprocess_without_stats_rescales_and_clips() {
        let normalizer = Normalizer::default();
        let out = normalizer.preprocess(&t(&[1.01, -2.02, 1000.0])).unwrap();
        assert_close(&v(&out), &[1.0, -2.0, 5.0]);
    }

    #[test]
    fn single_observation_still_uses_neutral_stats() {
        let mut normalizer = Normalizer::new(200.0, 5.0);
        normalizer.update_stats(&t(&[4.0, -1.0, 3.0])).unwrap();
        assert_eq!(normalizer.count(), 1.0);

        let out = normalizer.preprocess(&t(&[2.02, -3.03, 500.0])).unwrap();
        assert_close(&v(&out), &[2.0, -3.0, 5.0]);
        assert_eq!(normalizer.count(), 1.0);

        let mut normalizer = Normalizer::new(200.0, 5.0);
        let out = normalizer.preprocess_with_update(&t(&[1.01, 250.0])).unwrap();
        assert_close(&v(&out), &[1.0, 5.0]);
        assert_eq!(normalizer.count(), 1.0);
    }

    #[test]
    fn preprocess_standardizes_with_current_stats() {
        let mut normalizer = Normalizer::default();
        normalizer.update_stats(&t(&[0.0])).unwrap();
        normalizer.update_stats(&t(&[2.0])).unwrap();

        let std = 2.0f64.sqrt() + STD_EPSILON;
        let out = normalizer.preprocess(&t(&[3.0])).unwrap();
        assert_close(&v(&out), &[2.0 / std]);
        assert_eq!(normalizer.count(), 2.0);
    }

    #[test]
    fn output_stays_within_post_clip() {
        let mut normalizer = Normalizer::new(50.0, 2.5);
        for i in 0..10 {
            normalizer.update_stats(&t(&[i as f64 * 0.1, -(i as f64)])).unwrap();
        }
        let out = v(&normalizer.preprocess(&t(&[1e6, -1e6])).unwrap());
        assert!(out.iter().all(|x| (-2.5..=2.5).contains(x)));
        assert_close(&out, &[2.5, -2.5]);
    }

    #[test]
    fn update_sees_pre_clipped_values() {
        let mut normalizer = Normalizer::new(10.0, 5.0);
        normalizer.preprocess_with_update(&t(&[0.0])).unwrap();
        normalizer.preprocess_with_update(&t(&[1000.0])).unwrap();

        assert_eq!(normalizer.count(), 2.0);
        assert_close(&v(normalizer.mean().unwrap()), &[5.0]);
    }

    #[test]
    fn only_update_variant_advances_stats() {
        let mut normalizer = Normalizer::default();
        normalizer.update_stats(&t(&[0.0, 1.0])).unwrap();
        normalizer.update_stats(&t(&[2.0, 3.0])).unwrap();

        let before = v(&normalizer.get_stats().unwrap().0);
        normalizer.preprocess(&t(&[8.0, 8.0])).unwrap();
        assert_eq!(v(&normalizer.get_stats().unwrap().0), before);

        let out = normalizer.preprocess_with_update(&t(&[8.0, 8.0])).unwrap();
        let (mean, std) = normalizer.get_stats().unwrap();
        assert_ne!(v(&mean), before);
        assert_eq!(normalizer.count(), 3.0);

        let expected: Vec<f64> = v(&mean)
            .iter()
            .zip(v(&std))
            .map(|(m, s)| ((8.0 - m) / (s + STD_EPSILON)).clamp(-5.0, 5.0))
            .collect();
        assert_close(&v(&out), &expected);
    }

    #[test]
    fn keeps_input_dtype() {
        let mut normalizer = Normalizer::default();
        let x = Tensor::new(&[1.0f32, 2.0], &Device::Cpu).unwrap();
        normalizer.update_stats(&x).unwrap();
        normalizer.update_stats(&(&x * 3.0).unwrap()).unwrap();

        let out = normalizer.preprocess(&x).unwrap();
        assert_eq!(out.dtype(), DType::F32);
        assert_eq!(out.dims(), x.dims());
    }
}
