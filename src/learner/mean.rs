use crate::data::Matrix;
use crate::errors::DisparityError;
use crate::learner::{FittedLearner, Learner};

/// Intercept-only learner.
#[derive(Default, Debug, Clone)]
pub struct MeanLearner {}

#[derive(Debug, Clone)]
pub struct FittedMean {
    pub prevalence: f64,
}

impl Learner for MeanLearner {
    fn fit(
        &self,
        _x: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<Box<dyn FittedLearner>, DisparityError> {
        let (ytot, ntot) = match sample_weight {
            Some(w) => y
                .iter()
                .zip(w)
                .fold((0.0, 0.0), |(yt, nt), (y_, w_)| (yt + y_ * w_, nt + w_)),
            None => (y.iter().sum::<f64>(), y.len() as f64),
        };
        if ntot <= 0.0 {
            return Err(DisparityError::FitFailed(
                self.name(),
                "no observations with positive weight".to_string(),
            ));
        }
        Ok(Box::new(FittedMean {
            prevalence: ytot / ntot,
        }))
    }

    fn name(&self) -> String {
        "Mean".to_string()
    }
}

impl FittedLearner for FittedMean {
    fn predict(&self, x: &Matrix<f64>) -> Vec<f64> {
        vec![self.prevalence; x.rows]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_learner() {
        let x = vec![0.0; 4];
        let m = Matrix::new(&x, 4, 1);
        let y = vec![1.0, 0.0, 0.0, 1.0];
        let fitted = MeanLearner::default().fit(&m, &y, None).unwrap();
        assert_eq!(fitted.predict(&m), vec![0.5; 4]);

        let w = vec![3.0, 1.0, 0.0, 0.0];
        let fitted = MeanLearner::default().fit(&m, &y, Some(&w)).unwrap();
        assert!((fitted.predict(&m)[0] - 0.75).abs() < 1e-12);

        let empty: Vec<f64> = Vec::new();
        let e = Matrix::new(&empty, 0, 0);
        assert!(MeanLearner::default().fit(&e, &[], None).is_err());
    }
}
