use crate::error::WaitTimeError;
use rand::Rng;
use std::time::Duration;

/// How long a simulated user idles after each task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitTime {
    /// Uniform over the closed interval `[min, max]` seconds.
    Between { min: f64, max: f64 },
    Constant(f64),
}

impl WaitTime {
    pub fn between(min: f64, max: f64) -> Result<Self, WaitTimeError> {
        if !valid_bound(min) || !valid_bound(max) {
            return Err(WaitTimeError::InvalidBound { min, max });
        }
        if min > max {
            return Err(WaitTimeError::MinAboveMax { min, max });
        }
        Ok(Self::Between { min, max })
    }

    pub fn constant(secs: f64) -> Result<Self, WaitTimeError> {
        if !valid_bound(secs) {
            return Err(WaitTimeError::InvalidBound {
                min: secs,
                max: secs,
            });
        }
        Ok(Self::Constant(secs))
    }

    #[must_use]
    pub fn bounds(&self) -> (Duration, Duration) {
        match *self {
            Self::Between { min, max } => {
                (Duration::from_secs_f64(min), Duration::from_secs_f64(max))
            }
            Self::Constant(secs) => {
                let d = Duration::from_secs_f64(secs);
                (d, d)
            }
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Between { min, max } if min < max => {
                Duration::from_secs_f64(rng.gen_range(min..=max))
            }
            Self::Between { min, .. } => Duration::from_secs_f64(min),
            Self::Constant(secs) => Duration::from_secs_f64(secs),
        }
    }
}

#[inline]
fn valid_bound(secs: f64) -> bool {
    Duration::try_from_secs_f64(secs).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn between_samples_stay_inside_closed_interval() {
        let wait = WaitTime::between(1.0, 2.0).unwrap();
        let (min, max) = wait.bounds();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = wait.sample(&mut rng);
            assert!(min <= d && d <= max, "{d:?} outside [{min:?}, {max:?}]");
        }
    }

    #[test]
    fn between_samples_are_spread() {
        let wait = WaitTime::between(1.0, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let draws: Vec<Duration> = (0..1000).map(|_| wait.sample(&mut rng)).collect();
        let below_half = draws
            .iter()
            .filter(|d| **d < Duration::from_millis(1500))
            .count();
        assert!((350..650).contains(&below_half), "{below_half}");
    }

    #[test]
    fn degenerate_interval_is_constant() {
        let wait = WaitTime::between(1.5, 1.5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(Duration::from_millis(1500), wait.sample(&mut rng));
        let wait = WaitTime::constant(0.25).unwrap();
        assert_eq!(Duration::from_millis(250), wait.sample(&mut rng));
    }

    #[test]
    fn rejects_bad_bounds() {
        assert_eq!(
            Err(WaitTimeError::MinAboveMax { min: 2.0, max: 1.0 }),
            WaitTime::between(2.0, 1.0)
        );
        assert!(matches!(
            WaitTime::between(-1.0, 1.0),
            Err(WaitTimeError::InvalidBound { .. })
        ));
        assert!(WaitTime::between(0.0, f64::INFINITY).is_err());
        assert!(WaitTime::constant(f64::NAN).is_err());
        assert_eq!(
            Err(WaitTimeError::InvalidBound { min: 0.0, max: 1e20 }),
            WaitTime::between(0.0, 1e20)
        );
        assert!(WaitTime::constant(1e20).is_err());
        assert!(WaitTime::between(0.0, 3600.0).is_ok());
    }
}
