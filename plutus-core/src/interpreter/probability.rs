//! Probability interpreter for classification models.

use serde::{Deserialize, Serialize};

use super::{Interpretation, InterpreterError};

pub const MIN_PROBABILITY_VALUE: f64 = 0.51;
pub const MAX_PROBABILITY_VALUE: f64 = 0.99;

/// Reads an `[up, down]` probability pair.
///
/// When both thresholds are met the up probability wins: it is checked first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probability {
    pub min_increase_probability: f64,
    pub min_decrease_probability: f64,
}

impl Probability {
    pub fn new(
        min_increase_probability: f64,
        min_decrease_probability: f64,
    ) -> Result<Self, InterpreterError> {
        let interpreter = Self {
            min_increase_probability,
            min_decrease_probability,
        };
        interpreter.validate()?;
        Ok(interpreter)
    }

    pub fn validate(&self) -> Result<(), InterpreterError> {
        check_range("min_increase_probability", self.min_increase_probability)?;
        check_range("min_decrease_probability", self.min_decrease_probability)
    }

    pub fn interpret(&self, probabilities: &[f64]) -> Result<Interpretation, InterpreterError> {
        let [up, down] = probabilities else {
            return Err(InterpreterError::InvalidProbabilities {
                received: probabilities.len(),
            });
        };
        Ok(if *up >= self.min_increase_probability {
            Interpretation::long()
        } else if *down >= self.min_decrease_probability {
            Interpretation::short()
        } else {
            Interpretation::neutral()
        })
    }
}

fn check_range(name: &'static str, value: f64) -> Result<(), InterpreterError> {
    if !(MIN_PROBABILITY_VALUE..MAX_PROBABILITY_VALUE).contains(&value) {
        return Err(InterpreterError::ThresholdOutOfRange {
            name,
            value,
            min: MIN_PROBABILITY_VALUE,
            max: MAX_PROBABILITY_VALUE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_range() {
        assert!(Probability::new(0.51, 0.98).is_ok());
        assert!(Probability::new(0.5, 0.6).is_err());
        assert!(matches!(
            Probability::new(0.6, 0.99),
            Err(InterpreterError::ThresholdOutOfRange { name: "min_decrease_probability", .. })
        ));
    }

    #[test]
    fn requires_exactly_two_values() {
        let i = Probability::new(0.6, 0.6).unwrap();
        assert_eq!(
            i.interpret(&[0.7]),
            Err(InterpreterError::InvalidProbabilities { received: 1 })
        );
        assert!(i.interpret(&[0.4, 0.3, 0.3]).is_err());
    }

    #[test]
    fn long_short_neutral() {
        let i = Probability::new(0.6, 0.7).unwrap();
        assert_eq!(i.interpret(&[0.65, 0.35]).unwrap(), Interpretation::long());
        assert_eq!(i.interpret(&[0.25, 0.75]).unwrap(), Interpretation::short());
        assert_eq!(i.interpret(&[0.35, 0.65]).unwrap(), Interpretation::neutral());
    }

    #[test]
    fn thresholds_are_inclusive() {
        let i = Probability::new(0.6, 0.7).unwrap();
        assert_eq!(i.interpret(&[0.6, 0.4]).unwrap(), Interpretation::long());
        assert_eq!(i.interpret(&[0.3, 0.7]).unwrap(), Interpretation::short());
    }

    #[test]
    fn up_wins_when_both_thresholds_met() {
        let i = Probability::new(0.55, 0.55).unwrap();
        assert_eq!(i.interpret(&[0.6, 0.6]).unwrap(), Interpretation::long());
    }
}
