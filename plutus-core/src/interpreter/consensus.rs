//! Consensus interpreter: votes from sub-models.

use serde::{Deserialize, Serialize};

use super::{Interpretation, InterpreterError};
use crate::domain::Signal;
use crate::numbers::percentage_out_of_total;

/// Share of the votes `min_consensus` must represent, in percent.
pub const MIN_MAJORITY_PERCENT: f64 = 51.0;

/// Emits a signal when at least `min_consensus` votes agree.
///
/// Built through `for_votes`, `min_consensus` is a strict majority of the
/// vote count, so long and short consensus can never both be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub min_consensus: usize,
}

impl Consensus {
    pub fn new(min_consensus: usize) -> Result<Self, InterpreterError> {
        let interpreter = Self { min_consensus };
        interpreter.validate()?;
        Ok(interpreter)
    }

    /// Build an interpreter for a fixed number of voters.
    pub fn for_votes(min_consensus: usize, total: usize) -> Result<Self, InterpreterError> {
        let interpreter = Self::new(min_consensus)?;
        interpreter.validate_votes(total)?;
        Ok(interpreter)
    }

    /// Check that `min_consensus` is a strict majority of `total` voters.
    pub fn validate_votes(&self, total: usize) -> Result<(), InterpreterError> {
        if total < 2 {
            return Err(InterpreterError::TooFewVotes(total));
        }
        let min_consensus = self.min_consensus;
        if min_consensus > total
            || percentage_out_of_total(min_consensus as f64, total as f64) < MIN_MAJORITY_PERCENT
        {
            return Err(InterpreterError::NoMajority {
                min_consensus,
                total,
            });
        }
        Ok(())
    }

    /// Only checks `min_consensus >= 1`; the majority rule needs the vote
    /// count and lives in `validate_votes`.
    pub fn validate(&self) -> Result<(), InterpreterError> {
        if self.min_consensus < 1 {
            return Err(InterpreterError::ThresholdTooLow {
                name: "min_consensus",
                value: self.min_consensus as f64,
                min: 1.0,
            });
        }
        Ok(())
    }

    pub fn interpret(&self, votes: &[Signal]) -> Interpretation {
        let longs = votes.iter().filter(|v| **v == Signal::Long).count();
        let shorts = votes.iter().filter(|v| **v == Signal::Short).count();
        if longs >= self.min_consensus {
            Interpretation::long()
        } else if shorts >= self.min_consensus {
            Interpretation::short()
        } else {
            Interpretation::neutral()
        }
    }
}
