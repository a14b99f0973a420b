use std::sync::Mutex;

use crate::errors::Result;
use crate::model::ClassifiedReading;

/// The opaque training collaborator: hand it the most recent classified
/// samples, get back how many it now holds.
pub trait Trainer: Send + Sync {
    fn retrain(&self, samples: &[ClassifiedReading]) -> Result<usize>;
}

/// Keeps a bounded window of reference samples. Retraining replaces the
/// window with the newest samples that fit.
pub struct BaselineTrainer {
    capacity: usize,
    samples: Mutex<Vec<ClassifiedReading>>,
}

impl BaselineTrainer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Mutex::new(Vec::new()),
        }
    }
}

impl Trainer for BaselineTrainer {
    fn retrain(&self, samples: &[ClassifiedReading]) -> Result<usize> {
        let mut held = self.samples.lock().unwrap();
        let skip = samples.len().saturating_sub(self.capacity);
        held.clear();
        held.extend_from_slice(&samples[skip..]);
        Ok(held.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Reading, Status};

    fn sample(ts: i64) -> ClassifiedReading {
        ClassifiedReading {
            reading: Reading {
                smoke: 50,
                temperature: 25.0,
                humidity: 40.0,
                timestamp: ts,
            },
            status: Status::Safe,
        }
    }

    #[test]
    fn retrain_reports_held_count() {
        let trainer = BaselineTrainer::new(100);
        let samples: Vec<_> = (0..5).map(sample).collect();
        assert_eq!(trainer.retrain(&samples).unwrap(), 5);
    }

    #[test]
    fn retrain_replaces_the_previous_window() {
        let trainer = BaselineTrainer::new(100);
        trainer.retrain(&(0..5).map(sample).collect::<Vec<_>>()).unwrap();
        assert_eq!(trainer.retrain(&[sample(9)]).unwrap(), 1);
    }

    #[test]
    fn window_is_capped_at_capacity_keeping_newest() {
        let trainer = BaselineTrainer::new(3);
        let samples: Vec<_> = (0..10).map(sample).collect();
        assert_eq!(trainer.retrain(&samples).unwrap(), 3);
        assert_eq!(trainer.samples.lock().unwrap()[0].reading.timestamp, 7);
    }
}
