use std::collections::VecDeque;

use super::types::PowerSample;

/// Fixed-capacity rolling power history, oldest first.
///
/// Pushing beyond capacity evicts the oldest samples.
#[derive(Debug, Clone)]
pub struct PowerHistory {
    capacity: usize,
    samples: VecDeque<PowerSample>,
}

impl PowerHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends the newest sample and trims to capacity.
    pub fn push(&mut self, sample: PowerSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&PowerSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PowerSample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<PowerSample> {
        self.samples.iter().copied().collect()
    }
}
