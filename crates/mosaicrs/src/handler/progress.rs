use serde::{Deserialize, Serialize};

/// Progress of the active step as a (current, total) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    pub current: usize,
    pub total: usize,
}

impl StepProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Fraction in `[0, 1]`; a step with no known total reports 0.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current.min(self.total) as f64) / (self.total as f64)
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.current >= self.total
    }
}

impl std::fmt::Display for StepProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}
