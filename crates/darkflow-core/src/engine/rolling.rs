use std::collections::VecDeque;

/// Trailing simple mean over at most `window` values.
///
/// Before the window fills, the mean covers however many values were pushed,
/// so the first row averages over itself.
#[derive(Debug, Clone)]
pub struct TrailingMean {
    values: VecDeque<f64>,
    window: usize,
    sum: f64,
}

impl TrailingMean {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            values: VecDeque::with_capacity(window),
            window,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.window {
            if let Some(removed) = self.values.pop_front() {
                self.sum -= removed;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        // Re-summing the window avoids drift from the running sum.
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }
}

/// Mean of the last `window` values of `values` (all of them when shorter).
pub fn tail_mean(values: &[f64], window: usize) -> Option<f64> {
    let window = window.max(1);
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        return None;
    }
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_partial_window_from_the_first_value() {
        let mut mean = TrailingMean::new(3);
        assert_eq!(mean.mean(), None);

        mean.push(10.0);
        assert_eq!(mean.mean(), Some(10.0));
        mean.push(20.0);
        assert_eq!(mean.mean(), Some(15.0));
        mean.push(30.0);
        assert!(mean.is_full());
        assert_eq!(mean.mean(), Some(20.0));
    }

    #[test]
    fn drops_the_oldest_value_once_full() {
        let mut mean = TrailingMean::new(2);
        for value in [1.0, 2.0, 3.0, 4.0] {
            mean.push(value);
        }
        assert_eq!(mean.len(), 2);
        assert_eq!(mean.mean(), Some(3.5));
    }

    #[test]
    fn tail_mean_uses_everything_when_short() {
        assert_eq!(tail_mean(&[2.0, 4.0], 10), Some(3.0));
        assert_eq!(tail_mean(&[1.0, 2.0, 3.0, 5.0], 2), Some(4.0));
        assert_eq!(tail_mean(&[], 10), None);
    }
}
