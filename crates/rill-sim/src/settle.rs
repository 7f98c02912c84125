//! Settle detection: the liquid counts as settled once no step has changed
//! anything for longer than a threshold.

/// Tracks the time of the last changing step.
#[derive(Clone, Debug)]
pub struct SettleTracker {
    threshold: f64,
    last_change: Option<f64>,
    settled: bool,
}

impl SettleTracker {
    /// `threshold` is in the same time unit the caller passes to
    /// [`record`](Self::record) (seconds everywhere in this workspace).
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_change: None,
            settled: false,
        }
    }

    /// Records the result of a step taken at time `now` and returns the new
    /// settled state.
    ///
    /// The first step without a recorded change starts the quiet period.
    pub fn record(&mut self, changed: bool, now: f64) -> bool {
        if changed {
            self.last_change = Some(now);
            self.settled = false;
        } else {
            let since = now - *self.last_change.get_or_insert(now);
            if since > self.threshold {
                self.settled = true;
            }
        }
        self.settled
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}
