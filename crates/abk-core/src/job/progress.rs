//! Fractional progress with change notifications, cancellation and retry settings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const CHANNEL_CAPACITY: usize = 256;
const MAX_PRECISION: u32 = 15;

/// Emitted when the stored progress value actually changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressChanged {
    pub old: f64,
    pub new: f64,
}

/// Progress capability of a job.
///
/// The value is always in `[0.0, 1.0]` and rounded to `precision` decimal
/// digits. Subscribers see an event only when an update changes the stored
/// value; a subscriber that falls more than 256 events behind skips ahead.
#[derive(Debug)]
pub struct JobProgress {
    bits: AtomicU64,
    precision: u32,
    cancel: CancellationToken,
    max_attempts: u32,
    retry_delay: Duration,
    changed: broadcast::Sender<ProgressChanged>,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl JobProgress {
    pub const DEFAULT_PRECISION: u32 = 4;

    /// Zero progress, 4 digits, a fresh cancellation token, one attempt, no delay.
    pub fn new() -> Self {
        let (changed, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
            precision: Self::DEFAULT_PRECISION,
            cancel: CancellationToken::new(),
            max_attempts: 1,
            retry_delay: Duration::ZERO,
            changed,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision.min(MAX_PRECISION);
        self
    }

    /// Share a cancellation signal (typically a child of the parent job's token).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Attempts per execution (values below 1 are treated as 1) and the wait between them.
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    pub fn progress(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// `round(progress * 100)` as an integer percentage, ties to even.
    pub fn percent_complete(&self) -> u8 {
        (self.progress() * 100.0).round_ties_even() as u8
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Reset to 0 before a (re)run. Does not notify subscribers.
    pub fn initialize(&self) {
        self.bits.store(0f64.to_bits(), Ordering::Release);
    }

    /// Round (ties to even), clamp and store `value`; notify if it differs
    /// from the previous value.
    ///
    /// Returns whether the stored value changed. NaN is ignored.
    pub fn update(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let factor = 10f64.powi(self.precision as i32);
        let new = ((value * factor).round_ties_even() / factor).clamp(0.0, 1.0);
        let old = f64::from_bits(self.bits.swap(new.to_bits(), Ordering::AcqRel));
        if old == new {
            return false;
        }
        let _ = self.changed.send(ProgressChanged { old, new });
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressChanged> {
        self.changed.subscribe()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(rx: &mut broadcast::Receiver<ProgressChanged>) -> Vec<ProgressChanged> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty) => return out,
                Err(e) => panic!("unexpected receive error: {e}"),
            }
        }
    }

    #[test]
    fn same_value_does_not_notify() {
        let progress = JobProgress::new();
        progress.update(0.45);
        let mut rx = progress.subscribe();
        assert!(!progress.update(0.45));
        assert!(!progress.update(0.45));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn new_value_notifies_with_old_and_new() {
        let progress = JobProgress::new();
        progress.update(0.45);
        let mut rx = progress.subscribe();
        assert!(progress.update(0.55));
        assert_eq!(
            drain(&mut rx),
            vec![ProgressChanged {
                old: 0.45,
                new: 0.55
            }]
        );
        assert_eq!(progress.progress(), 0.55);
    }

    #[test]
    fn value_is_clamped_to_unit_interval() {
        let progress = JobProgress::new();
        progress.update(0.45);
        let mut rx = progress.subscribe();
        progress.update(2.0);
        assert_eq!(progress.progress(), 1.0);
        progress.update(-3.0);
        assert_eq!(progress.progress(), 0.0);
        assert_eq!(
            drain(&mut rx),
            vec![
                ProgressChanged {
                    old: 0.45,
                    new: 1.0
                },
                ProgressChanged { old: 1.0, new: 0.0 },
            ]
        );
    }

    #[test]
    fn value_is_rounded_to_precision() {
        let progress = JobProgress::new().with_precision(2);
        progress.update(0.123456);
        assert_eq!(progress.progress(), 0.12);
        let mut rx = progress.subscribe();
        // Rounds to the same stored value: no event.
        assert!(!progress.update(0.1249));
        assert!(drain(&mut rx).is_empty());

        let fine = JobProgress::new();
        fine.update(0.123456);
        assert_eq!(fine.progress(), 0.1235);
    }

    #[test]
    fn nan_is_ignored() {
        let progress = JobProgress::new();
        progress.update(0.3);
        assert!(!progress.update(f64::NAN));
        assert_eq!(progress.progress(), 0.3);
    }

    #[test]
    fn percent_complete_rounds_progress() {
        let progress = JobProgress::new();
        progress.update(0.4449);
        assert_eq!(progress.percent_complete(), 44);
        progress.update(0.446);
        assert_eq!(progress.percent_complete(), 45);
        progress.update(1.0);
        assert_eq!(progress.percent_complete(), 100);
    }

    #[test]
    fn exact_halves_round_to_even() {
        let progress = JobProgress::new().with_precision(2);
        progress.update(0.125);
        assert_eq!(progress.progress(), 0.12);
        progress.update(0.375);
        assert_eq!(progress.progress(), 0.38);

        let percent = JobProgress::new().with_precision(3);
        percent.update(0.125);
        assert_eq!(percent.percent_complete(), 12);
        percent.update(0.375);
        assert_eq!(percent.percent_complete(), 38);
    }

    #[test]
    fn percent_complete_is_monotonic_in_progress() {
        let progress = JobProgress::new();
        let mut last = 0;
        for i in 0..=1000 {
            progress.update(i as f64 / 1000.0);
            let pct = progress.percent_complete();
            assert!(pct >= last);
            last = pct;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn initialize_resets_silently() {
        let progress = JobProgress::new();
        progress.update(0.8);
        let mut rx = progress.subscribe();
        progress.initialize();
        assert_eq!(progress.progress(), 0.0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn defaults_are_single_attempt_without_delay() {
        let progress = JobProgress::default();
        assert_eq!(progress.max_attempts(), 1);
        assert_eq!(progress.retry_delay(), Duration::ZERO);
        assert_eq!(progress.precision(), JobProgress::DEFAULT_PRECISION);
        assert!(!progress.is_cancelled());
        progress.cancellation().cancel();
        assert!(progress.is_cancelled());
    }
}
