use tokio::time::{Duration, Instant};

/// Holds the latest value until `window` passes with no newer one.
///
/// The owner polls [`Debouncer::deadline`] from its select loop and calls
/// [`Debouncer::fire`] once it elapses. Rescheduling or cancelling drops the
/// previous value, so a torn-down owner never fires.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    /// Idle debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the window.
    pub fn schedule(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.window, value));
    }

    /// Drops the pending value.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    /// When the pending value fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    /// A value is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the value if its deadline has passed.
    pub fn fire(&mut self) -> Option<T> {
        match &self.pending {
            Some((at, _)) if *at <= Instant::now() => self.cancel(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_the_last_value_fires() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        d.schedule("a");
        tokio::time::sleep(Duration::from_millis(300)).await;
        d.schedule("ac");
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(d.fire(), None);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(d.fire(), Some("ac"));
        assert!(!d.is_pending());
        assert_eq!(d.fire(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_value_never_fires() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.schedule(1);
        assert_eq!(d.cancel(), Some(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(d.fire(), None);
        assert_eq!(d.deadline(), None);
    }
}
