/// Holds the most recent value until the next display refresh.
///
/// Values offered between two refreshes replace each other; only the latest
/// one is published. A refresh is requested only when none is pending.
#[derive(Debug)]
pub struct FrameCoalescer<T> {
    slot: Option<T>,
    pending: bool,
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self {
            slot: None,
            pending: false,
        }
    }
}

impl<T> FrameCoalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`. Returns `true` when the caller has to schedule a refresh.
    pub fn offer(&mut self, value: T) -> bool {
        self.slot = Some(value);
        if self.pending {
            false
        } else {
            self.pending = true;
            true
        }
    }

    /// Run the refresh: hand out the latest value and clear the pending flag.
    pub fn take(&mut self) -> Option<T> {
        self.pending = false;
        self.slot.take()
    }

    pub fn cancel(&mut self) {
        self.pending = false;
        self.slot = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_value_wins() {
        let mut frames = FrameCoalescer::new();
        assert!(frames.offer(1));
        assert!(!frames.offer(2));
        assert!(!frames.offer(3));
        assert!(frames.is_pending());
        assert_eq!(frames.take(), Some(3));
        assert!(!frames.is_pending());
        assert_eq!(frames.take(), None);
    }

    #[test]
    fn test_new_refresh_after_take() {
        let mut frames = FrameCoalescer::new();
        assert!(frames.offer("a"));
        frames.take();
        assert!(frames.offer("b"));
    }

    #[test]
    fn test_cancel_drops_value() {
        let mut frames = FrameCoalescer::new();
        frames.offer(vec![1]);
        frames.cancel();
        assert!(!frames.is_pending());
        assert_eq!(frames.take(), None);
    }
}
