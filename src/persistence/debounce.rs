//! Debounced save timer

/// Fires once `delay_ms` after the most recent mutation
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    delay_ms: u64,
    due_at_ms: Option<u64>,
}

impl SaveDebouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            due_at_ms: None,
        }
    }

    /// Record a mutation, pushing the save back
    pub fn mark_dirty(&mut self, now_ms: u64) {
        self.due_at_ms = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.due_at_ms.is_some()
    }

    /// True exactly once when the quiet period has elapsed
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.due_at_ms {
            Some(due) if now_ms >= due => {
                self.due_at_ms = None;
                true
            }
            _ => false,
        }
    }

    /// Drop a pending save (e.g. after an explicit flush)
    pub fn cancel(&mut self) {
        self.due_at_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_resets_on_mutation() {
        let mut saver = SaveDebouncer::new(2_000);
        assert!(!saver.poll(10_000));

        saver.mark_dirty(0);
        assert!(!saver.poll(1_500));
        saver.mark_dirty(1_500);
        assert!(!saver.poll(3_000));
        assert!(saver.poll(3_500));
        // Fires once
        assert!(!saver.poll(4_000));
        assert!(!saver.is_pending());
    }

    #[test]
    fn test_cancel() {
        let mut saver = SaveDebouncer::new(100);
        saver.mark_dirty(0);
        saver.cancel();
        assert!(!saver.poll(1_000));
    }
}
