/// Timer primitives for the event-driven engine. Both are driven by an
/// explicit `now` in seconds so callers own the clock.

pub const FRAME_INTERVAL: f64 = 1.0 / 60.0;
pub const RESIZE_DEBOUNCE: f64 = 0.15;
pub const ZOOM_SETTLE_DEBOUNCE: f64 = 0.15;

/// Leading-edge-plus-trailing throttle: `request` runs at most once per
/// frame interval and arms a trailing run for bursts that got suppressed.
#[derive(Debug, Default)]
pub struct FrameThrottle {
    last_run: Option<f64>,
    trailing: bool,
}

impl FrameThrottle {
    pub fn request(&mut self, now: f64) -> bool {
        match self.last_run {
            Some(last) if now - last < FRAME_INTERVAL => {
                self.trailing = true;
                false
            }
            _ => {
                self.last_run = Some(now);
                true
            }
        }
    }

    pub fn poll(&mut self, now: f64) -> bool {
        if self.trailing && self.last_run.is_none_or(|last| now - last >= FRAME_INTERVAL) {
            self.trailing = false;
            self.last_run = Some(now);
            return true;
        }
        false
    }

    pub fn note_run(&mut self, now: f64) {
        self.last_run = Some(now);
        self.trailing = false;
    }
}

/// Collapses a burst of events into one firing after a quiet period.
#[derive(Debug, Default)]
pub struct Debouncer {
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn bump(&mut self, now: f64, delay: f64) {
        self.deadline = Some(now + delay);
    }

    pub fn fire(&mut self, now: f64) -> bool {
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            self.deadline = None;
            return true;
        }
        false
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
