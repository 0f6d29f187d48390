use std::time::{Duration, Instant};

/// Quiescence window shared by the post-draw cooldown and the trailing draw.
pub const REDRAW_WINDOW: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedrawDecision {
    /// Nothing in flight: draw right now.
    DrawNow,
    /// A trailing draw was scheduled for this instant.
    Deferred(Instant),
    /// A trailing draw is already queued and will cover this request.
    Coalesced,
}

/// Leading-edge redraw with one coalesced trailing redraw.
///
/// Time is passed in by the caller, so the scheduler holds no timers of its
/// own; drivers call [`RedrawScheduler::poll`] when the deadline returned by
/// [`RedrawScheduler::next_deadline`] passes.
#[derive(Clone, Debug)]
pub struct RedrawScheduler {
    window: Duration,
    cooldown_until: Option<Instant>,
    trailing_at: Option<Instant>,
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(REDRAW_WINDOW)
    }
}

impl RedrawScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            cooldown_until: None,
            trailing_at: None,
        }
    }

    fn expire(&mut self, now: Instant) {
        if self.cooldown_until.is_some_and(|until| now >= until) {
            self.cooldown_until = None;
        }
    }

    pub fn request(&mut self, now: Instant) -> RedrawDecision {
        self.expire(now);
        if self.cooldown_until.is_none() {
            self.cooldown_until = Some(now + self.window);
            return RedrawDecision::DrawNow;
        }
        if self.trailing_at.is_none() {
            let at = now + self.window;
            self.trailing_at = Some(at);
            return RedrawDecision::Deferred(at);
        }
        RedrawDecision::Coalesced
    }

    /// Returns true when the queued trailing draw is due; the caller draws.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.expire(now);
        match self.trailing_at {
            Some(at) if now >= at => {
                self.trailing_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.trailing_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_draws_immediately() {
        let mut s = RedrawScheduler::default();
        assert_eq!(s.request(Instant::now()), RedrawDecision::DrawNow);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn burst_collapses_into_one_trailing_draw() {
        let t0 = Instant::now();
        let mut s = RedrawScheduler::default();
        assert_eq!(s.request(t0), RedrawDecision::DrawNow);
        let second = s.request(t0 + Duration::from_millis(10));
        assert_eq!(second, RedrawDecision::Deferred(t0 + Duration::from_millis(110)));
        assert_eq!(s.request(t0 + Duration::from_millis(20)), RedrawDecision::Coalesced);
        assert_eq!(s.request(t0 + Duration::from_millis(50)), RedrawDecision::Coalesced);

        assert!(!s.poll(t0 + Duration::from_millis(60)));
        assert!(s.poll(t0 + Duration::from_millis(110)));
        assert!(!s.poll(t0 + Duration::from_millis(120)));
    }

    #[test]
    fn cooldown_expires_after_window() {
        let t0 = Instant::now();
        let mut s = RedrawScheduler::default();
        s.request(t0);
        assert_eq!(
            s.request(t0 + REDRAW_WINDOW),
            RedrawDecision::DrawNow
        );
    }

    #[test]
    fn trailing_draw_does_not_restart_cooldown() {
        let t0 = Instant::now();
        let mut s = RedrawScheduler::default();
        s.request(t0);
        s.request(t0 + Duration::from_millis(90));
        assert!(s.poll(t0 + Duration::from_millis(190)));
        assert_eq!(
            s.request(t0 + Duration::from_millis(191)),
            RedrawDecision::DrawNow
        );
    }
}
