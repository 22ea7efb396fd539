use std::time::{Duration, Instant};

/// Quiet period after the last away-from-bottom sample before follow mode
/// re-arms on its own.
pub const FOLLOW_REARM_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// Tolerance for fractional scroll positions reported by the view.
const AT_BOTTOM_EPSILON: f32 = 0.5;

/// One scroll-position sample reported by the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub top: f32,
    pub viewport_height: f32,
    pub content_height: f32,
}

impl ScrollSample {
    pub fn new(top: f32, viewport_height: f32, content_height: f32) -> Self {
        Self {
            top,
            viewport_height,
            content_height,
        }
    }

    /// True when the visible window reaches the end of the content.
    pub fn is_at_bottom(&self) -> bool {
        self.top + self.viewport_height + AT_BOTTOM_EPSILON >= self.content_height
    }
}

/// The two states of the auto-scroll heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowState {
    /// Every log mutation drags the view to the newest entry.
    #[default]
    Following,
    /// The user is inspecting older content; mutations leave the view alone.
    Reviewing,
}

/// Decides, on each log mutation, whether the view should jump to the tail.
///
/// The clock is injected by the caller so the re-arm deadline is testable.
/// This is a heuristic, not a guarantee: each mutation independently consults
/// the current state, so a user who starts scrolling mid-reveal is respected
/// on the very next tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollFollow {
    state: FollowState,
    rearm_deadline: Option<Instant>,
}

impl ScrollFollow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    /// Folds one scroll sample into the state machine. A bottom sample resumes
    /// following immediately; an away sample pauses it and restarts the quiet
    /// period.
    pub fn observe_sample(&mut self, sample: ScrollSample, now: Instant) {
        if sample.is_at_bottom() {
            self.state = FollowState::Following;
            self.rearm_deadline = None;
        } else {
            self.state = FollowState::Reviewing;
            self.rearm_deadline = Some(now + FOLLOW_REARM_QUIET_PERIOD);
        }
    }

    /// Consulted on every log mutation; true means scroll-to-bottom now.
    /// An elapsed quiet period promotes `Reviewing` back to `Following`.
    pub fn should_follow(&mut self, now: Instant) -> bool {
        if self.state == FollowState::Reviewing
            && self
                .rearm_deadline
                .is_some_and(|deadline| now >= deadline)
        {
            self.state = FollowState::Following;
            self.rearm_deadline = None;
        }

        self.state == FollowState::Following
    }

    pub fn reset(&mut self) {
        self.state = FollowState::Following;
        self.rearm_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn away_sample() -> ScrollSample {
        ScrollSample::new(10.0, 300.0, 900.0)
    }

    fn bottom_sample() -> ScrollSample {
        ScrollSample::new(600.0, 300.0, 900.0)
    }

    #[test]
    fn mutations_while_following_always_scroll_to_the_tail() {
        let mut follow = ScrollFollow::new();
        let now = Instant::now();

        for _ in 0..10 {
            assert!(follow.should_follow(now));
        }
    }

    #[test]
    fn away_from_bottom_sample_pauses_following() {
        let mut follow = ScrollFollow::new();
        let now = Instant::now();

        follow.observe_sample(away_sample(), now);

        assert_eq!(follow.state(), FollowState::Reviewing);
        assert!(!follow.should_follow(now));
        assert!(!follow.should_follow(now + Duration::from_millis(500)));
    }

    #[test]
    fn bottom_sample_resumes_following_immediately() {
        let mut follow = ScrollFollow::new();
        let now = Instant::now();

        follow.observe_sample(away_sample(), now);
        follow.observe_sample(bottom_sample(), now);

        assert!(follow.should_follow(now));
    }

    #[test]
    fn quiet_period_rearms_following_after_the_deadline() {
        let mut follow = ScrollFollow::new();
        let now = Instant::now();

        follow.observe_sample(away_sample(), now);

        assert!(!follow.should_follow(now + FOLLOW_REARM_QUIET_PERIOD - Duration::from_millis(1)));
        assert!(follow.should_follow(now + FOLLOW_REARM_QUIET_PERIOD));
        assert_eq!(follow.state(), FollowState::Following);
    }

    #[test]
    fn each_away_sample_restarts_the_quiet_period() {
        let mut follow = ScrollFollow::new();
        let start = Instant::now();

        follow.observe_sample(away_sample(), start);
        let later = start + Duration::from_millis(1000);
        follow.observe_sample(away_sample(), later);

        // The first deadline has passed, but the second sample pushed it out.
        assert!(!follow.should_follow(start + FOLLOW_REARM_QUIET_PERIOD));
        assert!(follow.should_follow(later + FOLLOW_REARM_QUIET_PERIOD));
    }

    #[test]
    fn exact_bottom_position_counts_as_at_bottom() {
        assert!(ScrollSample::new(600.0, 300.0, 900.0).is_at_bottom());
        assert!(!ScrollSample::new(598.0, 300.0, 900.0).is_at_bottom());
        // An empty view is trivially at the bottom.
        assert!(ScrollSample::new(0.0, 300.0, 0.0).is_at_bottom());
    }
}
