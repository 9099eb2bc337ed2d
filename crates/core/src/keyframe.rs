//! Startup keyframe schedule.
//!
//! Receivers that join late or lose the first keyframe need another one
//! soon. After the first encoded frame the scheduler asks for a keyframe at
//! +2 s and +4 s, then goes quiet for the rest of the stream.

/// Delay between the first encoded frame and each scheduled keyframe.
pub const KEYFRAME_INTERVAL_MS: u64 = 2000;

/// Number of scheduled keyframes before the scheduler stops.
pub const SCHEDULED_KEYFRAMES: u32 = 2;

/// Time-driven startup keyframe scheduler.
///
/// ```text
/// first_frame(T)          -> deadline = T + 2000
/// poll(now >= T + 2000)   -> fire #1, deadline = T + 4000
/// poll(now >= T + 4000)   -> fire #2, deadline cleared
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyframeScheduler {
    next_deadline: Option<u64>,
    firing_count: u32,
}

impl KeyframeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the schedule from the time the first frame was produced.
    pub fn first_frame(&mut self, now_ms: u64) {
        let deadline = now_ms.saturating_add(KEYFRAME_INTERVAL_MS);
        self.next_deadline = Some(deadline);
        tracing::debug!(deadline_ms = deadline, "keyframe schedule armed");
    }

    /// Called once per encode tick. Returns `true` when a keyframe is due.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(deadline) = self.next_deadline else {
            return false;
        };
        if now_ms < deadline {
            return false;
        }

        self.firing_count += 1;
        self.next_deadline = if self.firing_count < SCHEDULED_KEYFRAMES {
            Some(deadline.saturating_add(KEYFRAME_INTERVAL_MS))
        } else {
            None
        };
        tracing::debug!(
            now_ms,
            firing = self.firing_count,
            "scheduled keyframe due"
        );
        true
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.next_deadline
    }

    pub fn firing_count(&self) -> u32 {
        self.firing_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_before_first_frame() {
        let mut s = KeyframeScheduler::new();
        assert!(!s.poll(0));
        assert!(!s.poll(1_000_000));
        assert_eq!(s.firing_count(), 0);
    }

    #[test]
    fn fires_at_two_and_four_seconds_only() {
        const T: u64 = 10_000;
        let mut s = KeyframeScheduler::new();
        s.first_frame(T);

        let fired: Vec<u64> = (T..T + 20_000)
            .step_by(66)
            .filter(|&now| s.poll(now))
            .collect();

        // Ticks every 66 ms starting at T: first at or past +2000 is T+2046,
        // first at or past +4000 is T+4026.
        assert_eq!(fired, vec![T + 2046, T + 4026]);
        assert_eq!(s.firing_count(), 2);
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn exact_deadline_fires() {
        let mut s = KeyframeScheduler::new();
        s.first_frame(0);
        assert!(!s.poll(1999));
        assert!(s.poll(2000));
        assert_eq!(s.next_deadline(), Some(4000));
        assert!(s.poll(4000));
        assert!(!s.poll(6000));
    }

    #[test]
    fn second_deadline_is_relative_to_first() {
        let mut s = KeyframeScheduler::new();
        s.first_frame(0);
        // A late first tick still leaves the second deadline at T + 4000.
        assert!(s.poll(3900));
        assert!(!s.poll(3950));
        assert!(s.poll(4000));
    }

    #[test]
    fn one_firing_per_tick_when_far_behind() {
        let mut s = KeyframeScheduler::new();
        s.first_frame(0);
        assert!(s.poll(10_000));
        assert!(s.poll(10_000));
        assert!(!s.poll(10_000));
    }
}
