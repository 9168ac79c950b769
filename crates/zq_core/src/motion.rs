//! Frame-stepped motion curves for the textbox.
//!
//! Both types advance exactly one step per logic frame, so their timing is
//! fully determined by the fixed-step clock.

/// Per-frame pixel deltas of the textbox slide: small, then large, then small.
pub const DEFAULT_SLIDE_SCHEDULE: [i32; 14] = [1, 3, 6, 10, 15, 21, 54, 54, 21, 15, 10, 6, 3, 1];

/// Vertical bob of the "next" arrow, one entry per blink step.
pub const DEFAULT_ARROW_BLINK: [i32; 6] = [0, 1, 2, 3, 2, 1];

/// Frames each blink offset is held for.
pub const DEFAULT_ARROW_BLINK_FRAMES: u32 = 6;

/// Upper bound accepted for the blink hold, ten seconds at 60 Hz.
pub const MAX_ARROW_BLINK_FRAMES: u32 = 600;

/// A fixed schedule of pixel deltas with a reusable cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSchedule {
    deltas: Vec<i32>,
    cursor: usize,
}

impl SlideSchedule {
    pub fn new(deltas: Vec<i32>) -> Self {
        Self { deltas, cursor: 0 }
    }

    /// Rewind to the first delta.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Sum of every delta: the distance covered by one full slide.
    pub fn total(&self) -> i32 {
        self.deltas.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.deltas.len()
    }

    pub fn deltas(&self) -> &[i32] {
        &self.deltas
    }
}

impl Default for SlideSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDE_SCHEDULE.to_vec())
    }
}

impl Iterator for SlideSchedule {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let delta = self.deltas.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(delta)
    }
}

/// A looping sequence of offsets, each held for a fixed number of frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkCycle {
    offsets: Vec<i32>,
    frames_per_step: u32,
    frame: u32,
}

impl BlinkCycle {
    pub fn new(offsets: Vec<i32>, frames_per_step: u32) -> Self {
        Self {
            offsets,
            frames_per_step: frames_per_step.max(1),
            frame: 0,
        }
    }

    fn period(&self) -> u32 {
        u32::try_from(self.offsets.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.frames_per_step)
    }

    pub fn tick(&mut self) {
        let period = self.period();
        if period > 0 {
            self.frame = (self.frame + 1) % period;
        }
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    /// Offset for the current frame; zero for an empty cycle.
    pub fn offset(&self) -> i32 {
        let step = (self.frame / self.frames_per_step) as usize;
        self.offsets.get(step).copied().unwrap_or(0)
    }
}

impl Default for BlinkCycle {
    fn default() -> Self {
        Self::new(DEFAULT_ARROW_BLINK.to_vec(), DEFAULT_ARROW_BLINK_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_covers_216_pixels() {
        let schedule = SlideSchedule::default();
        assert_eq!(schedule.total(), 216);
        assert_eq!(schedule.len(), 14);
    }

    #[test]
    fn schedule_yields_each_delta_once_then_stops() {
        let mut schedule = SlideSchedule::new(vec![2, 5, 1]);
        assert_eq!(schedule.next(), Some(2));
        assert_eq!(schedule.next(), Some(5));
        assert_eq!(schedule.next(), Some(1));
        assert!(schedule.is_exhausted());
        assert_eq!(schedule.next(), None);
        assert_eq!(schedule.next(), None);
    }

    #[test]
    fn reset_makes_schedule_reusable() {
        let mut schedule = SlideSchedule::default();
        let first: i32 = schedule.by_ref().sum();
        schedule.reset();
        let second: i32 = schedule.by_ref().sum();
        assert_eq!(first, 216);
        assert_eq!(second, 216);
    }

    #[test]
    fn empty_schedule_is_exhausted_immediately() {
        let mut schedule = SlideSchedule::new(Vec::new());
        assert!(schedule.is_empty());
        assert!(schedule.is_exhausted());
        assert_eq!(schedule.next(), None);
    }

    #[test]
    fn blink_holds_each_offset_for_its_frame_count() {
        let mut blink = BlinkCycle::new(vec![0, 4], 2);
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(blink.offset());
            blink.tick();
        }
        assert_eq!(seen, vec![0, 0, 4, 4, 0, 0]);
    }

    #[test]
    fn blink_reset_returns_to_first_offset() {
        let mut blink = BlinkCycle::default();
        for _ in 0..13 {
            blink.tick();
        }
        assert_ne!(blink.offset(), 0);
        blink.reset();
        assert_eq!(blink.offset(), 0);
    }

    #[test]
    fn empty_blink_is_stationary() {
        let mut blink = BlinkCycle::new(Vec::new(), 3);
        blink.tick();
        assert_eq!(blink.offset(), 0);
    }

    #[test]
    fn blink_with_huge_hold_does_not_overflow() {
        let mut blink = BlinkCycle::new(vec![0, 1, 2, 3, 2, 1], u32::MAX);
        for _ in 0..10 {
            blink.tick();
        }
        assert_eq!(blink.offset(), 0);
    }
}
