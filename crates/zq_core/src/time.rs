//! Fixed-rate frame clock.
//!
//! Wall-clock time feeds an accumulator that is drained in `fixed_dt` slices;
//! every slice is one logic step of the textbox. Drawing happens once per
//! redraw regardless of how many steps ran.

use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Target logic rate of the game loop.
pub const TARGET_FPS: u32 = 60;

pub struct FrameClock {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        let fixed_dt = 1.0 / f64::from(fps.max(1));
        Self {
            fixed_dt,
            max_accumulator: 0.25,
            accumulator: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [fixed_dt; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: f64::from(fps.max(1)),
            smoothed_frame_time_ms: fixed_dt * 1000.0,
        }
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.feed(real_dt);
    }

    /// Account for `real_dt` seconds of wall-clock time.
    pub fn feed(&mut self, real_dt: f64) {
        self.real_dt = real_dt;

        // Spiral-of-death cap
        if self.real_dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                self.real_dt * 1000.0,
                self.max_accumulator * 1000.0
            );
            self.real_dt = self.max_accumulator;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(TARGET_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut FrameClock) -> u32 {
        let mut steps = 0;
        while clock.should_step() {
            steps += 1;
        }
        steps
    }

    #[test]
    fn one_fixed_slice_runs_one_step() {
        let mut clock = FrameClock::new(60);
        clock.feed(1.0 / 60.0 + 1e-9);
        assert_eq!(drain(&mut clock), 1);
        assert_eq!(clock.steps_this_frame, 1);
    }

    #[test]
    fn short_frames_accumulate_until_a_step_is_due() {
        let mut clock = FrameClock::new(60);
        clock.feed(0.005);
        assert_eq!(drain(&mut clock), 0);
        clock.feed(0.005);
        assert_eq!(drain(&mut clock), 0);
        clock.feed(0.007);
        assert_eq!(drain(&mut clock), 1);
        assert_eq!(clock.fixed_step_count, 1);
    }

    #[test]
    fn long_frame_is_capped() {
        let mut clock = FrameClock::new(8);
        clock.feed(5.0);
        assert!((clock.real_dt - 0.25).abs() < f64::EPSILON);
        assert_eq!(drain(&mut clock), 2);
    }

    #[test]
    fn steps_this_frame_resets_each_frame() {
        let mut clock = FrameClock::new(30);
        clock.feed(0.11);
        assert_eq!(drain(&mut clock), 3);
        clock.feed(0.0);
        assert_eq!(clock.steps_this_frame, 0);
        assert_eq!(clock.frame_count, 2);
    }

    #[test]
    fn zero_fps_is_clamped() {
        let clock = FrameClock::new(0);
        assert!((clock.fixed_dt - 1.0).abs() < f64::EPSILON);
    }
}
