use std::time::{Duration, Instant};

const REPORT_EVERY_FRAMES: usize = 120;

pub struct Clock {
    instant: Instant,
    last_update: Duration,
    current_delta: Duration,
    frame: usize,
    paused: bool,
    /// Simulation time, stands still while paused.
    sim_elapsed: f32,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            instant: Instant::now(),
            last_update: Duration::ZERO,
            current_delta: Duration::ZERO,
            frame: 0,
            paused: false,
            sim_elapsed: 0.,
        }
    }

    pub fn update(&mut self) {
        let now = self.instant.elapsed();
        self.current_delta = now - self.last_update;
        self.last_update = now;
        self.advance(self.current_delta.as_secs_f32());

        if self.frame % REPORT_EVERY_FRAMES == 0 && self.delta_sec() > 0. {
            log::info!(
                "fps: {:.0}, frame time: {:.2} ms",
                1. / self.delta_sec(),
                self.delta_sec() * 1000.
            );
        }
    }

    fn advance(&mut self, delta_sec: f32) {
        self.frame += 1;

        if !self.paused {
            self.sim_elapsed += delta_sec;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!("simulation paused: {}", self.paused);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn delta(&self) -> Duration {
        self.current_delta
    }

    pub fn delta_sec(&self) -> f32 {
        self.current_delta.as_secs_f32()
    }

    /// Delta handed to the simulation, zero while paused.
    pub fn sim_delta_sec(&self) -> f32 {
        if self.paused {
            0.
        } else {
            self.delta_sec()
        }
    }

    pub fn sim_elapsed_sec(&self) -> f32 {
        self.sim_elapsed
    }

    pub fn elapsed_sec(&self) -> f32 {
        self.instant.elapsed().as_secs_f32()
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}
