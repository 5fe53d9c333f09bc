//! Renderer-side consumers of the per-tick position buffer

use std::time::{Duration, Instant};

/// Receives the position buffer once per tick
///
/// `bytes` is `particle_count * 16` long: x, y, z, w as native-endian f32 quads.
pub trait FrameSink {
    fn upload(&mut self, bytes: &[u8]);
}

/// Sink that only counts what it was given
#[derive(Debug, Default)]
pub struct UploadStats {
    pub frames: u64,
    pub bytes: u64,
}

impl FrameSink for UploadStats {
    fn upload(&mut self, bytes: &[u8]) {
        self.frames += 1;
        self.bytes += bytes.len() as u64;
    }
}

/// Frames-per-second counter reported once per second
pub struct FpsCounter {
    prefix: &'static str,
    frames: u32,
    window_start: Instant,
    window: Duration,
}

impl FpsCounter {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            frames: 0,
            window_start: Instant::now(),
            window: Duration::from_secs(1),
        }
    }

    /// Count a frame; returns a title line when a full second has passed
    pub fn frame(&mut self) -> Option<String> {
        self.frame_at(Instant::now())
    }

    fn frame_at(&mut self, now: Instant) -> Option<String> {
        self.frames += 1;
        if now.duration_since(self.window_start) < self.window {
            return None;
        }

        let title = format!("{} | FPS: {}", self.prefix, self.frames);
        self.frames = 0;
        self.window_start = now;
        Some(title)
    }
}
