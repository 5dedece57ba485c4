//! Host video surface.
//!
//! The engine never owns a decoder; it reads and drives playback through
//! this capability, which the host constructs once and passes in.

/// Seconds skipped by the arrow-key seek shortcuts.
pub const SEEK_STEP_SECS: f64 = 5.0;

/// Playback controls the engine needs from the host.
pub trait VideoSurface {
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    /// Length of the video in seconds (0 while unknown).
    fn duration(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    /// Jump to `seconds`; the caller clamps to the valid range.
    fn seek(&mut self, seconds: f64);

    /// Pause if currently playing.
    fn pause_if_playing(&mut self) {
        if !self.is_paused() {
            self.pause();
        }
    }

    fn toggle_playback(&mut self) {
        if self.is_paused() {
            self.play();
        } else {
            self.pause();
        }
    }

    /// Seek by `delta` seconds, clamped to `[0, duration]`.
    fn seek_by(&mut self, delta: f64) {
        let target = (self.current_time() + delta).clamp(0.0, self.duration().max(0.0));
        self.seek(target);
    }
}

/// In-process playback clock for headless hosts and tests.
///
/// Time only moves when the host calls [`PlaybackClock::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    position: f64,
    duration: f64,
    paused: bool,
}

impl PlaybackClock {
    /// A paused clock at 0 s.
    pub fn new(duration: f64) -> Self {
        Self {
            position: 0.0,
            duration,
            paused: true,
        }
    }

    /// Move the playhead forward by `secs` if playing. Stops at the end.
    pub fn advance(&mut self, secs: f64) {
        if self.paused {
            return;
        }
        self.position = (self.position + secs).min(self.duration);
        if self.position >= self.duration {
            self.paused = true;
        }
    }
}

impl VideoSurface for PlaybackClock {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_only_while_playing() {
        let mut clock = PlaybackClock::new(10.0);
        clock.advance(1.0);
        assert_eq!(clock.current_time(), 0.0);

        clock.play();
        clock.advance(1.5);
        assert_eq!(clock.current_time(), 1.5);
    }

    #[test]
    fn test_stops_at_end() {
        let mut clock = PlaybackClock::new(2.0);
        clock.play();
        clock.advance(5.0);
        assert_eq!(clock.current_time(), 2.0);
        assert!(clock.is_paused());
    }

    #[test]
    fn test_seek_by_clamps() {
        let mut clock = PlaybackClock::new(8.0);
        clock.seek_by(SEEK_STEP_SECS);
        clock.seek_by(SEEK_STEP_SECS);
        assert_eq!(clock.current_time(), 8.0);
        clock.seek_by(-3.0 * SEEK_STEP_SECS);
        assert_eq!(clock.current_time(), 0.0);
    }

    #[test]
    fn test_pause_if_playing() {
        let mut clock = PlaybackClock::new(8.0);
        clock.play();
        clock.pause_if_playing();
        assert!(clock.is_paused());
        clock.toggle_playback();
        assert!(!clock.is_paused());
    }
}
