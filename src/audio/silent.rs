use tokio::time::Instant;

use crate::audio::graph::{AudioDestination, BusVoice, DestinationClock, MixBus};
use crate::foundation::error::ReelResult;

/// Realtime destination that produces no sound.
///
/// Used for headless previews: the mix keeps its wall-clock timing and narration-end
/// notification, but nothing reaches an output device.
#[derive(Debug)]
pub struct SilentDestination {
    epoch: Instant,
}

impl SilentDestination {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SilentDestination {
    fn default() -> Self {
        Self::new()
    }
}

struct SilentVoice;

impl BusVoice for SilentVoice {
    fn start(&mut self, _at: f64) -> ReelResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

impl AudioDestination for SilentDestination {
    fn clock(&self) -> DestinationClock {
        DestinationClock::Realtime
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn connect(&mut self, bus: MixBus) -> ReelResult<Box<dyn BusVoice>> {
        tracing::debug!(kind = ?bus.kind, gain = bus.gain, "silent bus connected");
        Ok(Box::new(SilentVoice))
    }
}
