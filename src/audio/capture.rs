use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::graph::{AudioDestination, BusVoice, DestinationClock, MixBus};
use crate::audio::mix::{ScheduledBus, mix_buses};
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Debug)]
struct CapturedBus {
    bus: MixBus,
    start_sec: Option<f64>,
    stopped: bool,
}

/// Capture-oriented destination: records the connected buses and renders them offline into
/// one PCM track that is muxed with the exported frames.
///
/// Time zero of this destination is the first output frame.
#[derive(Debug, Clone)]
pub struct CaptureDestination {
    sample_rate: u32,
    channels: u16,
    buses: Arc<Mutex<Vec<CapturedBus>>>,
}

impl CaptureDestination {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            buses: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of buses that were started and not yet stopped.
    pub fn live_buses(&self) -> usize {
        lock(&self.buses)
            .iter()
            .filter(|b| b.start_sec.is_some() && !b.stopped)
            .count()
    }

    /// Render `total_frames` sample frames of the started buses as interleaved PCM.
    pub fn render(&self, total_frames: u64) -> Vec<f32> {
        let scheduled: Vec<ScheduledBus> = lock(&self.buses)
            .iter()
            .filter_map(|b| {
                b.start_sec.map(|start_sec| ScheduledBus {
                    bus: b.bus.clone(),
                    start_sec,
                })
            })
            .collect();
        mix_buses(&scheduled, self.sample_rate, self.channels, total_frames)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AudioDestination for CaptureDestination {
    fn clock(&self) -> DestinationClock {
        DestinationClock::Offline
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn connect(&mut self, bus: MixBus) -> ReelResult<Box<dyn BusVoice>> {
        let mut buses = lock(&self.buses);
        buses.push(CapturedBus {
            bus,
            start_sec: None,
            stopped: false,
        });
        Ok(Box::new(CaptureVoice {
            buses: self.buses.clone(),
            index: buses.len() - 1,
        }))
    }
}

struct CaptureVoice {
    buses: Arc<Mutex<Vec<CapturedBus>>>,
    index: usize,
}

impl BusVoice for CaptureVoice {
    fn start(&mut self, at: f64) -> ReelResult<()> {
        let mut buses = lock(&self.buses);
        let b = &mut buses[self.index];
        if b.start_sec.is_some() {
            return Err(ReelError::mix_graph("capture voice already started"));
        }
        b.start_sec = Some(at);
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<()> {
        let mut buses = lock(&self.buses);
        let b = &mut buses[self.index];
        if b.stopped {
            return Err(ReelError::mix_graph("capture voice already stopped"));
        }
        b.stopped = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/capture.rs"]
mod tests;
