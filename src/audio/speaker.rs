use std::time::Instant;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::audio::graph::{AudioDestination, BusVoice, DestinationClock, MixBus};
use crate::foundation::error::{ReelError, ReelResult};

/// Default output device. One `rodio` sink per bus, volume set to the bus gain.
pub struct SpeakerDestination {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    epoch: Instant,
}

impl SpeakerDestination {
    pub fn open_default() -> ReelResult<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| ReelError::playback(format!("no audio output device: {e}")))?;
        Ok(Self {
            _stream: stream,
            handle,
            epoch: Instant::now(),
        })
    }
}

struct SpeakerVoice {
    sink: Sink,
    stopped: bool,
}

impl BusVoice for SpeakerVoice {
    fn start(&mut self, _at: f64) -> ReelResult<()> {
        self.sink.play();
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<()> {
        if self.stopped {
            return Err(ReelError::mix_graph("speaker voice already stopped"));
        }
        self.stopped = true;
        self.sink.stop();
        Ok(())
    }
}

impl AudioDestination for SpeakerDestination {
    fn clock(&self) -> DestinationClock {
        DestinationClock::Realtime
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn connect(&mut self, bus: MixBus) -> ReelResult<Box<dyn BusVoice>> {
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| ReelError::mix_graph(format!("failed to open output sink: {e}")))?;
        sink.pause();
        sink.set_volume(bus.gain);
        let source = SamplesBuffer::new(
            bus.buffer.channels(),
            bus.buffer.sample_rate(),
            bus.buffer.samples().to_vec(),
        );
        if bus.looped {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        Ok(Box::new(SpeakerVoice {
            sink,
            stopped: false,
        }))
    }
}
