use super::audio_backend::{AudioBackend, RINGBUF_SIZE};
use crate::emucore::speaker::PcSpeaker;
use ringbuf::{Producer, RingBuffer};

const PUMP_CHUNK: usize = 512;

/// Wires a speaker to an audio backend through a single producer, single
/// consumer ring buffer. Control calls come from game logic; the backend
/// drains the queue from its own thread.
pub struct SpeakerController {
    speaker: PcSpeaker,
    soundbuf: Producer<i16>,
    _backend: Box<dyn AudioBackend>,
}

impl SpeakerController {
    pub fn new(rate: u32, mut backend: Box<dyn AudioBackend>) -> Self {
        let buf = RingBuffer::new(RINGBUF_SIZE);
        let (producer, consumer) = buf.split();
        backend.setup_stream(consumer, rate);
        SpeakerController {
            speaker: PcSpeaker::new(rate),
            soundbuf: producer,
            _backend: backend,
        }
    }

    pub fn turn_on(&mut self) {
        self.speaker.turn_on();
    }

    pub fn turn_off(&mut self) {
        self.speaker.turn_off();
    }

    pub fn set_frequency(&mut self, freq: u16) {
        self.speaker.set_frequency(freq, 0.);
    }

    pub fn set_divisor(&mut self, divisor: u32) {
        self.speaker.set_divisor(divisor);
    }

    /// Render as many samples as the ring buffer currently has room for,
    /// in fixed-size chunks so the render path never allocates. Returns
    /// the number of samples handed to the backend.
    pub fn pump(&mut self) -> usize {
        let mut scratch = [0i16; PUMP_CHUNK];
        let mut pushed = 0;
        loop {
            let free = self.soundbuf.remaining().min(PUMP_CHUNK);
            if free == 0 {
                break;
            }
            self.speaker.render(&mut scratch[..free]);
            pushed += self.soundbuf.push_slice(&scratch[..free]);
        }
        pushed
    }
}
