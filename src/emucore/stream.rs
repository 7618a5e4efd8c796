// Playback streams that drive the speaker control surface over time. These
// are the executors behind the game's canned effects: a fixed tone, a linear
// frequency sweep, PRNG driven noise and gate chatter. The effect catalog
// that picks their parameters lives outside this crate.

use super::speaker::PcSpeaker;

pub trait SpeakerStream {
    /// Render up to `buffer.len()` samples, returning how many were
    /// written. 0 means the stream has played out.
    fn read(&mut self, buffer: &mut [i16]) -> usize;

    fn finished(&self) -> bool;

    fn length_msec(&self) -> u32;

    /// Restart from the beginning, for looping ambient effects. Streams
    /// that cannot loop return false.
    fn rewind(&mut self) -> bool {
        false
    }
}

// Durations come from the game's scripts in its own delay units; one unit
// is 1/1255 of a second of output.
const DELAY_UNIT_DIVIDER: u32 = 1255;

pub struct ToneStream {
    speaker: PcSpeaker,
    frequency: u16,
    duration: u32,
    played: u32,
    finished: bool,
}

impl ToneStream {
    pub fn new(rate: u32, frequency: u16, units: u16) -> Self {
        let mut speaker = PcSpeaker::new(rate);
        if frequency != 0 {
            speaker.turn_on();
            speaker.set_frequency(frequency, 0.);
        }
        let duration = units as u32 * (rate / DELAY_UNIT_DIVIDER);
        ToneStream {
            speaker,
            frequency,
            duration,
            played: 0,
            finished: duration == 0,
        }
    }
}

impl SpeakerStream for ToneStream {
    fn read(&mut self, buffer: &mut [i16]) -> usize {
        if self.played >= self.duration {
            return 0;
        }
        let samples = (buffer.len() as u32).min(self.duration - self.played) as usize;
        if self.frequency != 0 {
            self.speaker.render(&mut buffer[..samples]);
        } else {
            // frequency 0 plays as a timed rest
            buffer[..samples].fill(0);
        }
        self.played += samples as u32;
        if self.played >= self.duration {
            self.finished = true;
            self.speaker.turn_off();
        }
        samples
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn length_msec(&self) -> u32 {
        (self.duration as f32 / (self.speaker.rate() as f32 / 1000.)) as u32
    }

    fn rewind(&mut self) -> bool {
        self.played = 0;
        self.finished = false;
        self.speaker.turn_on();
        if self.frequency != 0 {
            self.speaker.set_frequency(self.frequency, 0.);
        }
        true
    }
}

pub struct SweepStream {
    speaker: PcSpeaker,
    cur_freq: i32,
    freq_step: i32,
    num_steps: u32,
    cur_step: u32,
    samples_per_step: f32,
    sample_pos: f32,
    finished: bool,
}

impl SweepStream {
    pub fn new(rate: u32, start_freq: u16, finish_freq: u16, duration: u16, stepping: u16) -> Self {
        let duration = duration.max(1);
        let stepping = stepping.max(1);
        let mut speaker = PcSpeaker::new(rate);
        speaker.turn_on();
        speaker.set_frequency(start_freq, 0.);
        SweepStream {
            speaker,
            cur_freq: start_freq as i32,
            freq_step: (finish_freq as i32 - start_freq as i32) * stepping as i32
                / duration as i32,
            num_steps: duration as u32 / stepping as u32,
            cur_step: 0,
            // per-step pacing constant carried over from the original driver
            samples_per_step: stepping as f32 * (rate as f32 * 0.000_879_533),
            sample_pos: 0.,
            finished: false,
        }
    }
}

impl SpeakerStream for SweepStream {
    fn read(&mut self, buffer: &mut [i16]) -> usize {
        let samples = buffer.len();
        let mut i = 0;
        while i < samples && self.cur_step < self.num_steps {
            let mut n = self.samples_per_step - self.sample_pos;
            if i as f32 + n > samples as f32 {
                n = (samples - i) as f32;
            }
            let remainder = n - n.floor();
            let n = n.floor() as usize;
            self.speaker.render(&mut buffer[i..i + n]);
            self.sample_pos += n as f32;
            i += n;

            if self.sample_pos + remainder >= self.samples_per_step {
                self.cur_freq += self.freq_step;
                let freq = self.cur_freq.clamp(0, u16::MAX as i32) as u16;
                self.speaker.set_frequency(freq, remainder);

                if remainder != 0. && i < samples {
                    // the step boundary fell inside a sample; render that
                    // sample now and start the next step partway through
                    self.sample_pos = 1. - remainder;
                    self.speaker.render(&mut buffer[i..i + 1]);
                    i += 1;
                } else {
                    self.sample_pos = 0.;
                }
                self.cur_step += 1;
            }
        }

        if self.cur_step >= self.num_steps {
            self.finished = true;
            self.speaker.turn_off();
        }
        i
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn length_msec(&self) -> u32 {
        let samples = self.num_steps as f32 * self.samples_per_step;
        (samples / (self.speaker.rate() as f32 / 1000.)) as u32
    }
}

pub struct NoiseStream {
    speaker: PcSpeaker,
    rand_value: u16,
    base_val: u32,
    num_steps: u32,
    cur_step: u32,
    samples_per_step: u32,
    sample_pos: u32,
    finished: bool,
}

impl NoiseStream {
    pub fn new(rate: u32, base_val: u32, duration: u16, stepping: u16) -> Self {
        let speaker = PcSpeaker::new(rate);
        let (num_steps, samples_per_step) = if stepping >= duration {
            // noise mode (fountains, water wheels): the original changed
            // the counter every few CPU cycles; a new divisor every 5
            // samples is the closest audible equivalent
            (2200, 5)
        } else {
            let num_steps = if stepping > 0 {
                (duration as u32 / stepping as u32).max(1)
            } else {
                1
            };
            let samples_per_step = if stepping > 0 {
                (stepping as u32 * rate / 10_000).max(1)
            } else {
                20
            };
            (num_steps, samples_per_step)
        };

        let mut stream = NoiseStream {
            speaker,
            rand_value: 0x7664,
            base_val,
            num_steps,
            cur_step: 0,
            samples_per_step,
            sample_pos: 0,
            finished: false,
        };
        stream.speaker.turn_on();
        stream.next_divisor();
        stream
    }

    /// Step the game's 16-bit PRNG and program the resulting counter. The
    /// arithmetic is kept bit-exact, including the wrap for `base_val`
    /// below 100 that spreads the divisor over the whole 16-bit range.
    fn next_divisor(&mut self) -> u32 {
        let mut r = self.rand_value;
        r = r.wrapping_add(0x9248);
        r = r.rotate_right(3);
        r ^= 0x9248;
        r = r.wrapping_add(0x11);
        self.rand_value = r;

        let range = (self.base_val as u16).wrapping_sub(0x64).wrapping_add(1);
        let range = if range == 0 { 1 } else { range };
        // counters under 19 would put the fundamental above 62 kHz
        let divisor = (r % range).wrapping_add(0x64).max(19) as u32;
        self.speaker.set_divisor(divisor);
        divisor
    }
}

impl SpeakerStream for NoiseStream {
    fn read(&mut self, buffer: &mut [i16]) -> usize {
        let samples = buffer.len();
        let mut i = 0;
        while i < samples && self.cur_step <= self.num_steps {
            let mut n = (self.samples_per_step - self.sample_pos) as usize;
            if i + n > samples {
                n = samples - i;
            }
            self.speaker.render(&mut buffer[i..i + n]);
            self.sample_pos += n as u32;
            i += n;

            if self.sample_pos >= self.samples_per_step {
                self.next_divisor();
                self.sample_pos = 0;
                self.cur_step += 1;
            }
        }

        if self.cur_step >= self.num_steps {
            self.finished = true;
            self.speaker.turn_off();
        }
        i
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn length_msec(&self) -> u32 {
        let samples = self.num_steps * self.samples_per_step;
        (samples as f32 / (self.speaker.rate() as f32 / 1000.)) as u32
    }

    fn rewind(&mut self) -> bool {
        // the PRNG keeps running across loops so the pattern never repeats
        self.cur_step = 0;
        self.sample_pos = 0;
        self.finished = false;
        self.speaker.turn_on();
        self.next_divisor();
        true
    }
}

/// Gate chatter effect: a wrapping accumulator repeatedly opens and closes
/// the gate against a moving threshold, with a fixed ultrasonic carrier.
/// Used by the game for casting, death and quake effects.
pub struct StutterStream {
    speaker: PcSpeaker,
    delta: i16,
    threshold: u16,
    remaining: u16,
    count: u16,
    step: u16,
    accum: u16,
    delay: f32,
    delay_remaining: f32,
    finished: bool,
}

const STUTTER_CARRIER_HZ: u16 = 22_096;

impl StutterStream {
    pub fn new(rate: u32, delta: i16, threshold: u16, count: u16, delay_units: u16, step: u16) -> Self {
        let mut speaker = PcSpeaker::new(rate);
        speaker.turn_on();
        speaker.set_frequency(STUTTER_CARRIER_HZ, 0.);
        let delay = ((rate / 22_050) * delay_units as u32).max(1) as f32;
        StutterStream {
            speaker,
            delta,
            threshold,
            remaining: count,
            count,
            step,
            accum: 0,
            delay,
            delay_remaining: 0.,
            finished: false,
        }
    }
}

impl SpeakerStream for StutterStream {
    fn read(&mut self, buffer: &mut [i16]) -> usize {
        let samples = buffer.len();
        let mut s = 0;
        while self.remaining > 0 && s < samples {
            let n = (self.delay_remaining.floor() as usize).min(samples - s);
            if n > 0 {
                self.speaker.render(&mut buffer[s..s + n]);
                self.delay_remaining -= n as f32;
                s += n;
            }

            self.accum = self.accum.wrapping_add(self.step);
            if self.accum > self.threshold {
                self.speaker.turn_on();
            } else {
                self.speaker.turn_off();
            }
            self.threshold = self.threshold.wrapping_add(self.delta as u16);

            let n = (self.delay.floor() as usize).min(samples - s);
            self.speaker.render(&mut buffer[s..s + n]);
            self.delay_remaining = self.delay - n as f32;
            s += n;
            self.remaining -= 1;
        }

        if self.remaining == 0 {
            self.finished = true;
            self.speaker.turn_off();
        }
        s
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn length_msec(&self) -> u32 {
        let samples = self.count as f32 * self.delay;
        (samples / (self.speaker.rate() as f32 / 1000.)) as u32
    }
}
