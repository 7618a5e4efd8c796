use super::pit::{PitTimer, SPKR_VOLUME};
use super::queue::DelayQueue;

pub const SPKR_OUTPUT_RATE: u32 = 22050;

// Virtual time grows without bound while a tone plays; past this point the
// clock is pulled back so float precision stays uniform over long sessions.
const REBASE_THRESHOLD: f64 = 100_000.;
const REBASE_KEEP: f64 = 1000.;

/// PC speaker synthesizer. Owns the PIT model and a delay queue of level
/// transitions; each rendered sample is the time weighted average of the
/// queued levels over that sample's window, which is exactly the box
/// filtered version of the one bit waveform the hardware would emit.
pub struct PcSpeaker {
    rate: u32,
    sample_period: f64,
    pit: PitTimer,
    queue: DelayQueue,
    base_index: f64,
    last_level: f32,
}

impl PcSpeaker {
    pub fn new(rate: u32) -> Self {
        PcSpeaker {
            rate,
            sample_period: 1000. / rate as f64,
            pit: PitTimer::new(),
            queue: DelayQueue::new(),
            base_index: 0.,
            last_level: 0.,
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Open the gate. The transition to full level is timestamped now, so a
    /// control event landing between two render calls is not quantized to
    /// the next sample boundary.
    pub fn turn_on(&mut self) {
        self.pit.turn_on();
        self.queue.push(self.base_index, SPKR_VOLUME);
    }

    pub fn turn_off(&mut self) {
        self.pit.turn_off();
        self.queue.push(self.base_index, 0.);
    }

    /// `min_offset_ms` is accepted for interface fidelity with the original
    /// driver (sweep playback passes step remainders through it) but does
    /// not affect the programmed divisor.
    pub fn set_frequency(&mut self, freq: u16, _min_offset_ms: f32) {
        self.pit.set_frequency(freq);
    }

    pub fn set_divisor(&mut self, divisor: u32) {
        self.pit.set_divisor(divisor);
    }

    /// Fill `stream` with one sample per `1000 / rate` milliseconds of
    /// virtual time, advancing the PIT exactly as far as the request spans.
    pub fn render(&mut self, stream: &mut [i16]) {
        for sample in stream.iter_mut() {
            let sample_end = self.base_index + self.sample_period;

            let queue = &mut self.queue;
            let base = self.base_index;
            self.pit.advance(self.sample_period, |offset, level| {
                queue.push(base + offset, level);
            });

            let mut total = 0.;
            let mut last_index = self.base_index;
            let mut last_level = self.last_level;
            while let Some(entry) = self.queue.pop_before(sample_end) {
                if entry.index > last_index {
                    total += last_level as f64 * (entry.index - last_index);
                    last_index = entry.index;
                }
                last_level = entry.level;
            }
            total += last_level as f64 * (sample_end - last_index);

            *sample = (total / self.sample_period).round() as i16;
            self.last_level = last_level;
            self.base_index = sample_end;
        }

        if self.base_index > REBASE_THRESHOLD {
            let adjust = self.base_index - REBASE_KEEP;
            self.base_index -= adjust;
            self.queue.rebase(adjust);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average_matches_brute_force() {
        // 1 kHz output rate makes the sample window exactly 1 ms wide
        let mut spkr = PcSpeaker::new(1000);
        spkr.queue.push(0.2, 1000.);
        spkr.queue.push(0.5, -2000.);
        spkr.queue.push(1.3, 3000.);

        let mut out = [0i16; 3];
        spkr.render(&mut out);

        // [0,1): 0*0.2 + 1000*0.3 - 2000*0.5 = -700
        // [1,2): -2000*0.3 + 3000*0.7     = 1500
        // [2,3): 3000*1.0                 = 3000
        assert_eq!(out, [-700, 1500, 3000]);
    }

    #[test]
    fn test_silent_when_never_enabled() {
        let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
        let mut out = [0x55i16; 256];
        spkr.render(&mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_on_off_before_render_is_silent() {
        let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
        spkr.set_frequency(440, 0.);
        spkr.turn_on();
        spkr.turn_off();

        let mut out = [0x55i16; 256];
        spkr.render(&mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_set_divisor_idempotent() {
        let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
        spkr.set_divisor(382);
        let queued = spkr.queue.len();
        let (len, pos) = (spkr.pit.cycle_len, spkr.pit.cycle_pos);

        spkr.set_divisor(382);
        assert_eq!(spkr.queue.len(), queued);
        assert_eq!(spkr.pit.cycle_len, len);
        assert_eq!(spkr.pit.cycle_pos, pos);
    }

    fn sign_flips(samples: &[i16]) -> usize {
        let mut flips = 0;
        let mut last_positive = None;
        for &s in samples {
            if s == 0 {
                continue;
            }
            let positive = s > 0;
            if let Some(last) = last_positive {
                if last != positive {
                    flips += 1;
                }
            }
            last_positive = Some(positive);
        }
        flips
    }

    #[test]
    fn test_square_wave_3116hz() {
        let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
        spkr.set_frequency(3116, 0.);
        spkr.turn_on();

        let mut out = vec![0i16; SPKR_OUTPUT_RATE as usize];
        spkr.render(&mut out);

        // plateaus hit the full level, transition samples get averaged
        assert_eq!(*out.iter().max().unwrap(), 5000);
        assert_eq!(*out.iter().min().unwrap(), -5000);
        assert!(out.iter().any(|&s| s != 0 && s.abs() < 4000));

        // divisor 382 toggles 2 * 1193182 / 382 ~= 6247 times per second
        let flips = sign_flips(&out);
        assert!((6100..6400).contains(&flips), "flips = {}", flips);
    }

    #[test]
    fn test_rebase_is_transparent() {
        let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
        spkr.set_frequency(3116, 0.);
        spkr.turn_on();

        let mut chunk = vec![0i16; SPKR_OUTPUT_RATE as usize];
        let mut flips_per_second = Vec::new();
        for _ in 0..110 {
            spkr.render(&mut chunk);
            assert!(spkr.base_index < 101_000.);
            flips_per_second.push(sign_flips(&chunk));
        }

        // the tone stays intact long past the re-basing threshold
        let first = flips_per_second[0] as i64;
        for &flips in &flips_per_second {
            assert!((flips as i64 - first).abs() <= 4, "flips = {}", flips);
        }
        assert_eq!(*chunk.iter().max().unwrap(), 5000);
        assert_eq!(*chunk.iter().min().unwrap(), -5000);
    }

    #[test]
    fn test_turn_off_holds_silence() {
        let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
        spkr.set_frequency(440, 0.);
        spkr.turn_on();
        let mut out = vec![0i16; 1024];
        spkr.render(&mut out);

        spkr.turn_off();
        spkr.render(&mut out);
        // the queued zero transition lands at the start of the first window
        assert!(out.iter().all(|&s| s == 0));
    }
}
