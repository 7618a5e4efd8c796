// Emulation of the 8253/8254 PIT channel 2 running in mode 3 (square wave
// generator), which is the mode the PC speaker is wired to. All timing is
// kept in milliseconds of virtual time; one count of the divisor corresponds
// to one tick of the 1.193182 MHz PIT crystal.

pub const PIT_TICK_RATE: u32 = 1_193_182;
pub const SPKR_VOLUME: f32 = 5000.;

// Divisors below 2 would toggle above half the tick rate, far beyond
// anything the output stage can represent.
const MIN_DIVISOR: u32 = 2;

pub struct PitTimer {
    pub(crate) divisor: u32,
    pub(crate) cycle_pos: f64,
    pub(crate) cycle_len: f64,
    pub(crate) half_cycle: f64,
    pub(crate) output_high: bool,
    pub(crate) output_level: f32,
    pub(crate) enabled: bool,
    pub(crate) gate: bool,
}

impl PitTimer {
    pub fn new() -> Self {
        PitTimer {
            divisor: 0,
            cycle_pos: 0.,
            cycle_len: 0.,
            half_cycle: 0.,
            output_high: true,
            output_level: SPKR_VOLUME,
            enabled: false,
            gate: false,
        }
    }

    /// Program the counter directly, as a port 42h write would. A divisor of
    /// 0 stops the output from toggling without touching the phase.
    pub fn set_divisor(&mut self, divisor: u32) {
        if divisor == self.divisor {
            return;
        }
        self.divisor = divisor;
        if divisor > 0 {
            self.cycle_len = divisor as f64 * 1000. / PIT_TICK_RATE as f64;
            self.half_cycle = self.cycle_len / 2.;
            // A counter write alone does not re-edge the output, so the
            // phase carries over; it only gets wrapped into the new cycle.
            if self.cycle_pos > self.cycle_len {
                self.cycle_pos %= self.cycle_len;
            }
        } else {
            self.cycle_len = 0.;
            self.half_cycle = 0.;
        }
    }

    pub fn set_frequency(&mut self, freq: u16) {
        if freq == 0 {
            self.set_divisor(0);
            return;
        }
        let divisor = (PIT_TICK_RATE / freq as u32).max(MIN_DIVISOR);
        self.set_divisor(divisor);
    }

    /// Rising edge of the gate: mode 3 reloads and starts high.
    pub fn turn_on(&mut self) {
        self.enabled = true;
        self.gate = true;
        self.cycle_pos = 0.;
        self.output_high = true;
        self.output_level = SPKR_VOLUME;
    }

    pub fn turn_off(&mut self) {
        self.enabled = false;
        self.gate = false;
        self.output_level = 0.;
    }

    /// Advance the timer by `delta_ms`, reporting every output toggle as
    /// `(offset_ms, new_level)` with the offset relative to the start of the
    /// advance. In mode 3 the output drops at the half cycle and rises again
    /// when the full cycle completes; the cycle position is reset on the
    /// low to high edge only.
    pub fn advance(&mut self, delta_ms: f64, mut toggle: impl FnMut(f64, f32)) {
        if !self.enabled || !self.gate || self.cycle_len <= 0. || self.half_cycle <= 0. {
            return;
        }
        let mut done = 0.;
        while done < delta_ms {
            let mut until_toggle = if self.output_high {
                self.half_cycle - self.cycle_pos
            } else {
                self.cycle_len - self.cycle_pos
            };
            if until_toggle < 0. {
                // phase can sit just past a boundary after a divisor
                // change; the toggle is then due immediately
                until_toggle = 0.;
            }

            if until_toggle <= delta_ms - done {
                done += until_toggle;
                self.cycle_pos += until_toggle;
                self.output_high = !self.output_high;
                self.output_level = if self.output_high {
                    SPKR_VOLUME
                } else {
                    -SPKR_VOLUME
                };
                if self.output_high {
                    self.cycle_pos = 0.;
                }
                toggle(done, self.output_level);
            } else {
                self.cycle_pos += delta_ms - done;
                done = delta_ms;
            }
        }
    }
}
