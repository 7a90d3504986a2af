use std::collections::VecDeque;

use crate::constants::{GPS_PREAMBLE, GPS_WORD_BITS, PREAMBLE_LENGTH_SYMBOLS, SAMPLES_PER_BIT};
use crate::util::xor_bits;

/// Six ICD-GPS-200 parity equations (20.3.5), expressed as XOR masks over the 32-bit word
/// `[D29* D30* d1..d24]` with the inverted-bit overlay already folded in by the caller.
const PARITY_MASKS: [u32; 6] = [
    0x2EC7CD2, 0x1763E69, 0x2BB1F34, 0x15D8F9A, 0x1AEC7CD, 0x22DEA27,
];

/// Subframe boundary spacing in symbols (300 bits * 20 symbols/bit): two preamble hits 6000
/// symbols apart, within +-1 symbol, confirm frame lock.
const SUBFRAME_SYMBOL_SPACING: i64 = 6000;
const CANDIDATE_TIMEOUT_SYMBOLS: i64 = 6001;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FrameSyncState {
    Idle,
    Candidate,
    Locked,
}

/// Events the framer hands to the subframe FSM: a validated word, a parity-failed word, or a
/// preamble hit (which always restarts subframe-word alignment, even mid-subframe).
pub enum FrameEvent {
    WordValid(FramedWord),
    WordInvalid,
    WordPreamble,
}

/// Symbol -> bit -> word framer: slides a preamble correlator over 160 prompt-sign symbols,
/// locks frame sync, and emits 30-bit ICD words once 20:1 bit integration completes.
pub struct Framer {
    state: FrameSyncState,
    symbol_buf: VecDeque<i8>, // raw +-1 prompt-sign symbols, newest at the back
    preamble_pattern: [i8; PREAMBLE_LENGTH_SYMBOLS],
    sample_counter: u64, // one tick per pushed symbol (one per PRN code period)
    preamble_index: u64, // sample_counter at the most recent accepted preamble hit
    bit_accum: f64,
    bit_count: usize,
    bit_buf: VecDeque<u8>, // 0/1 bits since last word boundary, MSB-first
    d29_star: u8,
    d30_star: u8,
}

pub struct FramedWord {
    pub bits: [u8; GPS_WORD_BITS], // inversion-corrected; D1..D24 data in bits[0..24], parity in bits[24..30]
    pub parity_ok: bool,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub fn new() -> Self {
        let mut preamble_pattern = [0i8; PREAMBLE_LENGTH_SYMBOLS];
        for (bit_idx, &bit) in GPS_PREAMBLE.iter().enumerate() {
            let sign: i8 = if bit == 1 { 1 } else { -1 };
            for s in 0..SAMPLES_PER_BIT {
                preamble_pattern[bit_idx * SAMPLES_PER_BIT + s] = sign;
            }
        }
        Self {
            state: FrameSyncState::Idle,
            symbol_buf: VecDeque::with_capacity(PREAMBLE_LENGTH_SYMBOLS),
            preamble_pattern,
            sample_counter: 0,
            preamble_index: 0,
            bit_accum: 0.0,
            bit_count: 0,
            bit_buf: VecDeque::new(),
            d29_star: 0,
            d30_star: 0,
        }
    }

    pub fn state(&self) -> FrameSyncState {
        self.state
    }

    /// Cross-correlates the last 160 prompt-sign symbols against the known preamble pattern.
    /// `|corr| >= 160` means an exact (possibly polarity-inverted) match.
    fn preamble_correlation(&self) -> i32 {
        if self.symbol_buf.len() < PREAMBLE_LENGTH_SYMBOLS {
            return 0;
        }
        self.symbol_buf.iter().zip(self.preamble_pattern.iter()).map(|(&s, &p)| s as i32 * p as i32).sum()
    }

    fn preamble_hit(&self) -> bool {
        self.preamble_correlation().unsigned_abs() as usize >= PREAMBLE_LENGTH_SYMBOLS
    }

    /// Feeds one Prompt-correlator sign symbol (one per PRN code period). May emit a preamble
    /// event and/or a word event (both can coincide on the same symbol).
    pub fn push_symbol(&mut self, prompt_sign: i8) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        self.sample_counter += 1;

        self.symbol_buf.push_back(prompt_sign);
        if self.symbol_buf.len() > PREAMBLE_LENGTH_SYMBOLS {
            self.symbol_buf.pop_front();
        }

        if self.preamble_hit() {
            match self.state {
                FrameSyncState::Idle => {
                    self.state = FrameSyncState::Candidate;
                    self.preamble_index = self.sample_counter;
                    self.bit_accum = 0.0;
                    self.bit_count = 0;
                    self.bit_buf.clear();
                }
                FrameSyncState::Candidate | FrameSyncState::Locked => {
                    let delta = self.sample_counter as i64 - self.preamble_index as i64 - SUBFRAME_SYMBOL_SPACING;
                    if delta.abs() <= 1 {
                        self.state = FrameSyncState::Locked;
                        self.preamble_index = self.sample_counter;
                        events.push(FrameEvent::WordPreamble);
                    }
                    // otherwise: a spurious mid-window correlation, ignored.
                }
            }
        }

        if self.state == FrameSyncState::Candidate
            && self.sample_counter as i64 - self.preamble_index as i64 > CANDIDATE_TIMEOUT_SYMBOLS
        {
            self.state = FrameSyncState::Idle;
        }

        if matches!(self.state, FrameSyncState::Candidate | FrameSyncState::Locked) {
            self.bit_accum += prompt_sign as f64;
            self.bit_count += 1;
            if self.bit_count == SAMPLES_PER_BIT {
                let bit = if self.bit_accum > 0.0 { 1u8 } else { 0u8 };
                self.bit_accum = 0.0;
                self.bit_count = 0;
                self.bit_buf.push_back(bit);

                if self.bit_buf.len() == GPS_WORD_BITS {
                    let raw: Vec<u8> = self.bit_buf.drain(..).collect();
                    let word = self.decode_word(&raw);
                    if word.parity_ok {
                        events.push(FrameEvent::WordValid(word));
                    } else {
                        events.push(FrameEvent::WordInvalid);
                    }
                }
            }
        }

        events
    }

    /// Applies the D30* inversion and checks the six ICD-GPS-200 parity equations.
    fn decode_word(&mut self, raw: &[u8]) -> FramedWord {
        let mut bits = [0u8; GPS_WORD_BITS];
        for (i, &b) in raw.iter().enumerate() {
            bits[i] = if self.d30_star == 1 { 1 - b } else { b };
        }

        let mut word: u32 = (self.d29_star as u32) << 31 | (self.d30_star as u32) << 30;
        for (i, &b) in bits.iter().enumerate() {
            word |= (b as u32) << (29 - i);
        }

        let parity_ok = check_parity(word, &bits);

        self.d29_star = bits[22];
        self.d30_star = bits[23];

        FramedWord { bits, parity_ok }
    }
}

/// Checks the six ICD-GPS-200 parity bits (`bits[24..30]`) against a 32-bit word with the two
/// previous D29*/D30* bits overlaid in bits 31/30, as [`Framer::decode_word`] builds it.
fn check_parity(word: u32, bits: &[u8; GPS_WORD_BITS]) -> bool {
    PARITY_MASKS.iter().enumerate().all(|(i, mask)| xor_bits(word, *mask) == bits[24 + i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_preamble(framer: &mut Framer) {
        for &bit in GPS_PREAMBLE.iter() {
            let sign: i8 = if bit == 1 { 1 } else { -1 };
            for _ in 0..SAMPLES_PER_BIT {
                framer.push_symbol(sign);
            }
        }
    }

    #[test]
    fn idle_until_preamble_seen() {
        let mut framer = Framer::new();
        for _ in 0..PREAMBLE_LENGTH_SYMBOLS - 1 {
            framer.push_symbol(1);
        }
        assert_eq!(framer.state(), FrameSyncState::Idle);
    }

    /// Literal scenario: 160 symbols matching the preamble pattern hit at sample 160, entering
    /// Candidate with preamble_index=160.
    #[test]
    fn preamble_moves_to_candidate_at_sample_160() {
        let mut framer = Framer::new();
        feed_preamble(&mut framer);
        assert_eq!(framer.state(), FrameSyncState::Candidate);
        assert_eq!(framer.preamble_index, 160);
        assert_eq!(framer.sample_counter, 160);
    }

    /// Literal scenario: two preamble hits 6000 symbols apart (sample 160 then 6160) confirm
    /// frame lock.
    #[test]
    fn two_preambles_6000_symbols_apart_locks() {
        let mut framer = Framer::new();
        feed_preamble(&mut framer);
        assert_eq!(framer.state(), FrameSyncState::Candidate);

        for _ in 0..(6000 - PREAMBLE_LENGTH_SYMBOLS as i64) {
            framer.push_symbol(-1);
        }
        let mut locked = false;
        for ev in {
            let mut last = Vec::new();
            for &bit in GPS_PREAMBLE.iter() {
                let sign: i8 = if bit == 1 { 1 } else { -1 };
                for _ in 0..SAMPLES_PER_BIT {
                    last = framer.push_symbol(sign);
                }
            }
            last
        } {
            if matches!(ev, FrameEvent::WordPreamble) {
                locked = true;
            }
        }
        assert!(locked);
        assert_eq!(framer.state(), FrameSyncState::Locked);
        assert_eq!(framer.sample_counter, 6160);
    }

    /// Candidate state with no confirming second hit within 6001 symbols drops back to Idle.
    #[test]
    fn candidate_times_out_without_second_hit() {
        let mut framer = Framer::new();
        feed_preamble(&mut framer);
        assert_eq!(framer.state(), FrameSyncState::Candidate);
        for _ in 0..=CANDIDATE_TIMEOUT_SYMBOLS {
            framer.push_symbol(-1);
        }
        assert_eq!(framer.state(), FrameSyncState::Idle);
    }

    /// Literal parity-word scenario (0x22C000E4): previous D29*D30*=00, no inversion needed.
    #[test]
    fn parity_word_literal_scenario_no_inversion() {
        let word: u32 = 0x22C000E4;
        let mut bits = [0u8; GPS_WORD_BITS];
        for i in 0..GPS_WORD_BITS {
            bits[i] = ((word >> (29 - i)) & 1) as u8;
        }
        assert!(check_parity(word, &bits));
    }

    /// Same word with previous D30*=1: the 24 data bits (6..29) are inverted before parity is
    /// evaluated, via XOR with 0x3FFFFFC0.
    #[test]
    fn parity_word_literal_scenario_with_inversion() {
        let raw: u32 = 0x22C000E4;
        let inverted = raw ^ 0x3FFFFFC0;
        let mut bits = [0u8; GPS_WORD_BITS];
        for i in 0..GPS_WORD_BITS {
            bits[i] = ((inverted >> (29 - i)) & 1) as u8;
        }
        let word: u32 = (1u32 << 30) | inverted;
        assert!(check_parity(word, &bits));
    }
}
