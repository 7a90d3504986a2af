use gnss_rs::sv::SV;

use crate::almanac::Almanac;
use crate::constants::{GPS_SUBFRAME_BITS, GPS_WORD_BITS};
use crate::ephemeris::Ephemeris;
use crate::framer::FrameEvent;
use crate::iono::{IonoModel, UtcModel};
use crate::util::getbitu;

/// Flat subframe-word state machine. The original GNSS-SDR decoder nests this in a
/// boost::statechart hierarchy (idle -> subframe -> word1..word10); here it is a single
/// tagged-variant counter, S0 (waiting for the first word after frame lock) through S10
/// (subframe complete, ready to dispatch).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SubframeState {
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
}

impl SubframeState {
    fn next(self) -> Self {
        use SubframeState::*;
        match self {
            S0 => S1,
            S1 => S2,
            S2 => S3,
            S3 => S4,
            S4 => S5,
            S5 => S6,
            S6 => S7,
            S7 => S8,
            S8 => S9,
            S9 => S10,
            S10 => S1,
        }
    }

    fn word_index(self) -> usize {
        use SubframeState::*;
        match self {
            S0 => 0,
            S1 => 0,
            S2 => 1,
            S3 => 2,
            S4 => 3,
            S5 => 4,
            S6 => 5,
            S7 => 6,
            S8 => 7,
            S9 => 8,
            S10 => 9,
        }
    }
}

/// Accumulates decoded 30-bit words into a 300-bit subframe buffer, dispatches on subframe-ID
/// (HOW word, bits 50-52), and gates ephemeris publication on an IODE cross-check between
/// subframes 2 and 3.
pub struct SubframeFsm {
    sv: SV,
    state: SubframeState,
    buf: Vec<u8>, // 300 bits, MSB-first across the 10 words
    eph_build: Ephemeris,
    iode_sf2: Option<u32>,
    iode_sf3: Option<u32>,
    pub iono: Option<IonoModel>,
    pub utc: Option<UtcModel>,
    pub almanac: Vec<Almanac>,
    ts_sec: f64,
}

pub enum SubframeOutput {
    None,
    Ephemeris(Ephemeris),
    IonoUtc,
    Almanac(Almanac),
}

impl SubframeFsm {
    pub fn new(sv: SV) -> Self {
        Self {
            sv,
            state: SubframeState::S0,
            buf: vec![0u8; GPS_SUBFRAME_BITS],
            eph_build: Ephemeris::new(sv),
            iode_sf2: None,
            iode_sf3: None,
            iono: None,
            utc: None,
            almanac: Vec::new(),
            ts_sec: 0.0,
        }
    }

    /// Feeds one framer event. A preamble always restarts subframe-word alignment (any state ->
    /// S1, buffer cleared); an invalid-parity word discards whatever has been buffered so far
    /// (S1..S9 -> S0, S10 -> S0); a valid word fills the next slot and, once the tenth completes
    /// the buffer (S10), dispatches and decodes the subframe.
    pub fn push_event(&mut self, ev: &FrameEvent, ts_sec: f64) -> SubframeOutput {
        match ev {
            FrameEvent::WordPreamble => {
                self.state = SubframeState::S1;
                self.buf = vec![0u8; GPS_SUBFRAME_BITS];
                self.ts_sec = ts_sec;
                SubframeOutput::None
            }
            FrameEvent::WordInvalid => {
                self.state = SubframeState::S0;
                SubframeOutput::None
            }
            FrameEvent::WordValid(word) => {
                if self.state == SubframeState::S0 {
                    // no preamble seen yet this pass; a stray valid word can't anchor a subframe.
                    return SubframeOutput::None;
                }
                let word_idx = self.state.word_index();
                self.buf[word_idx * GPS_WORD_BITS..(word_idx + 1) * GPS_WORD_BITS].copy_from_slice(&word.bits);

                if self.state == SubframeState::S10 {
                    self.state = SubframeState::S1;
                    self.dispatch()
                } else {
                    self.state = self.state.next();
                    SubframeOutput::None
                }
            }
        }
    }

    fn dispatch(&mut self) -> SubframeOutput {
        let subframe_id = getbitu(&self.buf, 49, 3);
        match subframe_id {
            1 => {
                self.eph_build.nav_decode_lnav_subframe1(&self.buf, self.sv);
                self.eph_build.ts_sec = self.ts_sec;
                SubframeOutput::None
            }
            2 => {
                self.eph_build.nav_decode_lnav_subframe2(&self.buf, self.sv);
                self.iode_sf2 = Some(self.eph_build.iode);
                self.maybe_publish_ephemeris()
            }
            3 => {
                self.eph_build.nav_decode_lnav_subframe3(&self.buf, self.sv);
                self.iode_sf3 = Some(self.eph_build.iode);
                self.maybe_publish_ephemeris()
            }
            4 => self.dispatch_subframe4(),
            5 => self.dispatch_subframe5(),
            _ => SubframeOutput::None,
        }
    }

    /// Subframes 2 and 3 each carry their own IODE; only publish once they agree, guaranteeing
    /// the ephemeris record isn't a mix of two different upload epochs.
    fn maybe_publish_ephemeris(&mut self) -> SubframeOutput {
        match (self.iode_sf2, self.iode_sf3) {
            (Some(a), Some(b)) if a == b => {
                self.iode_sf2 = None;
                self.iode_sf3 = None;
                SubframeOutput::Ephemeris(self.eph_build)
            }
            _ => SubframeOutput::None,
        }
    }

    /// Subframe 4 carries 25 pages selected by word 3 bits 57-62; only page 18 (iono/UTC) and
    /// the page-25 SV-health/almanac-reference page are modeled here, the rest are almanac
    /// pages for PRNs 25-32 dispatched like subframe 5.
    fn dispatch_subframe4(&mut self) -> SubframeOutput {
        let svid = getbitu(&self.buf, 62, 6);
        match svid {
            56 => {
                // page 18: ionospheric + UTC parameters
                self.iono = Some(IonoModel::decode(&self.buf));
                self.utc = Some(UtcModel::decode(&self.buf));
                SubframeOutput::IonoUtc
            }
            25..=32 | 41..=63 => {
                let mut alm = Almanac::default();
                alm.nav_decode_alm(&self.buf, svid as u32);
                self.almanac.push(alm);
                SubframeOutput::Almanac(alm)
            }
            _ => SubframeOutput::None,
        }
    }

    /// Subframe 5 carries almanac pages for PRNs 1-24 (page 1-24) plus a page-25 health summary.
    fn dispatch_subframe5(&mut self) -> SubframeOutput {
        let svid = getbitu(&self.buf, 62, 6);
        if (1..=24).contains(&svid) {
            let mut alm = Almanac::default();
            alm.nav_decode_alm(&self.buf, svid as u32);
            self.almanac.push(alm);
            SubframeOutput::Almanac(alm)
        } else {
            SubframeOutput::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnss_rs::constellation::Constellation;

    fn sv() -> SV {
        SV::new(Constellation::GPS, 1)
    }

    fn valid_word() -> FrameEvent {
        FrameEvent::WordValid(crate::framer::FramedWord { bits: [0u8; GPS_WORD_BITS], parity_ok: true })
    }

    #[test]
    fn preamble_then_ten_words_complete_a_subframe() {
        let mut fsm = SubframeFsm::new(sv());
        fsm.push_event(&FrameEvent::WordPreamble, 0.0);
        let mut last = SubframeOutput::None;
        for _ in 0..10 {
            last = fsm.push_event(&valid_word(), 0.0);
        }
        assert!(matches!(last, SubframeOutput::None));
        assert_eq!(fsm.state, SubframeState::S1);
    }

    #[test]
    fn invalid_word_discards_partial_subframe() {
        let mut fsm = SubframeFsm::new(sv());
        fsm.push_event(&FrameEvent::WordPreamble, 0.0);
        fsm.push_event(&valid_word(), 0.0);
        assert_eq!(fsm.state, SubframeState::S2);
        fsm.push_event(&FrameEvent::WordInvalid, 0.0);
        assert_eq!(fsm.state, SubframeState::S0);
    }

    #[test]
    fn preamble_restarts_buffer_mid_subframe() {
        let mut fsm = SubframeFsm::new(sv());
        fsm.push_event(&FrameEvent::WordPreamble, 0.0);
        for _ in 0..5 {
            fsm.push_event(&valid_word(), 0.0);
        }
        assert_eq!(fsm.state, SubframeState::S6);
        fsm.push_event(&FrameEvent::WordPreamble, 1.0);
        assert_eq!(fsm.state, SubframeState::S1);
    }

    #[test]
    fn stray_word_before_preamble_is_ignored() {
        let mut fsm = SubframeFsm::new(sv());
        assert!(matches!(fsm.push_event(&valid_word(), 0.0), SubframeOutput::None));
        assert_eq!(fsm.state, SubframeState::S0);
    }

    #[test]
    fn mismatched_iode_withholds_publication() {
        let mut fsm = SubframeFsm::new(sv());
        fsm.iode_sf2 = Some(5);
        fsm.iode_sf3 = Some(6);
        assert!(matches!(fsm.maybe_publish_ephemeris(), SubframeOutput::None));
        fsm.iode_sf3 = Some(5);
        assert!(matches!(fsm.maybe_publish_ephemeris(), SubframeOutput::Ephemeris(_)));
    }
}
