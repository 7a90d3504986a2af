use colored::Colorize;
use gnss_rs::constellation::Constellation;
use gnss_rs::sv::SV;
use rustfft::num_complex::Complex64;
use std::path::PathBuf;

use crate::acquisition::{acquisition_window_samples, Acquisition};
use crate::almanac::Almanac;
use crate::control::{ControlMessage, ControlSender};
use crate::dump::DumpWriter;
use crate::ephemeris::Ephemeris;
use crate::framer::{FrameEvent, FrameSyncState, Framer};
use crate::iono::{IonoModel, UtcModel};
use crate::subframe::{SubframeFsm, SubframeOutput};
use crate::tracking::{Tracking, TrackingEvent};
use crate::types::{Synchro, TrackState};

/// Tracking-loop bandwidths and correlator spacing, threaded in from [`crate::config::Options`]
/// instead of being hardcoded per channel.
#[derive(Clone, Copy, Debug)]
pub struct LoopConfig {
    pub pll_bw_hz: f64,
    pub dll_bw_hz: f64,
    pub early_late_space_chips: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { pll_bw_hz: 25.0, dll_bw_hz: 2.0, early_late_space_chips: 0.5 }
    }
}

const HISTORY_NUM: usize = 20000;

#[derive(Default)]
pub struct History {
    pub doppler_hz_hist: Vec<f64>,
    pub cn0_hist: Vec<f64>,
}

/// Wires [`Tracking`] -> [`Framer`] -> [`SubframeFsm`] for one SV: one acquisition/tracking/NAV
/// pipeline per channel, with its own optional dump file.
pub struct Channel {
    pub sv: SV,
    fs: f64,
    acq: Acquisition,
    tracking: Tracking,
    framer: Framer,
    subframe_fsm: SubframeFsm,
    dump: Option<DumpWriter>,
    control_tx: ControlSender,

    pub eph: Option<Ephemeris>,
    pub iono: Option<IonoModel>,
    pub utc: Option<UtcModel>,
    pub almanac: Vec<Almanac>,

    pub last_synchro: Synchro,
    pub hist: History,
    acq_samples: Vec<Complex64>,
    sample_counter: u64,
    ts_sec: f64,
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(dump) = &mut self.dump {
            let _ = dump.flush();
        }
    }
}

impl Channel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        prn: u8,
        fs: f64,
        fi: f64,
        control_tx: ControlSender,
        dump_dir: Option<&PathBuf>,
        dump_filename: &str,
        loop_cfg: LoopConfig,
    ) -> Self {
        let sv = SV::new(Constellation::GPS, prn);
        let dump = dump_dir.and_then(|dir| {
            let path = dir.join(format!("{dump_filename}{prn}.dat"));
            DumpWriter::create(&path)
                .map_err(|e| log::warn!("{sv}: failed to open dump file: {e}"))
                .ok()
        });

        Self {
            sv,
            fs,
            acq: Acquisition::new(fs, fi),
            tracking: Tracking::new(prn, fs, fi, loop_cfg.pll_bw_hz, loop_cfg.dll_bw_hz, loop_cfg.early_late_space_chips),
            framer: Framer::new(),
            subframe_fsm: SubframeFsm::new(sv),
            dump,
            control_tx,
            eph: None,
            iono: None,
            utc: None,
            almanac: Vec::new(),
            last_synchro: Synchro::default(),
            hist: History::default(),
            acq_samples: Vec::new(),
            sample_counter: 0,
            ts_sec: 0.0,
        }
    }

    pub fn is_state_tracking(&self) -> bool {
        self.tracking.state == TrackState::Tracking
    }

    pub fn is_ephemeris_complete(&self) -> bool {
        self.eph.is_some()
    }

    fn run_acquisition(&mut self, iq_vec: &[Complex64]) {
        self.acq_samples.extend_from_slice(iq_vec);
        let window = acquisition_window_samples(self.fs);
        if self.acq_samples.len() < window {
            return;
        }
        let window_samples = self.acq_samples.split_off(self.acq_samples.len() - window);
        self.acq_samples.clear();

        if let Some(acq_result) = self.acq.try_acquire(self.sv.prn, &window_samples, self.sample_counter) {
            log::warn!(
                "{}: {} dopp={} code_phase={:.1} snr={:.1} ts_sec={:.3}",
                self.sv,
                "ACQUIRED".green(),
                acq_result.doppler_hz,
                acq_result.code_phase_samples,
                acq_result.corr_peak,
                self.ts_sec,
            );
            self.tracking.start_tracking(&acq_result, self.sample_counter);
        }
    }

    fn on_frame_event(&mut self, ev: &FrameEvent) {
        match self.subframe_fsm.push_event(ev, self.ts_sec) {
            SubframeOutput::Ephemeris(eph) => {
                log::info!("{}: ephemeris published iode={}", self.sv, eph.iode);
                self.eph = Some(eph);
            }
            SubframeOutput::IonoUtc => {
                self.iono = self.subframe_fsm.iono;
                self.utc = self.subframe_fsm.utc;
            }
            SubframeOutput::Almanac(alm) => {
                self.almanac.push(alm);
            }
            SubframeOutput::None => {}
        }
    }

    fn run_tracking(&mut self, iq_vec: &[Complex64]) {
        let (synchro, event, dump_record) = self.tracking.step(iq_vec, self.ts_sec);
        self.last_synchro = synchro;

        if synchro.flag_valid_tracking {
            let prompt_sign: i8 = if synchro.prompt_i >= 0.0 { 1 } else { -1 };
            for ev in self.framer.push_symbol(prompt_sign) {
                self.on_frame_event(&ev);
            }
        }

        if let Some(dump) = &mut self.dump {
            if let Err(e) = dump.write_epoch(&dump_record) {
                log::warn!("{}: dump write failed: {e}", self.sv);
            }
        }

        self.hist.doppler_hz_hist.push(synchro.carrier_doppler_hz);
        self.hist.cn0_hist.push(synchro.cn0_db_hz);
        if self.hist.doppler_hz_hist.len() > HISTORY_NUM {
            self.hist.doppler_hz_hist.remove(0);
            self.hist.cn0_hist.remove(0);
        }

        match event {
            TrackingEvent::CarrierLocked => {
                log::warn!(
                    "{}: {} cn0={:.1} ts_sec={:.3}",
                    self.sv,
                    "LOCK".green(),
                    synchro.cn0_db_hz,
                    self.ts_sec,
                );
                let _ = self.control_tx.try_send(ControlMessage::CarrierLock { sv: self.sv });
            }
            TrackingEvent::LossOfLock => {
                log::warn!(
                    "{}: {} cn0={:.1} ts_sec={:.3}",
                    self.sv,
                    "LOST".red(),
                    synchro.cn0_db_hz,
                    self.ts_sec,
                );
                let _ = self.control_tx.try_send(ControlMessage::LossOfLock {
                    sv: self.sv,
                    cn0_db_hz: synchro.cn0_db_hz,
                });
                self.framer = Framer::new();
                self.subframe_fsm = SubframeFsm::new(self.sv);
            }
            TrackingEvent::Anomaly => {
                log::warn!("{}: transient tracking anomaly, epoch skipped", self.sv);
            }
            TrackingEvent::None => {}
        }
    }

    pub fn process_samples(&mut self, iq_vec: &[Complex64], ts_sec: f64) {
        self.ts_sec = ts_sec;
        match self.tracking.state {
            TrackState::Acquisition | TrackState::Idle => self.run_acquisition(iq_vec),
            TrackState::PullIn | TrackState::Tracking => self.run_tracking(iq_vec),
        }
        self.sample_counter += iq_vec.len() as u64;
    }

    pub fn frame_sync_state(&self) -> FrameSyncState {
        self.framer.state()
    }
}
