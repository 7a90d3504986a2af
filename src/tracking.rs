use std::collections::VecDeque;

use rustfft::num_complex::Complex64;

use crate::code::Code;
use crate::constants::{
    CARRIER_LOCK_THRESHOLD, CN0_ESTIMATION_SAMPLES, GPS_L1_CA_CODE_RATE_HZ, L1CA_HZ,
    MAXIMUM_LOCK_FAIL_COUNTER, MINIMUM_VALID_CN0, PRN_CODE_LEN, TWO_PI,
};
use crate::discriminator::{CorrelationSample, DiscriminatorController, LoopFilterController};
use crate::dump::DumpRecord;
use crate::types::{AcqResult, Synchro, TrackState};

/// Runs the carrier/code tracking loop for a single PRN: carrier wipe-off, E/P/L correlation,
/// pull-in, NCO update, CN0 and carrier-lock estimation.
pub struct Tracking {
    pub prn: u8,
    fs: f64,
    fi: f64,
    code_len: f64, // code chips per code period (1023 for L1CA)
    code_rate_hz: f64,
    code_period_sec: f64,
    early_late_spc_chips: f64,
    local_code: Vec<Complex64>, // upsampled, padded +-early_late_spc_chips on either side
    samples_per_code: usize,
    pad_samples: usize,

    pub state: TrackState,
    carrier_doppler_hz: f64,
    code_freq_hz: f64,
    carrier_phase_rad: f64,
    code_phase_samples: f64,     // running code phase, wrapped into [0, T_prn_true_samples)
    rem_code_phase_samples: f64, // NCO fractional leftover carried into the next step
    current_prn_len: usize,      // samples consumed by the step in progress
    next_prn_len: usize,         // samples the following step will consume

    acq_sample_stamp: u64,
    acq_trk_diff: f64,
    acq_code_phase_samples: f64,
    pull_in: bool,

    sample_counter: u64,
    sample_counter_seconds: f64,

    discriminator: Box<dyn DiscriminatorController + Send>,

    lock_fail_counter: u32,
    locked_announced: bool,
    cn0_db_hz: f64,
    carrier_lock_test: f64,
    prompt_window: VecDeque<Complex64>,
    step_count: u64,

    last_carrier_error_hz: f64,
    last_code_error_chips: f64,

    ts_sec: f64,
}

/// Tracking state transitions the channel needs to react to (dump flush, subframe reset, ...).
pub enum TrackingEvent {
    None,
    CarrierLocked,
    LossOfLock,
    /// A transient DSP anomaly (NaN correlation output): absorbed by the loop, warning-logged,
    /// no state change. Distinct from [`TrackingEvent::LossOfLock`], which is a sustained,
    /// counted failure to hold lock.
    Anomaly,
}

impl Tracking {
    pub fn new(prn: u8, fs: f64, fi: f64, pll_bw_hz: f64, dll_bw_hz: f64, early_late_spc_chips: f64) -> Self {
        let samples_per_code = (fs * 1e-3).round() as usize;
        Self {
            prn,
            fs,
            fi,
            code_len: PRN_CODE_LEN as f64,
            code_rate_hz: GPS_L1_CA_CODE_RATE_HZ,
            code_period_sec: 1e-3,
            early_late_spc_chips,
            local_code: Vec::new(),
            samples_per_code,
            pad_samples: 0,
            state: TrackState::Acquisition,
            carrier_doppler_hz: 0.0,
            code_freq_hz: GPS_L1_CA_CODE_RATE_HZ,
            carrier_phase_rad: 0.0,
            code_phase_samples: 0.0,
            rem_code_phase_samples: 0.0,
            current_prn_len: samples_per_code,
            next_prn_len: samples_per_code,
            acq_sample_stamp: 0,
            acq_trk_diff: 0.0,
            acq_code_phase_samples: 0.0,
            pull_in: false,
            sample_counter: 0,
            sample_counter_seconds: 0.0,
            discriminator: Box::new(LoopFilterController::new(pll_bw_hz, dll_bw_hz)),
            lock_fail_counter: 0,
            locked_announced: false,
            cn0_db_hz: 0.0,
            carrier_lock_test: 0.0,
            prompt_window: VecDeque::with_capacity(CN0_ESTIMATION_SAMPLES),
            step_count: 0,
            last_carrier_error_hz: 0.0,
            last_code_error_chips: 0.0,
            ts_sec: 0.0,
        }
    }

    /// Seeds the loop from an acquisition result and rebuilds the local-code replica for `fs`.
    /// `sample_counter` is the receiver's running sample count at the moment tracking is started;
    /// together with `acq.sample_stamp` it measures how much Doppler-induced code drift has
    /// built up since the acquisition search window closed.
    pub fn start_tracking(&mut self, acq: &AcqResult, sample_counter: u64) {
        self.local_code = Code::chips_upsampled_padded(self.prn, self.fs, self.early_late_spc_chips);
        self.pad_samples = (self.local_code.len() - self.samples_per_code) / 2;

        self.acq_sample_stamp = acq.sample_stamp;
        self.sample_counter = sample_counter;
        self.sample_counter_seconds = sample_counter as f64 / self.fs;
        self.acq_trk_diff = (sample_counter as i64 - acq.sample_stamp as i64) as f64;

        self.carrier_doppler_hz = acq.doppler_hz;
        self.code_freq_hz = self.code_rate_hz * (1.0 + acq.doppler_hz / L1CA_HZ);
        self.carrier_phase_rad = 0.0;

        let corrected = doppler_corrected_code_phase(acq.code_phase_samples, acq.doppler_hz, self.acq_trk_diff, self.fs);
        self.acq_code_phase_samples = corrected;
        self.code_phase_samples = corrected;
        self.rem_code_phase_samples = 0.0;

        self.discriminator.reset();
        self.lock_fail_counter = 0;
        self.locked_announced = false;
        self.cn0_db_hz = 0.0;
        self.carrier_lock_test = 0.0;
        self.prompt_window.clear();
        self.step_count = 0;

        self.next_prn_len = self.samples_per_code;
        self.current_prn_len = self.samples_per_code;
        self.pull_in = true;
        self.state = TrackState::PullIn;
    }

    fn correlate(&self, signal: &[Complex64], tap_offset_chips: f64) -> Complex64 {
        let samples_per_chip = self.fs / self.code_rate_hz;
        let shift_samples = (tap_offset_chips * samples_per_chip).round() as isize;
        let base = self.pad_samples as isize + shift_samples;

        let mut acc = Complex64::new(0.0, 0.0);
        for (i, &s) in signal.iter().enumerate() {
            let idx = base + i as isize;
            if idx < 0 || idx as usize >= self.local_code.len() {
                continue;
            }
            acc += s * self.local_code[idx as usize];
        }
        acc / signal.len() as f64
    }

    fn wipe_carrier(&mut self, signal: &[Complex64]) -> Vec<Complex64> {
        let fc = self.fi + self.carrier_doppler_hz;
        let dphi = TWO_PI * fc / self.fs;
        let mut out = Vec::with_capacity(signal.len());
        let mut phase = self.carrier_phase_rad;
        for &s in signal {
            let nco = Complex64::new(phase.cos(), -phase.sin());
            out.push(s * nco);
            phase += dphi;
        }
        self.carrier_phase_rad = phase % TWO_PI;
        out
    }

    /// Runs one code-period (~1 msec) tracking step over `signal`, a window at least
    /// `local_code.len()` samples wide centered on the current code phase. The first call after
    /// [`Tracking::start_tracking`] performs the one-step pull-in realignment instead of
    /// correlating, per the `{Disabled -> PullIn -> Tracking -> Disabled}` state machine.
    pub fn step(&mut self, signal: &[Complex64], ts_sec: f64) -> (Synchro, TrackingEvent, DumpRecord) {
        self.ts_sec = ts_sec;

        if self.pull_in {
            let (_shift, consume) =
                pull_in_shift_and_consume(self.acq_sample_stamp, self.sample_counter, self.acq_code_phase_samples, self.next_prn_len as u64);
            self.sample_counter += consume as u64;
            self.sample_counter_seconds += consume as f64 / self.fs;
            self.pull_in = false;
            self.state = TrackState::Tracking;
            return (Synchro::default(), TrackingEvent::None, DumpRecord::default());
        }

        let wiped = self.wipe_carrier(signal);

        let early = self.correlate(&wiped, self.early_late_spc_chips / 2.0);
        let prompt = self.correlate(&wiped, 0.0);
        let late = self.correlate(&wiped, -self.early_late_spc_chips / 2.0);

        if [early.re, early.im, prompt.re, prompt.im, late.re, late.im].iter().any(|v| v.is_nan()) {
            log::warn!("{}: transient DSP anomaly (NaN correlation), skipping epoch", self.prn);
            self.sample_counter += self.current_prn_len as u64;
            self.sample_counter_seconds += self.current_prn_len as f64 / self.fs;
            return (Synchro::default(), TrackingEvent::Anomaly, DumpRecord::default());
        }

        let corr = CorrelationSample { early, prompt, late };
        let correction = self.discriminator.step(corr, self.code_period_sec, self.carrier_doppler_hz);
        self.carrier_doppler_hz = correction.new_doppler_hz;
        self.code_freq_hz = self.code_rate_hz * (1.0 + self.carrier_doppler_hz / L1CA_HZ);
        self.last_carrier_error_hz = correction.carrier_error_hz;
        self.last_code_error_chips = correction.code_error_chips;

        // NCO accounting: the PRN period at the Doppler-aided code frequency rarely divides
        // evenly into samples, so the leftover fraction is carried forward to the next step.
        let t_chip = 1.0 / self.code_freq_hz;
        let t_prn = t_chip * self.code_len;
        let k_blk = t_prn * self.fs + self.rem_code_phase_samples;
        self.next_prn_len = k_blk.round() as usize;
        let next_rem_code_phase = k_blk - self.next_prn_len as f64;

        let t_prn_true_samples = self.fs * self.code_len / self.code_rate_hz;
        self.code_phase_samples = (self.code_phase_samples + (k_blk - t_prn_true_samples)).rem_euclid(t_prn_true_samples);

        self.sample_counter += self.current_prn_len as u64;
        self.sample_counter_seconds += self.current_prn_len as f64 / self.fs;
        self.current_prn_len = self.next_prn_len;
        self.rem_code_phase_samples = next_rem_code_phase;

        self.prompt_window.push_back(prompt);
        if self.prompt_window.len() > CN0_ESTIMATION_SAMPLES {
            self.prompt_window.pop_front();
        }
        self.step_count += 1;
        if self.step_count % CN0_ESTIMATION_SAMPLES as u64 == 0 && self.prompt_window.len() == CN0_ESTIMATION_SAMPLES {
            let samples: Vec<Complex64> = self.prompt_window.iter().copied().collect();
            let (cn0_db_hz, lock_test) = snv_cn0_estimator(&samples, self.code_period_sec);
            self.cn0_db_hz = cn0_db_hz;
            self.carrier_lock_test = lock_test;
        }

        let mut event = TrackingEvent::None;
        if self.state == TrackState::Tracking {
            if self.cn0_db_hz < MINIMUM_VALID_CN0 || self.carrier_lock_test < CARRIER_LOCK_THRESHOLD {
                self.lock_fail_counter += 1;
            } else if self.lock_fail_counter > 0 {
                self.lock_fail_counter -= 1;
            }

            if self.lock_fail_counter > MAXIMUM_LOCK_FAIL_COUNTER {
                self.state = TrackState::Idle;
                event = TrackingEvent::LossOfLock;
            } else if !self.locked_announced && self.lock_fail_counter == 0 && self.step_count >= CN0_ESTIMATION_SAMPLES as u64 {
                self.locked_announced = true;
                event = TrackingEvent::CarrierLocked;
            }
        }

        let synchro = Synchro {
            prn: self.prn,
            prompt_i: prompt.re,
            prompt_q: prompt.im,
            carrier_phase_rad: self.carrier_phase_rad,
            carrier_doppler_hz: self.carrier_doppler_hz,
            code_phase_chips: self.code_phase_samples / self.fs * self.code_rate_hz,
            cn0_db_hz: self.cn0_db_hz,
            carrier_lock_test: self.carrier_lock_test,
            tracking_timestamp_secs: ts_sec,
            flag_valid_tracking: self.state == TrackState::Tracking,
        };

        let dump = DumpRecord {
            early_mag: early.norm() as f32,
            prompt_mag: prompt.norm() as f32,
            late_mag: late.norm() as f32,
            prompt_i: prompt.re as f32,
            prompt_q: prompt.im as f32,
            sample_counter: self.sample_counter,
            acc_carrier_phase_rad: self.carrier_phase_rad as f32,
            carrier_doppler_hz: self.carrier_doppler_hz as f32,
            code_freq_hz: self.code_freq_hz as f32,
            carr_error: self.last_carrier_error_hz as f32,
            carr_nco: (self.fi + self.carrier_doppler_hz) as f32,
            code_error: self.last_code_error_chips as f32,
            code_nco: self.code_freq_hz as f32,
            cn0_db_hz: self.cn0_db_hz as f32,
            carrier_lock_test: self.carrier_lock_test as f32,
            sample_counter_seconds: self.sample_counter_seconds,
        };

        (synchro, event, dump)
    }
}

/// Pull-in realignment (spec's one-step `PullIn` state): how far to shift the acquisition code
/// phase and how many samples to consume so the next step starts exactly on a PRN boundary.
pub fn pull_in_shift_and_consume(acq_sample_stamp: u64, sample_counter: u64, acq_code_phase_samples: f64, next_prn_len: u64) -> (i64, usize) {
    let acq_to_trk_delay = sample_counter as i64 - acq_sample_stamp as i64;
    let modulo = acq_to_trk_delay.rem_euclid(next_prn_len as i64);
    let shift = next_prn_len as i64 - modulo;
    let consume = (acq_code_phase_samples + shift as f64).round() as usize;
    (shift, consume)
}

/// Corrects the acquisition code phase for Doppler-induced PRN-period drift accumulated between
/// the acquisition sample stamp and the first tracking step.
pub fn doppler_corrected_code_phase(acq_code_phase_samples: f64, doppler_hz: f64, acq_trk_diff_samples: f64, fs_in: f64) -> f64 {
    let radial_velocity = 1.0 + doppler_hz / L1CA_HZ;
    let t_prn_mod = (1.0 / (radial_velocity * GPS_L1_CA_CODE_RATE_HZ)) * PRN_CODE_LEN as f64;
    let t_prn_true = PRN_CODE_LEN as f64 / GPS_L1_CA_CODE_RATE_HZ;
    let t_prn_true_samples = t_prn_true * fs_in;
    (acq_code_phase_samples + (t_prn_true - t_prn_mod) * (acq_trk_diff_samples / t_prn_true) * fs_in).rem_euclid(t_prn_true_samples)
}

/// Signal/noise-variance CN0 estimator (moment-based, ICD-independent) and the narrowband power
/// ratio carrier-lock test, both computed over the last [`CN0_ESTIMATION_SAMPLES`] Prompt values.
pub fn snv_cn0_estimator(prompts: &[Complex64], t_prn_sec: f64) -> (f64, f64) {
    let n = prompts.len() as f64;
    let p_avg = prompts.iter().map(|p| p.norm_sqr()).sum::<f64>() / n;
    let p2_avg = prompts.iter().map(|p| p.norm_sqr() * p.norm_sqr()).sum::<f64>() / n;
    let nbd = p2_avg / (p_avg * p_avg);
    let p_d = (2.0 * nbd - 2.0).max(1e-9).sqrt();
    let p_n = (p_avg - p_d).max(1e-9);
    let cn0_db_hz = 10.0 * (p_d / p_n / t_prn_sec).log10();
    let lock_test = (1.0 - 1.0 / nbd).clamp(0.0, 1.0);
    (cn0_db_hz, lock_test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tracking() -> Tracking {
        Tracking::new(1, 4.0 * crate::constants::GPS_L1_CA_CODE_RATE_HZ, 0.0, 25.0, 2.0, 0.5)
    }

    fn acq(doppler_hz: f64, code_phase_samples: f64, sample_stamp: u64) -> AcqResult {
        AcqResult { prn: 1, doppler_hz, code_phase_samples, sample_stamp, system: 'G', corr_peak: 10.0 }
    }

    #[test]
    fn start_tracking_seeds_from_acquisition() {
        let mut trk = make_tracking();
        trk.start_tracking(&acq(1500.0, 100.0, 0), 0);
        assert_eq!(trk.state, TrackState::PullIn);
        assert_eq!(trk.carrier_doppler_hz, 1500.0);
    }

    /// Literal pull-in scenario: acq_sample_stamp=1000, sample_counter=2000, acq_code_phase=512,
    /// next_prn_len=2046 -> shift=1046, consume=round(1558).
    #[test]
    fn pull_in_shift_matches_literal_scenario() {
        let (shift, consume) = pull_in_shift_and_consume(1000, 2000, 512.0, 2046);
        assert_eq!(shift, 1046);
        assert_eq!(consume, 1558);
    }

    #[test]
    fn pull_in_consumes_samples_and_enters_tracking() {
        let mut trk = make_tracking();
        trk.start_tracking(&acq(0.0, 512.0, 1000), 2000);
        let len = trk.local_code.len();
        let signal = vec![Complex64::new(0.0, 0.0); len];
        let before = trk.sample_counter;
        let (_s, ev, _d) = trk.step(&signal, 0.0);
        assert!(matches!(ev, TrackingEvent::None));
        assert_eq!(trk.state, TrackState::Tracking);
        assert!(trk.sample_counter > before);
    }

    #[test]
    fn nan_correlation_is_a_transient_anomaly_not_loss_of_lock() {
        let mut trk = make_tracking();
        trk.start_tracking(&acq(0.0, 0.0, 0), 0);
        let len = trk.local_code.len();
        let signal = vec![Complex64::new(0.0, 0.0); len];
        let _ = trk.step(&signal, 0.0); // consume pull-in step
        let signal = vec![Complex64::new(f64::NAN, 0.0); len];
        let (_s, ev, _d) = trk.step(&signal, 0.0);
        assert!(matches!(ev, TrackingEvent::Anomaly));
        assert_eq!(trk.state, TrackState::Tracking);
    }

    #[test]
    fn lock_fail_counter_requires_strictly_more_than_fifty() {
        let mut trk = make_tracking();
        trk.start_tracking(&acq(0.0, 0.0, 0), 0);
        let len = trk.local_code.len();
        let signal = vec![Complex64::new(0.0, 0.0); len];
        let _ = trk.step(&signal, 0.0); // consume pull-in step

        trk.state = TrackState::Tracking;
        trk.lock_fail_counter = MAXIMUM_LOCK_FAIL_COUNTER;
        trk.cn0_db_hz = 20.0; // below MINIMUM_VALID_CN0, keeps failing
        trk.carrier_lock_test = 0.0;
        let signal = vec![Complex64::new(0.0, 0.0); len];
        let (_s, ev, _d) = trk.step(&signal, 0.0);
        assert!(matches!(ev, TrackingEvent::LossOfLock));
        assert_eq!(trk.lock_fail_counter, MAXIMUM_LOCK_FAIL_COUNTER + 1);
    }

    #[test]
    fn snv_estimator_reports_finite_values_for_noisy_prompts() {
        let prompts: Vec<Complex64> = (0..20)
            .map(|i| Complex64::new(10.0 + (i as f64 * 0.37).sin(), (i as f64 * 0.19).cos()))
            .collect();
        let (cn0, lock_test) = snv_cn0_estimator(&prompts, 1e-3);
        assert!(cn0.is_finite());
        assert!((0.0..=1.0).contains(&lock_test));
    }
}
