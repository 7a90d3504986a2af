use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;

use crate::code::Code;
use crate::constants::{ACQUISITION_WINDOW_MSEC, SNR_THRESHOLD_LOCKED, TWO_PI};
use crate::types::AcqResult;

const DOPPLER_SPREAD_HZ: f64 = 8000.0;
const DOPPLER_SPREAD_BINS: usize = 160;

/// Coarse Doppler/code-phase search via FFT cross-correlation against the local PRN replica.
/// Produces the [`AcqResult`] the tracking loop needs to start pull-in; loop-filter/CN0 logic
/// lives entirely downstream in [`crate::tracking`].
pub struct Acquisition {
    fft_planner: FftPlanner<f64>,
    fs: f64,
    fi: f64,
}

impl Acquisition {
    pub fn new(fs: f64, fi: f64) -> Self {
        Self { fft_planner: FftPlanner::new(), fs, fi }
    }

    fn correlate_one_doppler(&mut self, signal: &[Complex64], code_fft: &[Complex64], doppler_hz: f64) -> Vec<f64> {
        let n = signal.len();
        let dphi = TWO_PI * (self.fi + doppler_hz) / self.fs;
        let mut wiped: Vec<Complex64> = signal
            .iter()
            .enumerate()
            .map(|(i, &s)| s * Complex64::new((dphi * i as f64).cos(), -(dphi * i as f64).sin()))
            .collect();

        let fft = self.fft_planner.plan_fft_forward(n);
        fft.process(&mut wiped);

        let mut prod: Vec<Complex64> =
            wiped.iter().zip(code_fft).map(|(a, b)| a * b.conj()).collect();

        let ifft = self.fft_planner.plan_fft_inverse(n);
        ifft.process(&mut prod);

        prod.iter().map(|c| c.norm_sqr() / (n * n) as f64).collect()
    }

    /// Searches `sig`'s first PRN's worth of `signal` (already trimmed to one code period at
    /// `fs`) across a Doppler grid, returning the best (prn, doppler, code-phase) hit if its
    /// peak-to-mean ratio clears [`SNR_THRESHOLD_LOCKED`]. `sample_stamp` is the receiver's
    /// running sample counter at the end of the search window, carried into [`AcqResult`] so the
    /// tracking loop can correct for Doppler-induced code drift accumulated since acquisition.
    pub fn try_acquire(&mut self, prn: u8, signal: &[Complex64], sample_stamp: u64) -> Option<AcqResult> {
        let n = signal.len();
        let mut code_fft: Vec<Complex64> = Code::chips(prn)
            .iter()
            .cycle()
            .take(n)
            .map(|&c| Complex64::new(c as f64, 0.0))
            .collect();
        let fft = self.fft_planner.plan_fft_forward(n);
        fft.process(&mut code_fft);

        let step_hz = 2.0 * DOPPLER_SPREAD_HZ / DOPPLER_SPREAD_BINS as f64;
        let mut best_peak = 0.0;
        let mut best_mean = f64::MAX;
        let mut best_doppler = 0.0;
        let mut best_idx = 0usize;

        for bin in 0..DOPPLER_SPREAD_BINS {
            let doppler_hz = -DOPPLER_SPREAD_HZ + bin as f64 * step_hz;
            let corr = self.correlate_one_doppler(signal, &code_fft, doppler_hz);
            let mean: f64 = corr.iter().sum::<f64>() / corr.len() as f64;
            let (idx, peak) = corr
                .iter()
                .enumerate()
                .fold((0, f64::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });

            if mean > 0.0 && peak / mean > best_peak / best_mean.max(1e-12) {
                best_peak = peak;
                best_mean = mean;
                best_doppler = doppler_hz;
                best_idx = idx;
            }
        }

        let snr_db = 10.0 * (best_peak / best_mean).log10();
        if snr_db >= SNR_THRESHOLD_LOCKED {
            let code_phase_chips = best_idx as f64 / n as f64 * crate::constants::PRN_CODE_LEN as f64;
            Some(AcqResult {
                prn,
                doppler_hz: best_doppler,
                code_phase_samples: code_phase_chips / crate::constants::GPS_L1_CA_CODE_RATE_HZ * self.fs,
                sample_stamp,
                system: 'G',
                corr_peak: snr_db,
            })
        } else {
            None
        }
    }
}

/// Samples needed for one [`ACQUISITION_WINDOW_MSEC`]-long search window at `fs`.
pub fn acquisition_window_samples(fs: f64) -> usize {
    (fs * ACQUISITION_WINDOW_MSEC as f64 / 1000.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_replica_acquires_with_zero_doppler() {
        let fs = crate::constants::GPS_L1_CA_CODE_RATE_HZ;
        let n = crate::constants::PRN_CODE_LEN;
        let signal: Vec<Complex64> =
            Code::chips(7).iter().map(|&c| Complex64::new(c as f64, 0.0)).collect();
        let mut acq = Acquisition::new(fs, 0.0);
        let res = acq.try_acquire(7, &signal, 0);
        assert!(res.is_some());
        assert_eq!(res.unwrap().prn, 7);
    }
}
