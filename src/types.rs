use rustfft::num_complex::Complex64;

pub type Sample = Complex64;

#[derive(Default, Clone, Copy)]
pub struct GnssCorrelationParam {
    pub doppler_hz: i32,
    pub phase_offset: usize,
    pub snr: f64,
    pub corr_norm: f64,
}

/// Output of the acquisition stage, handed to [`crate::tracking::Tracking::start_tracking`].
/// `sample_stamp` is the receiver sample counter at which the acquisition search window ended;
/// the pull-in delay correction needs it to know how much Doppler-induced code drift has
/// accumulated between acquisition and the first tracking step.
#[derive(Default, Clone, Copy, Debug)]
pub struct AcqResult {
    pub prn: u8,
    pub doppler_hz: f64,
    pub code_phase_samples: f64,
    pub sample_stamp: u64,
    pub system: char,
    pub corr_peak: f64,
}

/// One channel's running state, published on every correlation epoch. Names follow
/// GNSS-SDR's `Gnss_Synchro` record.
#[derive(Default, Clone, Copy, Debug)]
pub struct Synchro {
    pub prn: u8,
    pub prompt_i: f64,
    pub prompt_q: f64,
    pub carrier_phase_rad: f64,
    pub carrier_doppler_hz: f64,
    pub code_phase_chips: f64,
    pub cn0_db_hz: f64,
    pub carrier_lock_test: f64,
    pub tracking_timestamp_secs: f64,
    pub flag_valid_tracking: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrackState {
    Acquisition,
    PullIn,
    Tracking,
    Idle,
}
