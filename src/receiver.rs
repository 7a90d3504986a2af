use gnss_rs::constellation::Constellation;
use gnss_rs::sv::SV;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::channel::{Channel, LoopConfig};
use crate::control::{control_bus, ControlMessage, ControlReceiver};
use crate::device::RtlSdrDevice;
use crate::network::RtlSdrTcp;
use crate::recording::IQFileType;
use crate::recording::IQRecording;
use crate::solver::PositionSolver;

const PERIOD_RCV: f64 = 0.001;
const CONTROL_BUS_CAPACITY: usize = 256;

pub type ReadIQFn = dyn FnMut(usize, usize) -> Result<Vec<Complex64>, Box<dyn std::error::Error>>;

pub struct Receiver {
    read_iq_fn: Box<ReadIQFn>,
    period_sp: usize,
    off_samples: usize,
    cached_iq_vec: Vec<Complex64>,
    cached_ts_sec_tail: f64,
    channels: HashMap<SV, Channel>,
    solver: PositionSolver,
    last_fix_sec: f64,
    exit_req: Arc<AtomicBool>,
    control_rx: ControlReceiver,
}

fn get_sat_list(sats: &str) -> Vec<SV> {
    let mut sat_vec = vec![];
    if !sats.is_empty() {
        for s in sats.split(',') {
            let prn = s.parse::<u8>().unwrap();
            sat_vec.push(SV::new(Constellation::GPS, prn));
        }
    } else {
        for prn in 1..=32_u8 {
            sat_vec.push(SV::new(Constellation::GPS, prn));
        }
    }
    sat_vec
}

fn get_reader_fn(
    use_device: bool,
    hostname: &str,
    sig: &str,
    fs: f64,
    file: &Path,
    iq_file_type: &IQFileType,
    exit_req: Arc<AtomicBool>,
) -> Option<Box<ReadIQFn>> {
    if use_device {
        let res = RtlSdrDevice::new(sig, fs);
        if res.is_err() {
            log::warn!("Failed to open rtl-sdr device.");
            return None;
        }
        let mut dev = res.unwrap();
        Some(Box::new(move |_off_samples, num_samples| dev.read_iq_data(num_samples)))
    } else if !hostname.is_empty() {
        let mut net = RtlSdrTcp::new(hostname, exit_req.clone(), sig, fs).unwrap();
        log::warn!("Using rtl_tcp backend: {}", hostname);
        Some(Box::new(move |_off_samples, num_samples| net.read_iq_data(num_samples)))
    } else {
        let mut recording = IQRecording::new(file, fs, iq_file_type);
        Some(Box::new(move |off_samples, num_samples| recording.read_iq_file(off_samples, num_samples)))
    }
}

impl Receiver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        use_device: bool,
        hostname: &str,
        file: &Path,
        iq_file_type: &IQFileType,
        fs: f64,
        fi: f64,
        off_msec: usize,
        sig: &str,
        sats: &str,
        dump_dir: Option<PathBuf>,
        dump_filename: &str,
        loop_cfg: LoopConfig,
        exit_req: Arc<AtomicBool>,
    ) -> Self {
        let period_sp = (PERIOD_RCV * fs) as usize;
        let (control_tx, control_rx) = control_bus(CONTROL_BUS_CAPACITY);
        let mut channels = HashMap::<SV, Channel>::new();

        for sv in get_sat_list(sats) {
            channels.insert(
                sv,
                Channel::new(sv.prn, fs, fi, control_tx.clone(), dump_dir.as_ref(), dump_filename, loop_cfg),
            );
        }

        let read_iq_fn =
            get_reader_fn(use_device, hostname, sig, fs, file, iq_file_type, exit_req.clone()).unwrap();

        Self {
            read_iq_fn,
            period_sp,
            off_samples: off_msec * period_sp,
            cached_iq_vec: Vec::<Complex64>::new(),
            cached_ts_sec_tail: 0.0,
            channels,
            solver: PositionSolver::new(),
            last_fix_sec: 0.0,
            exit_req,
            control_rx,
        }
    }

    fn fetch_samples_msec(&mut self) -> Result<(Vec<Complex64>, f64), Box<dyn std::error::Error>> {
        let num_samples = if self.cached_iq_vec.is_empty() { 2 * self.period_sp } else { self.period_sp };

        let mut iq_vec = (self.read_iq_fn)(self.off_samples, num_samples)?;

        self.off_samples += num_samples;
        self.cached_iq_vec.append(&mut iq_vec);
        self.cached_ts_sec_tail += num_samples as f64 / (1000.0 * self.period_sp as f64);

        if self.cached_iq_vec.len() > 2 * self.period_sp {
            let num_samples = self.period_sp;
            let _ = self.cached_iq_vec.drain(0..num_samples);
        }
        let len = self.cached_iq_vec.len();

        Ok((self.cached_iq_vec[len - 2 * self.period_sp..].to_vec(), self.cached_ts_sec_tail - 0.001))
    }

    fn drain_control_bus(&mut self) {
        while let Ok(msg) = self.control_rx.try_recv() {
            match msg {
                ControlMessage::LossOfLock { sv, cn0_db_hz } => {
                    log::debug!("{sv}: control-bus loss-of-lock cn0={cn0_db_hz:.1}");
                }
                ControlMessage::CarrierLock { sv } => {
                    log::debug!("{sv}: control-bus carrier-lock");
                }
            }
        }
    }

    fn compute_fix(&mut self, ts_sec: f64) {
        if ts_sec - self.last_fix_sec < 2.0 {
            return;
        }

        let ephs: Vec<_> = self
            .channels
            .values()
            .filter(|&ch| ch.is_state_tracking())
            .filter(|&ch| ch.is_ephemeris_complete())
            .map(|ch| ch.eph.unwrap())
            .collect();

        if ephs.len() < 4 {
            return;
        }

        log::warn!("t={ts_sec:.3} -- attempting fix with {} SVs", ephs.len());
        self.solver.get_position(ts_sec, &ephs);
        self.last_fix_sec = ts_sec;
    }

    fn process_step(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (iq_vec, ts_sec) = self.fetch_samples_msec()?;

        self.channels
            .par_iter_mut()
            .for_each(|(_id, channel)| channel.process_samples(&iq_vec, ts_sec));

        self.drain_control_bus();
        self.compute_fix(ts_sec);

        Ok(())
    }

    pub fn run_loop(&mut self, num_msec: usize) {
        let mut n = 0;
        loop {
            if self.process_step().is_err() {
                break;
            }
            if self.exit_req.load(Ordering::SeqCst) {
                log::info!("exit requested");
                break;
            }
            n += 1;
            if num_msec != 0 && n >= num_msec {
                break;
            }
        }
    }
}
