use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use structopt::StructOpt;

use crate::recording::IQFileType;

/// Full CLI/config surface: front-end selection (file / rtl-sdr device / rtl_tcp network),
/// sample format, satellite selection, and tracking-loop/dump knobs.
#[derive(StructOpt, Debug, Clone, Serialize, Deserialize)]
#[structopt(name = "gnss-rcv", about = "GPS L1 C/A software receiver")]
pub struct Options {
    #[structopt(short = "g", long, help = "generate and print gold codes, then exit")]
    pub gen_gold_code: bool,

    #[structopt(short = "f", long, default_value = "resources/sample.dat")]
    pub file: PathBuf,

    #[structopt(short = "t", long, default_value = "2xf32")]
    pub iq_file_type: IQFileType,

    #[structopt(long, default_value = "2046000")]
    pub sample_rate: usize,

    #[structopt(long, default_value = "0.0")]
    pub intermediate_freq: f64,

    #[structopt(long, default_value = "0")]
    pub off_msec: usize,

    #[structopt(long, default_value = "0", help = "stop after N msec, 0 = run until EOF")]
    pub num_msec: usize,

    #[structopt(long, default_value = "", help = "comma-separated PRN list, empty = all 32")]
    pub sats: String,

    #[structopt(long, help = "use an attached rtl-sdr dongle instead of a file")]
    pub device: bool,

    #[structopt(long, default_value = "", help = "rtl_tcp hostname:port")]
    pub hostname: String,

    #[structopt(long, help = "write per-channel tracking dumps under this directory")]
    pub dump_dir: Option<PathBuf>,

    #[structopt(long, help = "enable per-channel tracking dump files")]
    pub dump: bool,

    #[structopt(long, default_value = "track_ch_", help = "dump file prefix; channel id and .dat are appended")]
    pub dump_filename: String,

    #[structopt(long, default_value = "gr_complex", help = "front-end sample item type (GNSS-SDR naming)")]
    pub input_item_type: String,

    #[structopt(long, default_value = "0.0", help = "RF front-end gain, dB")]
    pub gain: f64,

    #[structopt(long, default_value = "0.0", help = "RF stage gain, dB")]
    pub rf_gain: f64,

    #[structopt(long, default_value = "0.0", help = "IF stage gain, dB")]
    pub if_gain: f64,

    #[structopt(long = "AGC_enabled", help = "enable front-end automatic gain control")]
    pub agc_enabled: bool,

    #[structopt(long, default_value = "0", help = "stop after N samples, 0 = unbounded")]
    pub samples: u64,

    #[structopt(long, default_value = "25.0", help = "carrier PLL noise bandwidth, Hz")]
    pub pll_bw_hz: f64,

    #[structopt(long, default_value = "2.0", help = "code DLL noise bandwidth, Hz")]
    pub dll_bw_hz: f64,

    #[structopt(long, default_value = "0.5", help = "early/late correlator spacing, chips")]
    pub early_late_space_chips: f64,

    #[structopt(long, short = "v")]
    pub verbose: bool,
}

impl Options {
    pub fn signal(&self) -> &'static str {
        "L1CA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_all_satellites() {
        let opt = Options::from_iter_safe(["gnss-rcv"]).unwrap();
        assert!(opt.sats.is_empty());
        assert!(!opt.device);
    }
}
