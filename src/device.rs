use rustfft::num_complex::Complex64;

use crate::code::Code;

/// RTL-SDR dongle front end. Gain/AGC/sample-rate knobs mirror the signal-source adapter's
/// configuration surface (`AGC_enabled`, `rf_gain`, `if_gain`, `samples_per_second`).
pub struct RtlSdrDevice {
    #[cfg(target_os = "linux")]
    reader: rtlsdr_mt::Reader,
    #[cfg(target_os = "linux")]
    ctl: rtlsdr_mt::Controller,
}

impl RtlSdrDevice {
    #[cfg(target_os = "linux")]
    pub fn new(sig: &str, fs: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let (mut ctl, reader) = rtlsdr_mt::open(0)?;
        ctl.enable_agc()?;
        ctl.set_ppm(0)?;
        ctl.set_center_freq(Code::get_code_freq(sig) as u32)?;
        ctl.set_sample_rate(fs as u32);
        Ok(Self { reader, ctl })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn new(_sig: &str, _fs: f64) -> Result<Self, Box<dyn std::error::Error>> {
        Err("rtl-sdr device support is only available on linux".into())
    }

    #[cfg(target_os = "linux")]
    pub fn read_iq_data(&mut self, num_samples: usize) -> Result<Vec<Complex64>, Box<dyn std::error::Error>> {
        let mut out = Vec::with_capacity(num_samples);
        self.reader.read_async(4, 2 * num_samples as u32, |bytes| {
            for chunk in bytes.chunks_exact(2) {
                let re = (chunk[0] as f64 - 127.5) / 128.0;
                let im = (chunk[1] as f64 - 127.5) / 128.0;
                out.push(Complex64::new(re, im));
                if out.len() >= num_samples {
                    break;
                }
            }
        })?;
        Ok(out)
    }

    #[cfg(not(target_os = "linux"))]
    pub fn read_iq_data(&mut self, _num_samples: usize) -> Result<Vec<Complex64>, Box<dyn std::error::Error>> {
        Err("rtl-sdr device support is only available on linux".into())
    }
}
