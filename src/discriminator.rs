use rustfft::num_complex::Complex64;

use crate::constants::{PI, PRN_CODE_LEN};

/// Early/Prompt/Late correlator outputs for one integration step.
#[derive(Clone, Copy, Default)]
pub struct CorrelationSample {
    pub early: Complex64,
    pub prompt: Complex64,
    pub late: Complex64,
}

/// Carrier/code corrections produced by one discriminator step. `new_doppler_hz` is the updated
/// absolute carrier Doppler the tracking loop should adopt for the next NCO update -- both the
/// in-process and network-offloaded controllers must produce it, per the `step(E,P,L,acq_doppler)
/// -> (carr_err, code_err, new_doppler)` contract.
#[derive(Clone, Copy, Default)]
pub struct LoopCorrection {
    pub carrier_error_hz: f64,
    pub code_error_chips: f64,
    pub new_doppler_hz: f64,
}

/// Abstracts the PLL/DLL discriminator + loop filter pair so [`crate::tracking::Tracking`] can
/// run either in-process or against a network-offloaded implementation without branching.
pub trait DiscriminatorController {
    fn step(&mut self, corr: CorrelationSample, code_period_sec: f64, current_doppler_hz: f64) -> LoopCorrection;
    fn reset(&mut self);
}

/// Costas PLL + non-coherent early-minus-late DLL, first-order loop filters, run in-process.
pub struct LoopFilterController {
    pll_bw_hz: f64,
    dll_bw_hz: f64,
    prev_phase_error: f64,
}

impl LoopFilterController {
    pub fn new(pll_bw_hz: f64, dll_bw_hz: f64) -> Self {
        Self { pll_bw_hz, dll_bw_hz, prev_phase_error: 0.0 }
    }
}

impl DiscriminatorController for LoopFilterController {
    fn step(&mut self, corr: CorrelationSample, code_period_sec: f64, current_doppler_hz: f64) -> LoopCorrection {
        // Costas discriminator: immune to a 180-degree NAV-bit phase flip.
        let carrier_err = if corr.prompt.re != 0.0 {
            (corr.prompt.im / corr.prompt.re).atan() / TWO_PI
        } else {
            0.0
        };
        let wn = self.pll_bw_hz / 0.53;
        let carrier_error_hz =
            1.4 * wn * (carrier_err - self.prev_phase_error) + wn * wn * carrier_err * code_period_sec;
        self.prev_phase_error = carrier_err;

        // Non-coherent early-minus-late, normalized by early+late power.
        let e = corr.early.norm();
        let l = corr.late.norm();
        let code_discriminator = if e + l > 0.0 { (e - l) / (e + l) } else { 0.0 };
        let wn_dll = self.dll_bw_hz / 0.25;
        let code_error_chips = wn_dll * code_discriminator * code_period_sec / PRN_CODE_LEN as f64;

        LoopCorrection {
            carrier_error_hz,
            code_error_chips,
            new_doppler_hz: current_doppler_hz + carrier_error_hz,
        }
    }

    fn reset(&mut self) {
        self.prev_phase_error = 0.0;
    }
}

const TWO_PI: f64 = 2.0 * PI;

/// Network-offloaded discriminator: ships E/P/L + the current acquisition Doppler to a remote
/// loop-filter process as a length-prefixed float32 record and reads back the correction
/// (carrier error, code error, updated Doppler) in the same framing.
pub struct TcpDiscriminatorController {
    stream: std::net::TcpStream,
    channel_id: u32,
}

/// Wire record: control_id, E.re, E.im, L.re, L.im, P.re, P.im, acq_doppler_hz, enable_flag.
pub const NUM_TX_VARIABLES_GPS_L1_CA: usize = 9;
/// Reply record: carr_error_hz, code_error_chips, new_doppler_hz.
const NUM_RX_VARIABLES_GPS_L1_CA: usize = 3;

impl TcpDiscriminatorController {
    pub fn connect(host_base_port: u16, channel_id: u32) -> std::io::Result<Self> {
        let port = host_base_port + channel_id as u16;
        let stream = std::net::TcpStream::connect(("127.0.0.1", port))?;
        Ok(Self { stream, channel_id })
    }

    fn write_record(&mut self, values: &[f32]) -> std::io::Result<()> {
        use std::io::Write;
        self.stream.write_all(&(values.len() as u32).to_le_bytes())?;
        for v in values {
            self.stream.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    fn read_record(&mut self, expected_len: usize) -> std::io::Result<Vec<f32>> {
        use std::io::Read;
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;
        if len != expected_len {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "unexpected record length"));
        }
        let mut payload = vec![0u8; len * 4];
        self.stream.read_exact(&mut payload)?;
        Ok(payload.chunks_exact(4).map(|c| f32::from_le_bytes(c.try_into().unwrap())).collect())
    }
}

impl DiscriminatorController for TcpDiscriminatorController {
    fn step(&mut self, corr: CorrelationSample, _code_period_sec: f64, current_doppler_hz: f64) -> LoopCorrection {
        let record: [f32; NUM_TX_VARIABLES_GPS_L1_CA] = [
            self.channel_id as f32,
            corr.early.re as f32,
            corr.early.im as f32,
            corr.late.re as f32,
            corr.late.im as f32,
            corr.prompt.re as f32,
            corr.prompt.im as f32,
            current_doppler_hz as f32,
            1.0,
        ];
        if self.write_record(&record).is_err() {
            return LoopCorrection { new_doppler_hz: current_doppler_hz, ..Default::default() };
        }

        match self.read_record(NUM_RX_VARIABLES_GPS_L1_CA) {
            Ok(reply) => LoopCorrection {
                carrier_error_hz: reply[0] as f64,
                code_error_chips: reply[1] as f64,
                new_doppler_hz: reply[2] as f64,
            },
            Err(_) => LoopCorrection { new_doppler_hz: current_doppler_hz, ..Default::default() },
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_error_on_perfect_lock() {
        let mut ctl = LoopFilterController::new(10.0, 0.5);
        let corr = CorrelationSample {
            early: Complex64::new(0.5, 0.0),
            prompt: Complex64::new(1.0, 0.0),
            late: Complex64::new(0.5, 0.0),
        };
        let c = ctl.step(corr, 0.001, 1500.0);
        assert!(c.carrier_error_hz.abs() < 1e-9);
        assert!(c.code_error_chips.abs() < 1e-9);
        assert!((c.new_doppler_hz - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn early_late_imbalance_signals_code_error() {
        let mut ctl = LoopFilterController::new(10.0, 0.5);
        let corr = CorrelationSample {
            early: Complex64::new(0.8, 0.0),
            prompt: Complex64::new(1.0, 0.0),
            late: Complex64::new(0.2, 0.0),
        };
        let c = ctl.step(corr, 0.001, 0.0);
        assert!(c.code_error_chips != 0.0);
    }
}
