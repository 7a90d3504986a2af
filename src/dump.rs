use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One tracking epoch's dump record. Field order and types follow the tracking block's own
/// dump-file write sequence: correlator magnitudes, Prompt I/Q, sample counter, carrier/code NCO
/// state, discriminator outputs, CN0 and lock test, a reserved slot, and a float64 timestamp.
#[derive(Default, Clone, Copy)]
pub struct DumpRecord {
    pub early_mag: f32,
    pub prompt_mag: f32,
    pub late_mag: f32,
    pub prompt_i: f32,
    pub prompt_q: f32,
    pub sample_counter: u64,
    pub acc_carrier_phase_rad: f32,
    pub carrier_doppler_hz: f32,
    pub code_freq_hz: f32,
    pub carr_error: f32,
    pub carr_nco: f32,
    pub code_error: f32,
    pub code_nco: f32,
    pub cn0_db_hz: f32,
    pub carrier_lock_test: f32,
    pub sample_counter_seconds: f64,
}

pub struct DumpWriter {
    writer: BufWriter<File>,
}

impl DumpWriter {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    pub fn write_epoch(&mut self, r: &DumpRecord) -> std::io::Result<()> {
        self.writer.write_all(&r.early_mag.to_le_bytes())?;
        self.writer.write_all(&r.prompt_mag.to_le_bytes())?;
        self.writer.write_all(&r.late_mag.to_le_bytes())?;
        self.writer.write_all(&r.prompt_i.to_le_bytes())?;
        self.writer.write_all(&r.prompt_q.to_le_bytes())?;
        self.writer.write_all(&r.sample_counter.to_le_bytes())?;
        self.writer.write_all(&r.acc_carrier_phase_rad.to_le_bytes())?;
        self.writer.write_all(&r.carrier_doppler_hz.to_le_bytes())?;
        self.writer.write_all(&r.code_freq_hz.to_le_bytes())?;
        self.writer.write_all(&r.carr_error.to_le_bytes())?;
        self.writer.write_all(&r.carr_nco.to_le_bytes())?;
        self.writer.write_all(&r.code_error.to_le_bytes())?;
        self.writer.write_all(&r.code_nco.to_le_bytes())?;
        self.writer.write_all(&r.cn0_db_hz.to_le_bytes())?;
        self.writer.write_all(&r.carrier_lock_test.to_le_bytes())?;
        self.writer.write_all(&0f32.to_le_bytes())?; // reserved
        self.writer.write_all(&r.sample_counter_seconds.to_le_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for DumpWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("failed to flush tracking dump: {e}");
        }
    }
}

/// Size in bytes of one record written by [`DumpWriter::write_epoch`]: 14 float32 fields, one
/// u64 sample counter, and a trailing float64 timestamp.
pub const DUMP_RECORD_BYTES: usize = 4 * 14 + 8 + 8;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn record_size_matches_field_layout() {
        assert_eq!(DUMP_RECORD_BYTES, 4 * 14 + 8 + 8);
    }

    #[test]
    fn write_epoch_emits_exact_byte_count() {
        let dir = std::env::temp_dir();
        let path = dir.join("gnss_rcv_dump_test.dat");
        {
            let mut w = DumpWriter::create(&path).unwrap();
            w.write_epoch(&DumpRecord { sample_counter: 42, ..Default::default() }).unwrap();
            w.flush().unwrap();
        }
        let mut buf = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), DUMP_RECORD_BYTES);
        let _ = std::fs::remove_file(&path);
    }
}
