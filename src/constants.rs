pub const PI: f64 = std::f64::consts::PI;
pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// GPS L1 carrier frequency (Hz).
pub const L1CA_HZ: f64 = 1575.42e6;
/// C/A code chipping rate (Hz).
pub const GPS_L1_CA_CODE_RATE_HZ: f64 = 1.023e6;
/// C/A code length (chips), one PRN period.
pub const PRN_CODE_LEN: usize = 1023;
pub const GPS_L1_CA_CODE_LENGTH_CHIPS: f64 = PRN_CODE_LEN as f64;

pub const NUM_GPS_SATS: usize = 32;

/// NAV bit rate (bps) and samples (PRN periods) per bit.
pub const GPS_CA_TELEMETRY_RATE_BITS_SECOND: usize = 50;
pub const SAMPLES_PER_BIT: usize = 20;
/// Preamble length in bits, and in PRN-period symbols.
pub const GPS_CA_PREAMBLE_LENGTH_BITS: usize = 8;
pub const PREAMBLE_LENGTH_SYMBOLS: usize = GPS_CA_PREAMBLE_LENGTH_BITS * SAMPLES_PER_BIT;
pub const GPS_PREAMBLE: [u8; GPS_CA_PREAMBLE_LENGTH_BITS] = [1, 0, 0, 0, 1, 0, 1, 1];

/// Word and subframe sizes.
pub const GPS_WORD_BITS: usize = 30;
pub const GPS_SUBFRAME_WORDS: usize = 10;
pub const GPS_SUBFRAME_BITS: usize = GPS_WORD_BITS * GPS_SUBFRAME_WORDS;
/// Symbols between two preambles: 300 bits * 20 symbols/bit.
pub const SUBFRAME_SYMBOLS: usize = GPS_SUBFRAME_BITS * SAMPLES_PER_BIT;

/// Tracking loop-lock thresholds (GNSS-SDR tcp_connector_tracking defaults).
pub const CN0_ESTIMATION_SAMPLES: usize = 20;
pub const MINIMUM_VALID_CN0: f64 = 25.0;
pub const MAXIMUM_LOCK_FAIL_COUNTER: u32 = 50;
pub const CARRIER_LOCK_THRESHOLD: f64 = 0.85;

/// Acquisition-era SNR thresholds kept for the external acquisition boundary.
pub const SNR_THRESHOLD_LOCKED: f64 = 35.0;
pub const SNR_THRESHOLD_LOST: f64 = 32.0;
pub const ACQUISITION_WINDOW_MSEC: usize = 10;

/// ICD-GPS-200 LSB scale factors, named after their power-of-two exponent.
pub const SC2RAD: f64 = PI; // semicircles to radians
pub const P2_5: f64 = 1.0 / 32.0;
pub const P2_11: f64 = 1.0 / 2048.0;
pub const P2_19: f64 = 1.0 / 524288.0;
pub const P2_20: f64 = 1.0 / 1048576.0;
pub const P2_21: f64 = 1.0 / 2097152.0;
pub const P2_23: f64 = 1.0 / 8388608.0;
pub const P2_24: f64 = 1.0 / 16777216.0;
pub const P2_29: f64 = 1.0 / 536870912.0;
pub const P2_30: f64 = 1.0 / 1073741824.0;
pub const P2_31: f64 = 1.0 / 2147483648.0;
pub const P2_33: f64 = P2_31 / 4.0;
pub const P2_38: f64 = P2_31 / 128.0;
pub const P2_43: f64 = P2_31 / 4096.0;
pub const P2_55: f64 = P2_31 / 16777216.0;

/// TCP-offloaded discriminator wire record: control_id, E.re, E.im, L.re, L.im, P.re, P.im,
/// acq_doppler, enable_flag.
pub const NUM_TX_VARIABLES_GPS_L1_CA: usize = 9;

/// `Gnss_Synchro.System` single-char code to constellation name, GNSS-SDR's `systemName` map
/// turned into a constant lookup table.
pub const SYSTEM_NAMES: [(char, &str); 5] = [
    ('G', "GPS"),
    ('R', "GLONASS"),
    ('S', "SBAS"),
    ('E', "Galileo"),
    ('C', "Compass"),
];

pub fn system_name(code: char) -> &'static str {
    SYSTEM_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_name_lookup() {
        assert_eq!(system_name('G'), "GPS");
        assert_eq!(system_name('E'), "Galileo");
        assert_eq!(system_name('?'), "Unknown");
    }

    #[test]
    fn preamble_symbol_count() {
        assert_eq!(PREAMBLE_LENGTH_SYMBOLS, 160);
        assert_eq!(SUBFRAME_SYMBOLS, 6000);
    }
}
