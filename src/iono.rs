use crate::constants::{P2_23, P2_24, P2_30};
use crate::util::getbits;

/// Klobuchar ionospheric correction coefficients, subframe 4 page 18.
#[derive(Default, Clone, Copy, Debug)]
pub struct IonoModel {
    pub alpha: [f64; 4],
    pub beta: [f64; 4],
}

impl IonoModel {
    /// `buf` holds the 300 ICD bits of subframe 4, page 18 (word 3 onward carries the model).
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            alpha: [
                getbits(buf, 68, 8) as f64 * P2_30,
                getbits(buf, 76, 8) as f64 * P2_30 * 2f64.powi(1),
                getbits(buf, 90, 8) as f64 * P2_30 * 2f64.powi(2),
                getbits(buf, 98, 8) as f64 * P2_30 * 2f64.powi(3),
            ],
            beta: [
                getbits(buf, 106, 8) as f64 * 2f64.powi(11),
                getbits(buf, 120, 8) as f64 * 2f64.powi(14),
                getbits(buf, 128, 8) as f64 * 2f64.powi(16),
                getbits(buf, 136, 8) as f64 * 2f64.powi(16),
            ],
        }
    }
}

/// UTC offset model, subframe 4 page 18 (shares the page with [`IonoModel`]).
#[derive(Default, Clone, Copy, Debug)]
pub struct UtcModel {
    pub a0: f64,
    pub a1: f64,
    pub tot: u32,
    pub wnt: u32,
    pub dt_ls: i32,
    pub wn_lsf: u32,
    pub dn: u32,
    pub dt_lsf: i32,
}

impl UtcModel {
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            a1: getbits(buf, 150, 24) as f64 * P2_24,
            a0: getbits(buf, 180, 24) as f64 * P2_23,
            tot: getbits(buf, 210, 8) as u32 * 4096,
            wnt: getbits(buf, 218, 8) as u32,
            dt_ls: getbits(buf, 226, 8),
            wn_lsf: getbits(buf, 240, 8) as u32,
            dn: getbits(buf, 248, 8) as u32,
            dt_lsf: getbits(buf, 256, 8),
        }
    }
}
