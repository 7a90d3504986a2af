use once_cell::sync::OnceCell;
use rustfft::num_complex::Complex64;
use std::sync::Mutex;

use crate::constants::{GPS_L1_CA_CODE_RATE_HZ, PRN_CODE_LEN};

pub const L1CA_CODE_LEN: usize = PRN_CODE_LEN;

/// Per-PRN chip table cache, keyed by PRN (1-32). Generation is a one-off LFSR run; every
/// channel re-reads the same 32 tables every acquisition/tracking cycle, so it's worth caching.
static CHIP_CACHE: OnceCell<Mutex<[Option<Vec<i8>>; 32]>> = OnceCell::new();

pub struct Code {}

impl Code {
    fn gen_l1ca_code(prn: u8) -> Vec<i8> {
        const G2_DELAY: [usize; 210] = [
            5, 6, 7, 8, 17, 18, 139, 140, 141, 251, 252, 254, 255, 256, 257, 258, 469, 470, 471,
            472, 473, 474, 509, 512, 513, 514, 515, 516, 859, 860, 861, 862, 863, 950, 947, 948,
            950, 67, 103, 91, 19, 679, 225, 625, 946, 638, 161, 1001, 554, 280, 710, 709, 775, 864,
            558, 220, 397, 55, 898, 759, 367, 299, 1018, 729, 695, 780, 801, 788, 732, 34, 320,
            327, 389, 407, 525, 405, 221, 761, 260, 326, 955, 653, 699, 422, 188, 438, 959, 539,
            879, 677, 586, 153, 792, 814, 446, 264, 1015, 278, 536, 819, 156, 957, 159, 712, 885,
            461, 248, 713, 126, 807, 279, 122, 197, 693, 632, 771, 467, 647, 203, 145, 175, 52, 21,
            237, 235, 886, 657, 634, 762, 355, 1012, 176, 603, 130, 359, 595, 68, 386, 797, 456,
            499, 883, 307, 127, 211, 121, 118, 163, 628, 853, 484, 289, 811, 202, 1021, 463, 568,
            904, 670, 230, 911, 684, 309, 644, 932, 12, 314, 891, 212, 185, 675, 503, 150, 395,
            345, 846, 798, 992, 357, 995, 877, 112, 144, 476, 193, 109, 445, 291, 87, 399, 292,
            901, 339, 208, 711, 189, 263, 537, 663, 942, 173, 900, 30, 500, 935, 556, 373, 85, 652,
            310,
        ];
        let mut g1 = [0i8; L1CA_CODE_LEN];
        let mut g2 = [0i8; L1CA_CODE_LEN];
        let mut r1 = [-1i8; 10];
        let mut r2 = [-1i8; 10];
        let mut g = vec![];
        for i in 0..L1CA_CODE_LEN {
            g1[i] = r1[9];
            g2[i] = r2[9];
            let c1 = r1[2] * r1[9];
            let c2 = r2[1] * r2[2] * r2[5] * r2[7] * r2[8] * r2[9];
            r1.rotate_right(1);
            r2.rotate_right(1);
            r1[0] = c1;
            r2[0] = c2;
        }
        let mut j = L1CA_CODE_LEN - G2_DELAY[(prn - 1) as usize];
        for i in 0..L1CA_CODE_LEN {
            let v = -g1[i] * g2[j % L1CA_CODE_LEN];
            g.push(v);
            j += 1;
        }

        g
    }

    pub fn gen_code(sig: &str, prn: u8) -> Option<Vec<i8>> {
        match sig {
            "L1CA" => Some(Self::gen_l1ca_code(prn)),
            _ => None,
        }
    }

    /// Cached `+-1` chip table for `prn`, generated once per process.
    pub fn chips(prn: u8) -> Vec<i8> {
        let cache = CHIP_CACHE.get_or_init(|| Mutex::new(std::array::from_fn(|_| None)));
        let mut guard = cache.lock().unwrap();
        let slot = &mut guard[(prn - 1) as usize];
        if slot.is_none() {
            *slot = Some(Self::gen_l1ca_code(prn));
        }
        slot.clone().unwrap()
    }

    /// Local-replica code resampled to `fs_in`, padded with two extra chips on either end so the
    /// tracking loop can slide Early/Late taps without bounds-checking every sample.
    pub fn chips_upsampled_padded(prn: u8, fs_in: f64, chip_spacing: f64) -> Vec<Complex64> {
        let chips = Self::chips(prn);
        let code_rate = GPS_L1_CA_CODE_RATE_HZ;
        let samples_per_chip = fs_in / code_rate;
        let n = ((L1CA_CODE_LEN as f64) * samples_per_chip).round() as usize;
        let pad = ((2.0 * chip_spacing) * samples_per_chip).ceil() as usize + 1;
        let mut out = Vec::with_capacity(n + 2 * pad);
        let total = n + 2 * pad;
        for k in 0..total {
            let t_chip = (k as f64 - pad as f64) / samples_per_chip;
            let idx = t_chip.rem_euclid(L1CA_CODE_LEN as f64) as usize % L1CA_CODE_LEN;
            out.push(Complex64::new(chips[idx] as f64, 0.0));
        }
        out
    }

    pub fn get_code_period(sig: &str) -> f64 {
        match sig {
            "L1CA" => 1e-3,
            _ => 0.0,
        }
    }

    pub fn get_code_len(sig: &str) -> f64 {
        match sig {
            "L1CA" => L1CA_CODE_LEN as f64,
            _ => 0.0,
        }
    }

    pub fn get_code_freq(sig: &str) -> f64 {
        match sig {
            "L1CA" => GPS_L1_CA_CODE_RATE_HZ,
            _ => 0.0,
        }
    }

    pub fn print_l1ca_codes() {
        println!("generating gold codes for L1CA");
        for i in 1..=32 {
            let g = Self::gen_l1ca_code(i as u8);
            println!("  code-{:02}: {:?}", i, &g[0..20]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_length_and_balance() {
        let c = Code::chips(1);
        assert_eq!(c.len(), L1CA_CODE_LEN);
        let sum: i32 = c.iter().map(|&x| x as i32).sum();
        // Gold codes are balanced to within one chip.
        assert!(sum.abs() <= 1);
    }

    #[test]
    fn distinct_prns_are_cached_independently() {
        let c1 = Code::chips(1);
        let c2 = Code::chips(2);
        assert_ne!(c1, c2);
        assert_eq!(Code::chips(1), c1);
    }

    #[test]
    fn upsampled_padded_length() {
        let fs = 4.0 * crate::constants::GPS_L1_CA_CODE_RATE_HZ;
        let v = Code::chips_upsampled_padded(3, fs, 0.5);
        assert!(v.len() > (L1CA_CODE_LEN as f64 * 4.0) as usize);
    }
}
