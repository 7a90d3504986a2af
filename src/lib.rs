pub mod acquisition;
pub mod almanac;
pub mod channel;
pub mod code;
pub mod config;
pub mod constants;
pub mod control;
pub mod device;
pub mod discriminator;
pub mod dump;
pub mod ephemeris;
pub mod framer;
pub mod iono;
pub mod network;
pub mod receiver;
pub mod recording;
pub mod solver;
pub mod subframe;
pub mod tracking;
pub mod types;
pub mod util;

extern crate rtlsdr_mt;
