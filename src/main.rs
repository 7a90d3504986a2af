use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use structopt::StructOpt;

use gnss_rcv::channel::LoopConfig;
use gnss_rcv::code::Code;
use gnss_rcv::config::Options;
use gnss_rcv::receiver::Receiver;

fn main() -> std::io::Result<()> {
    let opt = Options::from_args();

    if opt.verbose {
        env_logger::Builder::from_default_env().filter_level(log::LevelFilter::Debug).init();
    } else {
        env_logger::Builder::from_default_env().filter_level(log::LevelFilter::Info).init();
    }

    if opt.gen_gold_code {
        Code::print_l1ca_codes();
        return Ok(());
    }

    let exit_req = Arc::new(AtomicBool::new(false));
    let exit_req_handler = exit_req.clone();
    ctrlc::set_handler(move || {
        log::warn!("caught ctrl-c, shutting down");
        exit_req_handler.store(true, Ordering::SeqCst);
    })
    .expect("failed to install ctrl-c handler");

    log::info!(
        "{}: {} sample_rate={} off_msec={}",
        opt.file.display().to_string().green(),
        opt.iq_file_type,
        format!("{} KHz", opt.sample_rate / 1000).bold(),
        opt.off_msec,
    );

    let dump_dir = if opt.dump { Some(opt.dump_dir.clone().unwrap_or_else(|| PathBuf::from("."))) } else { opt.dump_dir.clone() };
    let loop_cfg = LoopConfig {
        pll_bw_hz: opt.pll_bw_hz,
        dll_bw_hz: opt.dll_bw_hz,
        early_late_space_chips: opt.early_late_space_chips,
    };

    let mut receiver = Receiver::new(
        opt.device,
        &opt.hostname,
        &opt.file,
        &opt.iq_file_type,
        opt.sample_rate as f64,
        opt.intermediate_freq,
        opt.off_msec,
        opt.signal(),
        &opt.sats,
        dump_dir,
        &opt.dump_filename,
        loop_cfg,
        exit_req,
    );

    let ts = Instant::now();
    receiver.run_loop(opt.num_msec);
    log::info!("duration: {} msec", ts.elapsed().as_millis());
    Ok(())
}
