use clap::Parser;
use env_logger::{Builder, Env};
use log::warn;
use snafu::ErrorCompat;
use std::error::Error;

mod args;
mod dash;

fn main() {
    let args = args::Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(e) = dash::run_dashboard(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        let mut source = e.source();
        while let Some(s) = source {
            eprintln!("  caused by: {}", s);
            source = s.source();
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
