//! `dmzc` — the DMZ compiler driver.

mod driver;
mod merge;
mod options;
mod stats;

use clap::Parser;
use options::Options;

fn main() {
    let args = options::normalize_args(std::env::args_os());
    let options = Options::parse_from(args);

    match driver::run(options) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
