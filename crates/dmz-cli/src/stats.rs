//! Phase timing report for `-print-stats`.

use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub lex_ms: f64,
    pub parse_ms: f64,
    pub import_ms: f64,
    pub semantic_ms: f64,
    pub codegen_ms: f64,
    pub backend_ms: f64,
}

impl Stats {
    pub fn time<T>(slot: &mut f64, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        *slot += start.elapsed().as_secs_f64() * 1000.0;
        result
    }

    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{self:?}"),
        }
    }
}
