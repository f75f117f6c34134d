use log::LevelFilter;
use env_logger::Builder;
use std::io::Write;
use chrono::Local;

/// Log output is the error interface for per-item failures, so every line
/// carries a wall-clock timestamp. Defaults to Info; RUST_LOG overrides.
pub fn init() {
    Builder::new()
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
