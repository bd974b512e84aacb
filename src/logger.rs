use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs;
use std::sync::Once;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "fleet_booking.log";

static INIT: Once = Once::new();

/// Initializes the global logger.
///
/// Call once at the start of the binary. Log level is read from `RUST_LOG`
/// (`RUST_LOG=debug fleet-booking ...`) and defaults to `info`.
/// Logs go to stderr and to `logs/fleet_booking.log`. If the log file cannot be
/// opened, only the console is used. Calling it a second time is a no-op.
pub fn init() {
    INIT.call_once(setup);
}

fn setup() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let base_config = Dispatch::new().level(log_level_filter).level_for("serde", LevelFilter::Warn);

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console_config = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let log_file_path = format!("{}/{}", LOG_DIR, LOG_FILE);
    let log_file = fs::create_dir_all(LOG_DIR).and_then(|_| fern::log_file(&log_file_path));

    let mut dispatch = base_config.chain(console_config);
    match log_file {
        Ok(file) => {
            let file_config = Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!("[{} {} {}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), record.level(), record.target(), message))
                })
                .chain(file);
            dispatch = dispatch.chain(file_config);
        }
        Err(e) => eprintln!("Failed to open log file '{}': {}. Logging to console only.", log_file_path, e),
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Failed to apply logger configuration: {}", e);
        return;
    }

    log::info!("Logger initialized. Logging to console and '{}'.", log_file_path);
}
