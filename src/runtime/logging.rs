use std::fs::{self, File, OpenOptions};
use std::io;

use crossterm::execute;
use crossterm::terminal::{LeaveAlternateScreen, disable_raw_mode};
use log::LevelFilter;

use crate::config::LogSettings;

fn open_log_file(settings: &LogSettings) -> io::Result<File> {
    let path = settings
        .resolved_file()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no log directory"))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Start the logger and install the panic hook.
///
/// The terminal belongs to the UI, so records go to the log file; when that
/// cannot be opened they are dropped.
pub fn init_logging(settings: &LogSettings) {
    let mut builder = colog::default_builder();
    builder.filter(None, settings.level_filter().unwrap_or(LevelFilter::Warn));
    builder.write_style(env_logger::WriteStyle::Never);
    match open_log_file(settings) {
        Ok(file) => builder.target(env_logger::Target::Pipe(Box::new(file))),
        Err(_) => builder.target(env_logger::Target::Pipe(Box::new(io::sink()))),
    };
    let _ = builder.try_init();

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{thread_name}': {panic_info}");
        // Restore the terminal so the message is readable.
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        default_hook(panic_info);
    }));
}
