mod app;
mod audio;
mod config;
mod error;
mod library;
mod mpris;
mod player;
mod queue;
mod runtime;
mod session;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, problem) = runtime::load_settings();
    runtime::init_logging(&settings.log);
    if let Some(problem) = problem {
        log::warn!("{problem}");
    }
    runtime::run(settings)
}
