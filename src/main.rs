mod analysis;
mod app;
mod config;
mod library;
mod playback;
mod runtime;
mod ui;
mod visual;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
