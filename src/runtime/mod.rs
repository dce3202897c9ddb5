use std::env;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::analysis::SharedAnalyser;
use crate::app::App;
use crate::library::{EnvFileCredentials, VkClient};
use crate::playback::{JsonFileStore, MemoryStore, PlaybackManager, PlaybackState, RodioStreamFactory, StateStore};
use crate::visual::MeshVisualizer;

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let options = startup::LaunchOptions::parse(env::args().skip(1))?;
    let (settings, warning) = settings::load_settings();
    let state_dir = settings.state_dir();
    logging::init(state_dir.as_deref());
    if let Some(msg) = warning {
        log::warn!("{}", msg);
    }

    let api = VkClient::new(settings.api.clone());
    let credentials_path = settings
        .credentials_path()
        .ok_or("cannot locate the credentials file; set storage.credentials_path")?;
    let credentials = EnvFileCredentials::new(credentials_path);
    let session = startup::authenticate(&api, &credentials, options.token.clone())?;

    let store: Box<dyn StateStore> = match (options.persist, state_dir) {
        (true, Some(dir)) => Box::new(JsonFileStore::new(dir)),
        _ => {
            log::info!("playback state is kept in memory only");
            Box::new(MemoryStore::new())
        }
    };
    let analyser = SharedAnalyser::default();
    let factory = RodioStreamFactory::open_default(&settings.api);
    let mut manager = PlaybackManager::new(&settings, store, Box::new(factory), analyser.clone());

    let (state_tx, state_rx) = mpsc::channel::<PlaybackState>();
    manager.subscribe(Box::new(move |state: &PlaybackState| {
        let _ = state_tx.send(state.clone());
    }));

    let mut app = App::new(manager.state(), options.source.clone());
    match startup::fetch_tracks(&api, &session, &options.source) {
        Ok(tracks) => {
            log::info!("loaded {} tracks from {}", tracks.len(), options.source.label());
            manager.set_tracks(tracks);
            if settings.playback.shuffle_on_load {
                manager.shuffle();
            }
        }
        Err(e) => {
            log::error!("could not load {}: {}", options.source.label(), e);
            app.set_status(e.user_message());
        }
    }

    let mut visualizer = settings
        .visual
        .enabled
        .then(|| MeshVisualizer::new(settings.visual.clone(), analyser.clone(), 0, 0));

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let services = event_loop::Services {
            settings: &settings,
            api: &api,
            session: &session,
        };
        let mut state = event_loop::EventLoopState::default();

        event_loop::run(
            &mut terminal,
            &services,
            &mut app,
            &mut manager,
            &mut visualizer,
            &state_rx,
            &mut state,
        )
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    log::info!("shutting down");
    run_result
}
