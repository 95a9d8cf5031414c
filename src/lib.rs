pub mod app;
#[cfg(feature = "audio")]
pub mod audio;
pub mod broadcast;
pub mod clock;
pub mod commands;
pub mod counter;
pub mod effects;
pub mod error;
pub mod host;
pub mod reminders;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod utils;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use app::PagePause;
use broadcast::{BroadcastHub, TabLink, TabMessage, COUNTER_TOPIC, STORAGE_TOPIC};
use clock::SystemClock;
use commands::{execute, Command};
use effects::LogEffects;
use scheduler::{Fired, TokioScheduler};
use settings::AppSettings;
use store::{KeyValueStore, MemoryStore, Storage};

pub use error::{PagePauseError, Result};

enum Event {
    Wakeup(Option<Fired>),
    Line(Option<String>),
    Tab(TabMessage),
}

/// Terminal front end: reads commands from stdin and drives timers until
/// `quit` or end of input.
pub fn run() -> anyhow::Result<()> {
    let settings = AppSettings::from_env()?;

    env_logger::Builder::from_default_env()
        .filter_level(utils::logging::default_level(settings.debug))
        .init();

    log::info!("PagePause starting up...");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(serve(settings))
}

async fn serve(settings: AppSettings) -> anyhow::Result<()> {
    let backend: Box<dyn KeyValueStore> = match settings.open_store() {
        Ok(backend) => backend,
        Err(err) => {
            log::warn!("{}", PagePauseError::StorageUnavailable(format!("{err:#}")));
            Box::new(MemoryStore::new())
        }
    };

    #[cfg(feature = "audio")]
    let tones = audio::ToneEngineHandle::new();
    #[cfg(feature = "audio")]
    let effects = LogEffects::with_audio(tones.clone());
    #[cfg(not(feature = "audio"))]
    let effects = LogEffects::new();

    let link = TabLink::new(BroadcastHub::new());
    let mut counter_updates = link.subscribe(COUNTER_TOPIC);
    let mut storage_changes = link.subscribe(STORAGE_TOPIC);

    let mut app = PagePause::new(
        Arc::new(SystemClock),
        TokioScheduler::new(),
        Box::new(effects),
        Storage::new(backend),
        settings.tick_interval,
        Some(link),
    );
    app.restore();
    app.record_visit();

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let event = tokio::select! {
            fired = app.scheduler_mut().next() => Event::Wakeup(fired),
            line = lines.next_line() => Event::Line(line?),
            Some(message) = counter_updates.recv() => Event::Tab(message),
            Some(message) = storage_changes.recv() => Event::Tab(message),
        };

        match event {
            Event::Wakeup(Some(fired)) => app.handle(fired.wakeup),
            Event::Wakeup(None) => break,
            Event::Tab(message) => app.on_tab_message(message),
            Event::Line(None) => break,
            Event::Line(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => match execute(&mut app, command) {
                        Ok(reply) => println!("{reply}"),
                        Err(err) => println!("error: {err}"),
                    },
                    Err(err) => println!("error: {err}"),
                }
            }
        }
    }

    log::info!("PagePause shutting down");
    #[cfg(feature = "audio")]
    tones.shutdown();
    Ok(())
}
