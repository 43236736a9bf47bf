mod cli;
mod effect;
mod store;
mod window;

use std::env;
use std::sync::Arc;

use almanac::{
    to_ics_calendar, CalendarRegistry, GregorianCalendar, Scheduler, SchedulerConfig,
};
use anyhow::Result;
use log::info;

use crate::effect::ProcessEffect;
use crate::store::JsonStore;
use crate::window::StdinWindow;

const LOG_ENV: &str = "ALMANAC_LOG";

fn setup_logging() {
    if env::var(LOG_ENV).is_err() {
        env::set_var(LOG_ENV, "almanac=info,almanac_daemon=info");
    }

    pretty_env_logger::init_custom_env(LOG_ENV);
}

fn registry(args: &cli::Args) -> CalendarRegistry {
    let gregorian = match (args.utc, args.zone) {
        (true, _) => GregorianCalendar::utc(),
        (false, Some(zone)) => GregorianCalendar::with_zone(zone),
        (false, None) => GregorianCalendar::local(),
    };

    CalendarRegistry::empty().with_module(gregorian)
}

async fn export(store: &JsonStore, registry: &CalendarRegistry) -> Result<()> {
    let entries = store.entries().await?;
    let calendar = to_ics_calendar(
        env!("CARGO_PKG_NAME"),
        entries.iter().map(|(record, event)| (*record, event)),
        registry,
    );
    print!("{calendar}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse(env::args().skip(1).collect());

    setup_logging();

    let registry = Arc::new(registry(&args));
    let store = Arc::new(
        JsonStore::open(&args.store)
            .await?
            .with_registry(Arc::clone(&registry)),
    );

    if args.export {
        return export(&store, &registry).await;
    }

    let config = SchedulerConfig {
        tick: args.tick,
        refresh_every: args.refresh_every,
        ..SchedulerConfig::default()
    };

    let window = StdinWindow::new();
    let scheduler = Scheduler::new(
        store,
        registry,
        Arc::new(ProcessEffect::new(args.sound_player)),
        Arc::new(window.clone()),
    )
    .with_config(config);

    info!(
        "Watching {} every {}s",
        args.store.display(),
        args.tick.as_secs()
    );

    let reader = window.spawn_reader();
    let scheduler = scheduler.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    scheduler.abort();
    reader.abort();
    Ok(())
}
