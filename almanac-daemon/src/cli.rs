use std::env;
use std::path::PathBuf;
use std::process;

use chrono_tz::Tz;
use getopts::Options;
use tokio::time::Duration;

pub struct Args {
    pub store: PathBuf,
    pub tick: Duration,
    pub refresh_every: u32,
    pub sound_player: Option<String>,
    pub export: bool,
    pub utc: bool,
    pub zone: Option<Tz>,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "s",
        "store",
        "Directory holding the event records [Default: ./events]",
        "DIR",
    );
    opts.optopt(
        "t",
        "tick",
        "Seconds between two scans for due events [Default: 30]",
        "SECONDS",
    );
    opts.optopt(
        "r",
        "refresh-every",
        "Reload categories every this many scans [Default: 4]",
        "N",
    );
    opts.optopt(
        "p",
        "sound-player",
        "Program used to play the sound of an activity",
        "PROGRAM",
    );
    opts.optflag(
        "e",
        "export",
        "Print all events as iCalendar and exit",
    );
    opts.optflag(
        "u",
        "utc",
        "Interpret event dates in UTC instead of the local time zone",
    );
    opts.optopt(
        "z",
        "zone",
        "IANA time zone to interpret event dates in [Default: local time zone]",
        "NAME",
    );
    opts
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let store = matches
        .opt_str("store")
        .map_or_else(|| PathBuf::from("./events"), PathBuf::from);

    let tick = match matches.opt_get_default("tick", 30) {
        Ok(0) => {
            eprintln!("Provided value for option 'tick' must be at least 1");
            process::exit(1);
        }
        Ok(secs) => Duration::from_secs(secs),
        Err(err) => {
            eprintln!("Provided value for option 'tick' is invalid: {err}");
            process::exit(1);
        }
    };

    let refresh_every = match matches.opt_get_default("refresh-every", 4) {
        Ok(0) => {
            eprintln!("Provided value for option 'refresh-every' must be at least 1");
            process::exit(1);
        }
        Ok(n) => n,
        Err(err) => {
            eprintln!("Provided value for option 'refresh-every' is invalid: {err}");
            process::exit(1);
        }
    };

    let zone = match matches.opt_get::<Tz>("zone") {
        Ok(zone) => zone,
        Err(err) => {
            eprintln!("Provided value for option 'zone' is invalid: {err}");
            process::exit(1);
        }
    };

    Args {
        store,
        tick,
        refresh_every,
        sound_player: matches.opt_str("sound-player"),
        export: matches.opt_present("export"),
        utc: matches.opt_present("utc"),
        zone,
    }
}
