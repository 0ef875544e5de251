use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use carrack_data::autopilot::TickOutcome;
use carrack_data::game::Game;
use carrack_data::save::SaveState;

const DEFAULT_MINUTES: f64 = 30.0;

// Wall-clock seconds standing in for one day at sea in live mode
const LIVE_SECONDS_PER_DAY: f64 = 2.0;

// On-disk wrapper around a snapshot, stamped so the next run knows how
// long the game stayed closed
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveFile {
    saved_at_minutes: f64,
    state: SaveState,
}

struct Args {
    minutes: f64,
    seed: Option<u64>,
    live: bool,
    load: Option<String>,
    save: Option<String>,
}

fn usage() -> ! {
    eprintln!("Usage: carrack-sim [--minutes N] [--seed N] [--live] [--load FILE] [--save FILE]");
    std::process::exit(2);
}

fn flag_value<T: std::str::FromStr>(args: &mut impl Iterator<Item = String>, flag: &str) -> T {
    let Some(raw) = args.next() else {
        eprintln!("{flag} expects a value");
        usage();
    };
    match raw.parse() {
        Ok(val) => val,
        Err(_) => {
            eprintln!("Cannot read {raw:?} as a value for {flag}");
            usage();
        }
    }
}

fn parse_args() -> Args {
    let mut parsed = Args {
        minutes: DEFAULT_MINUTES,
        seed: None,
        live: false,
        load: None,
        save: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--minutes" => parsed.minutes = flag_value(&mut args, "--minutes"),
            "--seed" => parsed.seed = Some(flag_value(&mut args, "--seed")),
            "--live" => parsed.live = true,
            "--load" => parsed.load = Some(flag_value(&mut args, "--load")),
            "--save" => parsed.save = Some(flag_value(&mut args, "--save")),
            _ => usage(),
        }
    }
    parsed
}

fn epoch_minutes() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
        / 60.0
}

fn print_events(game: &mut Game) {
    for (day, evt) in game.events.drain() {
        println!("[day {day:>3}] {}", evt.message());
    }
}

// Real-time ticks, sleeping as long as the game asks between each.
// Crossings take a scaled real delay before the landfall signal fires.
fn drive_live(game: &mut Game) {
    let mut sailing_since: Option<Instant> = None;
    loop {
        match game.voyage.as_ref() {
            Some(v) => {
                let crossing = Duration::from_secs_f64(v.days as f64 * LIVE_SECONDS_PER_DAY);
                let since = *sailing_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= crossing {
                    sailing_since = None;
                    let _ = game.complete_voyage();
                }
            }
            None => sailing_since = None,
        }
        let outcome = game.autopilot_tick(epoch_minutes());
        print_events(game);
        match outcome {
            TickOutcome::Acted { next_delay } | TickOutcome::Idle { next_delay } => {
                std::thread::sleep(next_delay)
            }
            TickOutcome::Stopped => break,
        }
    }
}

// Collapses the whole engagement without waiting on the wall clock
fn fast_forward(game: &mut Game, from_minutes: f64) {
    let Some(ap) = game.autopilot.as_ref() else {
        return;
    };
    let horizon = ap.started_minutes + ap.duration_minutes + 1.0;
    let summary = game.run_offline(from_minutes, horizon);
    println!(
        "Fast-forwarded {:.1} simulated minutes in {} ticks",
        summary.minutes, summary.iterations
    );
    if summary.capped {
        println!("Catch-up hit the iteration cap before the helm came back");
    }
}

fn main() -> std::io::Result<()> {
    env_logger::builder().parse_default_env().init();
    let args = parse_args();

    let mut game = match &args.load {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let file: SaveFile = serde_json::from_str(&raw).map_err(std::io::Error::other)?;
            let mut game = Game::restore(file.state);
            if game.autopilot_active() {
                let summary = game.run_offline(file.saved_at_minutes, epoch_minutes());
                println!(
                    "Caught up on {:.1} minutes away from the helm ({} ticks)",
                    summary.minutes, summary.iterations
                );
            }
            game
        }
        None => {
            let seed = args.seed.unwrap_or_else(|| rand::rng().random());
            log::info!("New game, seed {seed}");
            let mut game = Game::init(seed);
            let start = if args.live { epoch_minutes() } else { 0.0 };
            if let Err(e) = game.start_autopilot(args.minutes, start) {
                eprintln!("{}", e.errmsg());
                std::process::exit(2);
            }
            game
        }
    };

    if game.autopilot_active() {
        if args.live {
            drive_live(&mut game);
        } else {
            let from = match &args.load {
                Some(_) => epoch_minutes(),
                None => 0.0,
            };
            fast_forward(&mut game, from);
        }
    }

    print_events(&mut game);
    if let Some(report) = game.last_report.as_ref() {
        let rendered = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
        println!("{rendered}");
    }
    println!(
        "Day {}, {} gold, hold {}/{}, docked at {:?}",
        game.player.day,
        game.player.gold,
        game.player.cargo.used(),
        game.player.ship.capacity,
        game.player.port
    );

    if let Some(path) = &args.save {
        let file = SaveFile {
            saved_at_minutes: epoch_minutes(),
            state: game.to_save(),
        };
        let rendered = serde_json::to_string_pretty(&file).map_err(std::io::Error::other)?;
        std::fs::write(path, rendered)?;
        println!("Saved to {path}");
    }
    Ok(())
}
