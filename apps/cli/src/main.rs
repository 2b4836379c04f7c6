mod args;
mod config;
mod dirs;

use std::io;

use args::Command;
use skillswap_app::{AppPaths, AppState, DashboardSnapshot, ensure_app_data_dir};
use skillswap_core::UserProfile;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let command = args::parse_args().map_err(|err| {
        eprintln!("{err}");
        args::print_help();
        io::Error::new(io::ErrorKind::InvalidInput, "invalid arguments")
    })?;

    let config = config::load_or_create().map_err(io::Error::other)?;
    if config.created {
        println!(
            "Created config at {} (channel {}).",
            config.paths.file.display(),
            config.config.channel_url
        );
    }

    let data_dir = dirs::resolve_data_dir().map_err(io::Error::other)?;
    if data_dir.matched_existing {
        println!("Using existing data dir: {}", data_dir.dir.display());
    }

    let paths = AppPaths::new(data_dir.dir);
    ensure_app_data_dir(&paths).map_err(|err| io::Error::other(err.to_string()))?;
    let state = AppState::new(paths.db_path, config.config.channel_url);

    match command {
        Command::Dashboard => {
            let snapshot = state.services.dashboard.snapshot()?;
            print_dashboard(&snapshot);
        }
        Command::Progress { days } => {
            let points = state.services.progress.daily_series(days)?;
            println!("{:<12} {:>8} {:>8} {:>8} {:>8}", "date", "courses", "hours", "earned", "used");
            for point in points {
                println!(
                    "{:<12} {:>8} {:>8.1} {:>8} {:>8}",
                    point.date,
                    point.courses_completed,
                    point.time_spent,
                    point.tokens_earned,
                    point.tokens_used
                );
            }
        }
        Command::Log { hours, tokens } => {
            let store = state.open_store()?;
            let log = store.record_course_completion(hours, tokens)?;
            let today = log.entries.last().map(|e| e.courses_completed).unwrap_or(0);
            println!("Logged {hours}h and {tokens} tokens earned ({today} courses today).");
        }
        Command::Spend { tokens } => {
            let store = state.open_store()?;
            store.record_token_usage(tokens)?;
            println!("Logged {tokens} tokens spent.");
        }
        Command::Watch(watch) => {
            run_watch(state, watch).await?;
        }
    }

    Ok(())
}

async fn run_watch(state: AppState, watch: args::WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let engine = state.sync_engine()?;
    engine.spawn();

    state.session.login(
        UserProfile {
            id: watch.user_id,
            name: watch.name,
            tokens: watch.tokens,
        },
        watch.token,
    );

    println!("Watching for updates. Press Ctrl+C to stop.");
    let mut signals = state.signal.subscribe();
    loop {
        tokio::select! {
            signal = signals.recv() => {
                if signal.is_err() {
                    break;
                }
                let snapshot = state.services.dashboard.snapshot()?;
                let tokens = state
                    .session
                    .current()
                    .tokens()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("balance: {tokens}");
                print_dashboard(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn print_dashboard(snapshot: &DashboardSnapshot) {
    println!("Courses completed: {}", snapshot.courses_completed);
    println!("Hours spent:       {:.1}", snapshot.hours_spent);
    println!("Tokens earned:     {}", snapshot.tokens_earned);
    println!("Tokens used:       {}", snapshot.tokens_used);
    println!("Active days:       {}", snapshot.active_days);
    println!("Current streak:    {}", snapshot.current_streak);
}
