use std::env;

#[derive(Debug)]
pub enum Command {
    Dashboard,
    Progress { days: u32 },
    Log { hours: f64, tokens: i64 },
    Spend { tokens: i64 },
    Watch(WatchArgs),
}

#[derive(Debug, Default)]
pub struct WatchArgs {
    pub token: String,
    pub user_id: i64,
    pub name: String,
    pub tokens: i64,
}

pub fn parse_args() -> Result<Command, String> {
    let mut args = env::args().skip(1);
    let command = match args.next() {
        None => return Ok(Command::Dashboard),
        Some(name) => name,
    };

    match command.as_str() {
        "dashboard" => Ok(Command::Dashboard),
        "progress" => {
            let mut days: u32 = 7;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--days" => days = parse_value(&mut args, "--days")?,
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            Ok(Command::Progress { days })
        }
        "log" => {
            let mut hours: Option<f64> = None;
            let mut tokens: i64 = 0;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--hours" => hours = Some(parse_value(&mut args, "--hours")?),
                    "--tokens" => tokens = parse_value(&mut args, "--tokens")?,
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            let hours = hours.ok_or_else(|| "missing required --hours".to_string())?;
            Ok(Command::Log { hours, tokens })
        }
        "spend" => {
            let mut tokens: Option<i64> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--tokens" => tokens = Some(parse_value(&mut args, "--tokens")?),
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            let tokens = tokens.ok_or_else(|| "missing required --tokens".to_string())?;
            Ok(Command::Spend { tokens })
        }
        "watch" => {
            let mut watch = WatchArgs::default();
            let mut token: Option<String> = None;
            let mut user_id: Option<i64> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--token" => token = Some(parse_value(&mut args, "--token")?),
                    "--user-id" => user_id = Some(parse_value(&mut args, "--user-id")?),
                    "--name" => watch.name = parse_value(&mut args, "--name")?,
                    "--tokens" => watch.tokens = parse_value(&mut args, "--tokens")?,
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            watch.token = token.ok_or_else(|| "missing required --token".to_string())?;
            watch.user_id = user_id.ok_or_else(|| "missing required --user-id".to_string())?;
            if watch.name.is_empty() {
                watch.name = format!("user-{}", watch.user_id);
            }
            Ok(Command::Watch(watch))
        }
        "--help" | "-h" | "help" => {
            print_help();
            std::process::exit(0);
        }
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {flag}"))?;
    value
        .parse::<T>()
        .map_err(|_| format!("invalid value for {flag}: {value}"))
}

pub fn print_help() {
    println!(
        "SkillSwap CLI\n\n\
Usage:\n  skillswap [command] [options]\n\n\
Commands:\n  dashboard                      Totals across the activity log (default)\n  progress [--days <n>]          Per-day activity for the trailing window\n  log --hours <h> [--tokens <t>] Record a completed course locally\n  spend --tokens <t>             Record spent tokens locally\n  watch --token <jwt> --user-id <id> [--name <n>] [--tokens <t>]\n                                 Connect to the marketplace and stream updates\n  -h, --help                     Show this help message\n"
    );
}
