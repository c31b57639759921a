//! Command-line argument parsing and command execution for businesstime

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;
use serde_json::{json, Value};

use crate::calendar::{compute_working_hours, parse_instant, Direction, TimeUnit};
use crate::engine::BusinessTimeEngine;
use crate::schedule::{format_duration, time_until_business_time};

/// Parsed command line
#[derive(Debug, Default)]
pub struct Args {
    pub json: bool,
    pub validate: bool,
    pub help: bool,
    pub command: Option<Command>,
}

/// How much business time to shift by
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Seconds(i64),
    Hours(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    IsBusinessDay(DateTime<FixedOffset>),
    IsBusinessTime(DateTime<FixedOffset>),
    Interval {
        unit: TimeUnit,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    Shift {
        direction: Direction,
        instant: DateTime<FixedOffset>,
        amount: Amount,
    },
    Snap {
        instant: DateTime<FixedOffset>,
        direction: Direction,
    },
    Next(DateTime<FixedOffset>),
    WorkingHours {
        start_hour: u32,
        end_hour: u32,
    },
    HoursToDays(f64),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::IsBusinessDay(_) => "is-business-day",
            Command::IsBusinessTime(_) => "is-business-time",
            Command::Interval { unit, .. } => match unit {
                TimeUnit::Days => "days",
                TimeUnit::Hours => "hours",
                TimeUnit::Minutes => "minutes",
                TimeUnit::Seconds => "seconds",
            },
            Command::Shift { direction, amount, .. } => match (direction, amount) {
                (Direction::Forward, Amount::Seconds(_)) => "add",
                (Direction::Forward, Amount::Hours(_)) => "add-hours",
                (Direction::Backward, Amount::Seconds(_)) => "remove",
                (Direction::Backward, Amount::Hours(_)) => "remove-hours",
            },
            Command::Snap { .. } => "snap",
            Command::Next(_) => "next",
            Command::WorkingHours { .. } => "working-hours",
            Command::HoursToDays(_) => "to-days",
        }
    }

    /// Whether the command needs a configured engine
    pub fn needs_engine(&self) -> bool {
        !matches!(self, Command::WorkingHours { .. })
    }
}

pub fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from(&args)
}

/// Parse a full argv (program name first)
pub fn parse_args_from(args: &[String]) -> Result<Args> {
    let mut result = Args::default();
    let mut positional: Vec<&str> = Vec::new();
    let mut backward = false;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--json" => result.json = true,
            "--validate" => result.validate = true,
            "--help" | "-h" => result.help = true,
            "--backward" => backward = true,
            other if other.starts_with("--") => bail!("Unknown option '{}'", other),
            other => positional.push(other),
        }
    }

    if let Some((name, rest)) = positional.split_first() {
        let command = parse_command(name, rest)?;
        if backward && !matches!(command, Command::Snap { .. }) {
            bail!("--backward only applies to 'snap'");
        }
        result.command = Some(match command {
            Command::Snap { instant, .. } if backward => Command::Snap {
                instant,
                direction: Direction::Backward,
            },
            other => other,
        });
    } else if backward {
        bail!("--backward only applies to 'snap'");
    }

    Ok(result)
}

fn parse_command(name: &str, rest: &[&str]) -> Result<Command> {
    let expect = |count: usize, usage: &str| -> Result<()> {
        if rest.len() != count {
            bail!("Usage: businesstime {} {}", name, usage);
        }
        Ok(())
    };

    let command = match name {
        "is-business-day" => {
            expect(1, "<INSTANT>")?;
            Command::IsBusinessDay(instant_arg(rest[0])?)
        }
        "is-business-time" => {
            expect(1, "<INSTANT>")?;
            Command::IsBusinessTime(instant_arg(rest[0])?)
        }
        "days" | "hours" | "minutes" | "seconds" => {
            expect(2, "<START> <END>")?;
            let unit = match name {
                "days" => TimeUnit::Days,
                "hours" => TimeUnit::Hours,
                "minutes" => TimeUnit::Minutes,
                _ => TimeUnit::Seconds,
            };
            Command::Interval {
                unit,
                start: instant_arg(rest[0])?,
                end: instant_arg(rest[1])?,
            }
        }
        "add" | "remove" => {
            expect(2, "<INSTANT> <SECONDS>")?;
            let seconds: i64 = rest[1]
                .parse()
                .with_context(|| format!("SECONDS must be a whole number, got '{}'", rest[1]))?;
            Command::Shift {
                direction: shift_direction(name),
                instant: instant_arg(rest[0])?,
                amount: Amount::Seconds(seconds),
            }
        }
        "add-hours" | "remove-hours" => {
            expect(2, "<INSTANT> <HOURS>")?;
            Command::Shift {
                direction: shift_direction(name),
                instant: instant_arg(rest[0])?,
                amount: Amount::Hours(number_arg(rest[1], "HOURS")?),
            }
        }
        "snap" => {
            expect(1, "<INSTANT> [--backward]")?;
            Command::Snap {
                instant: instant_arg(rest[0])?,
                direction: Direction::Forward,
            }
        }
        "next" => {
            expect(1, "<INSTANT>")?;
            Command::Next(instant_arg(rest[0])?)
        }
        "working-hours" => {
            expect(2, "<START_HOUR> <END_HOUR>")?;
            let hour = |s: &str| -> Result<u32> {
                let h: u32 = s
                    .parse()
                    .with_context(|| format!("hour must be a whole number, got '{}'", s))?;
                if h > 24 {
                    bail!("hour must be within 0-24, got {}", h);
                }
                Ok(h)
            };
            Command::WorkingHours {
                start_hour: hour(rest[0])?,
                end_hour: hour(rest[1])?,
            }
        }
        "to-days" => {
            expect(1, "<HOURS>")?;
            Command::HoursToDays(number_arg(rest[0], "HOURS")?)
        }
        other => bail!("Unknown command '{}'. Try --help.", other),
    };

    Ok(command)
}

fn shift_direction(name: &str) -> Direction {
    if name.starts_with("remove") {
        Direction::Backward
    } else {
        Direction::Forward
    }
}

fn instant_arg(s: &str) -> Result<DateTime<FixedOffset>> {
    Ok(parse_instant(s)?)
}

fn number_arg(s: &str, what: &str) -> Result<f64> {
    s.parse()
        .with_context(|| format!("{} must be a number, got '{}'", what, s))
}

/// Result of running one command
#[derive(Debug, Serialize)]
pub struct Report {
    pub command: &'static str,
    pub result: Value,
    /// Plain-text rendering for terminal output
    #[serde(skip)]
    pub display: String,
}

impl Report {
    fn new(command: &Command, result: Value, display: String) -> Self {
        Self {
            command: command.name(),
            result,
            display,
        }
    }

    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            Ok(serde_json::to_string(self)?)
        } else {
            Ok(self.display.clone())
        }
    }
}

fn format_instant(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Run a parsed command against the engine.
/// `engine` may be None only for commands where [`Command::needs_engine`] is false.
pub fn execute(engine: Option<&BusinessTimeEngine>, command: &Command) -> Result<Report> {
    let configured = || engine.context("This command needs a business time configuration");

    let report = match command {
        Command::WorkingHours {
            start_hour,
            end_hour,
        } => {
            let hours = compute_working_hours(*start_hour, *end_hour);
            Report::new(command, json!(hours), hours.to_string())
        }
        Command::IsBusinessDay(instant) => {
            let flag = configured()?.is_business_day(instant);
            Report::new(command, json!(flag), flag.to_string())
        }
        Command::IsBusinessTime(instant) => {
            let flag = configured()?.is_business_time(instant)?;
            Report::new(command, json!(flag), flag.to_string())
        }
        Command::Interval { unit, start, end } => {
            let value = configured()?.compute_business_time_in_interval(start, end, *unit)?;
            Report::new(command, json!(value), value.to_string())
        }
        Command::Shift {
            direction,
            instant,
            amount,
        } => {
            let engine = configured()?;
            let shifted = match (direction, amount) {
                (Direction::Forward, Amount::Seconds(s)) => {
                    engine.add_business_seconds_to_date(instant, *s)?
                }
                (Direction::Forward, Amount::Hours(h)) => {
                    engine.add_business_hours_to_date(instant, *h)?
                }
                (Direction::Backward, Amount::Seconds(s)) => {
                    engine.remove_business_seconds_from_date(instant, *s)?
                }
                (Direction::Backward, Amount::Hours(h)) => {
                    engine.remove_business_hours_from_date(instant, *h)?
                }
            };
            let text = format_instant(&shifted);
            Report::new(command, json!(text), text)
        }
        Command::Snap { instant, direction } => {
            let snapped = configured()?.snap_into_business_time(instant, *direction)?;
            let text = format_instant(&snapped);
            Report::new(command, json!(text), text)
        }
        Command::Next(instant) => match time_until_business_time(configured()?, instant)? {
            None => Report::new(command, json!(0), "now".to_string()),
            Some(wait) => Report::new(command, json!(wait.as_secs()), format_duration(wait)),
        },
        Command::HoursToDays(hours) => {
            let days = configured()?.hours_to_days(*hours);
            Report::new(command, json!(days), days.to_string())
        }
    };

    Ok(report)
}

pub fn print_help() {
    println!("businesstime - business hours calculator\n");
    println!("USAGE:");
    println!("    businesstime [OPTIONS] <COMMAND> [ARGS]\n");
    println!("COMMANDS:");
    println!("    is-business-day <INSTANT>        Is the instant's day a business day?");
    println!("    is-business-time <INSTANT>       Is the instant inside a business window?");
    println!("    days|hours|minutes|seconds <START> <END>");
    println!("                                     Business time between two instants");
    println!("    add|remove <INSTANT> <SECONDS>   Shift by business seconds");
    println!("    add-hours|remove-hours <INSTANT> <HOURS>");
    println!("                                     Shift by business hours");
    println!("    snap <INSTANT> [--backward]      Move the instant into business time");
    println!("    next <INSTANT>                   Time until business time resumes");
    println!("    working-hours <START> <END>      Hours in a daily window (wraps midnight)");
    println!("    to-days <HOURS>                  Convert business hours to business days\n");
    println!("OPTIONS:");
    println!("    --json              Print {{\"command\", \"result\"}} as JSON");
    println!("    --validate          Validate configuration and exit");
    println!("    --help, -h          Show this help message\n");
    println!("INSTANTS:");
    println!("    RFC 3339, e.g. 2020-12-28T13:45:00+01:00\n");
    println!("ENVIRONMENT:");
    println!("    BUSINESS_TIMEZONE, BUSINESS_DAYS, BUSINESS_START_HOUR, BUSINESS_END_HOUR,");
    println!("    BUSINESS_HOLIDAYS (see .env.example)");
}
