use anyhow::Result;
use tracing::{debug, error, info};

use businesstime::cli::{self, Args};
use businesstime::config::Config;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    if args.help {
        cli::print_help();
        return Ok(());
    }

    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("businesstime=info".parse()?),
        )
        .init();

    debug!("businesstime v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    debug!("Configuration loaded");
    debug!("  Timezone: {}", config.timezone);
    debug!("  Business days: {}", config.business_days.join(","));
    debug!("  Window: {}-{}", config.start_hour, config.end_hour);
    debug!("  Holidays: {}", config.holidays.len());

    // Handle --validate mode
    if args.validate {
        info!("Validating configuration...");
        match config.validate() {
            Ok(()) => {
                info!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    run(&args, &config)
}

fn run(args: &Args, config: &Config) -> Result<()> {
    let Some(command) = &args.command else {
        cli::print_help();
        return Ok(());
    };

    let engine = if command.needs_engine() {
        Some(config.build_engine()?)
    } else {
        None
    };

    let report = cli::execute(engine.as_ref(), command)?;
    println!("{}", report.render(args.json)?);
    Ok(())
}
