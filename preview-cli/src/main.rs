// ABOUTME: Main entry point for the gutter preview CLI
// ABOUTME: Parses arguments, loads configuration and dispatches to the command runners

use anyhow::Result;
use clap::Parser;
use preview_cli::cli::{Cli, Commands};
use preview_cli::cli_output::CliOutput;
use preview_cli::output::{JsonFormatter, OutputFormat, TableFormatter};
use preview_cli::runner;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    // Determine if color should be used
    let use_color = !cli.no_color
        && env::var("NO_COLOR").is_err()
        && env::var("TERM").unwrap_or_default() != "dumb";
    let output = CliOutput::with_color(use_color);

    if let Err(e) = run(cli, use_color, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, use_color: bool, output: &CliOutput) -> Result<()> {
    let config = runner::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            document,
            json,
            pretty,
            timeout,
        } => {
            let host = runner::build_host(&document, config)?;
            let formatter: Box<dyn OutputFormat> = if json {
                Box::new(JsonFormatter::new(pretty))
            } else {
                Box::new(TableFormatter::new(use_color))
            };

            let report =
                runner::scan(host, Duration::from_secs(timeout), formatter.as_ref(), output)
                    .await?;
            println!("{}", report);
        }
        Commands::Hover {
            document,
            line,
            timeout,
        } => {
            let host = runner::build_host(&document, config)?;
            let line = usize::try_from(line)?;
            match runner::hover(host, line, Duration::from_secs(timeout), output).await? {
                Some(content) => println!("{}", content),
                None => output.info(&format!("No images on line {}", line)),
            }
        }
        Commands::Watch { document } => {
            let host = runner::build_host(&document, config)?;
            runner::watch(host, CliOutput::with_color(use_color)).await?;
        }
    }

    Ok(())
}
