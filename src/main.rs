use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use bggdeck::bgg::CollectionOutcome;
use bggdeck::cli::{Cli, Command};
use bggdeck::print::PrintOutcome;

/// `EX_TEMPFAIL`: the inventory is queued; retry shortly.
const EXIT_PENDING: u8 = 75;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    bggdeck::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Collection(args) => {
            if let CollectionOutcome::Pending { message } =
                bggdeck::print::collection(args).await.context("collection")?
            {
                eprintln!("{message}");
                return Ok(ExitCode::from(EXIT_PENDING));
            }
        }
        Command::Details(args) => {
            bggdeck::print::details(args).await.context("details")?;
        }
        Command::Describe(args) => {
            bggdeck::print::describe(args).await.context("describe")?;
        }
        Command::Layout(args) => {
            bggdeck::print::layout(args).context("layout")?;
        }
        Command::Print(args) => match bggdeck::print::run(args).await.context("print")? {
            PrintOutcome::Pending { message } => {
                eprintln!("{message}");
                return Ok(ExitCode::from(EXIT_PENDING));
            }
            PrintOutcome::Written {
                path,
                records,
                sheets,
            } => {
                tracing::info!(path = %path.display(), records, sheets, "document written");
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
