use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_DAYS};
use crate::render::RendererKind;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Debug logging for bggdeck itself (`RUST_LOG` takes precedence).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a user's owned inventory.
    Collection(CollectionArgs),
    /// Fetch and normalize detail records for catalog ids.
    Details(DetailsArgs),
    /// Print the short description scraped for one id.
    Describe(DescribeArgs),
    /// Impose a records JSON file onto print sheets (no network).
    Layout(LayoutArgs),
    /// End to end: ids or inventory to a print document.
    Print(PrintArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// Catalog API base URL (overrides `BGGDECK_API_BASE`).
    #[arg(long)]
    pub api_base: Option<String>,

    /// Site base URL for description pages (overrides `BGGDECK_SITE_BASE`).
    #[arg(long)]
    pub site_base: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_DAYS)]
    pub cache_ttl_days: i64,
}

impl Default for CacheArgs {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_days: DEFAULT_CACHE_TTL_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct LayoutOptions {
    /// Layout YAML (page, card, bleed, grid, crop marks).
    #[arg(long)]
    pub layout: Option<String>,

    /// Butt cards together at trim size.
    #[arg(long)]
    pub no_bleed: bool,

    #[arg(long)]
    pub bleed_mm: Option<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct CollectionArgs {
    #[arg(long)]
    pub username: String,

    /// Ask for a fresh inventory instead of a cached one.
    #[arg(long)]
    pub force: bool,

    /// Output JSON path (stdout when omitted).
    #[arg(long)]
    pub out: Option<String>,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Debug, Clone, Args)]
pub struct DetailsArgs {
    /// Comma-separated catalog ids.
    #[arg(long, value_delimiter = ',', required = true)]
    pub ids: Vec<String>,

    /// Attach scraped short descriptions.
    #[arg(long)]
    pub describe: bool,

    /// Output JSON path (stdout when omitted).
    #[arg(long)]
    pub out: Option<String>,

    /// Ids per detail request.
    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    /// Maximum concurrent description lookups.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Debug, Clone, Args)]
pub struct DescribeArgs {
    #[arg(long)]
    pub id: String,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LayoutFormat {
    #[default]
    Json,
    Html,
}

#[derive(Debug, Clone, Args)]
pub struct LayoutArgs {
    /// `GameRecord` JSON array (as written by `details`).
    #[arg(long)]
    pub records: String,

    #[arg(long, value_enum, default_value_t = LayoutFormat::Json)]
    pub format: LayoutFormat,

    #[arg(long)]
    pub out: String,

    #[command(flatten)]
    pub layout: LayoutOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PrintFormat {
    #[default]
    Pdf,
    Html,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RendererChoice {
    #[default]
    Chromium,
    Weasyprint,
}

impl From<RendererChoice> for RendererKind {
    fn from(choice: RendererChoice) -> Self {
        match choice {
            RendererChoice::Chromium => RendererKind::Chromium,
            RendererChoice::Weasyprint => RendererKind::Weasyprint,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PrintArgs {
    /// Comma-separated catalog ids.
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "username",
        required_unless_present = "username"
    )]
    pub ids: Vec<String>,

    /// Print a user's owned inventory instead of explicit ids.
    #[arg(long)]
    pub username: Option<String>,

    /// With `--username`: ask for a fresh inventory.
    #[arg(long)]
    pub force: bool,

    #[arg(long)]
    pub out: String,

    #[arg(long, value_enum, default_value_t = PrintFormat::Pdf)]
    pub format: PrintFormat,

    #[arg(long, value_enum, default_value_t = RendererChoice::Chromium)]
    pub renderer: RendererChoice,

    /// Renderer executable (defaults to `chromium` / `weasyprint` on PATH).
    #[arg(long)]
    pub renderer_bin: Option<String>,

    /// Renderer sessions kept in the pool.
    #[arg(long, default_value_t = 1)]
    pub renderers: usize,

    #[arg(long, default_value_t = 60)]
    pub render_timeout_secs: u64,

    /// Ids per detail request.
    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    /// Maximum concurrent description lookups.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    #[command(flatten)]
    pub layout: LayoutOptions,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ids_are_comma_separated() {
        let cli = Cli::try_parse_from(["bggdeck", "details", "--ids", "13,822, 9"]).unwrap();
        let Command::Details(args) = cli.command else {
            panic!("expected details");
        };
        assert_eq!(args.ids, vec!["13", "822", " 9"]);
        assert_eq!(args.batch_size, 20);
        assert_eq!(args.cache.cache_capacity, 500);
    }

    #[test]
    fn print_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["bggdeck", "print", "--out", "x.pdf"]).is_err());
        assert!(
            Cli::try_parse_from([
                "bggdeck", "print", "--ids", "1", "--username", "alice", "--out", "x.pdf"
            ])
            .is_err()
        );

        let cli = Cli::try_parse_from([
            "bggdeck",
            "print",
            "--username",
            "alice",
            "--out",
            "x.html",
            "--format",
            "html",
            "--renderer",
            "weasyprint",
            "--no-bleed",
        ])
        .unwrap();
        let Command::Print(args) = cli.command else {
            panic!("expected print");
        };
        assert!(args.ids.is_empty());
        assert_eq!(args.format, PrintFormat::Html);
        assert_eq!(RendererKind::from(args.renderer), RendererKind::Weasyprint);
        assert!(args.layout.no_bleed);
    }
}
