//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use siteinventory_core::{InventoryOptions, InventoryPipeline, ProgressReporter};
use siteinventory_shared::{AppConfig, Inventory, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteInventory: catalogue the content pages a website publishes.
#[derive(Parser)]
#[command(
    name = "siteinventory",
    version,
    about = "Discover, classify and measure the content pages of a website.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a content inventory for a domain and print it as JSON.
    Inventory {
        /// Domain to inventory (`example.com` or a full origin URL).
        domain: String,

        /// Maximum URLs taken from discovery (overrides config).
        #[arg(long)]
        max_urls: Option<usize>,

        /// Maximum pages to deep-read (overrides config).
        #[arg(long)]
        max_deep_read: Option<usize>,

        /// Skip fetching page content.
        #[arg(long)]
        skip_deep_read: bool,

        /// Classify by URL patterns only, without the OpenRouter model.
        #[arg(long)]
        no_ai: bool,

        /// Write the JSON inventory to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// clean for JSON output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "siteinventory=info",
        1 => "siteinventory=debug",
        _ => "siteinventory=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inventory {
            domain,
            max_urls,
            max_deep_read,
            skip_deep_read,
            no_ai,
            out,
        } => {
            let config = load_config()?;
            let mut options = InventoryOptions::from(&config);
            if let Some(n) = max_urls {
                options.max_urls = n;
            }
            if let Some(n) = max_deep_read {
                options.max_deep_read = n;
            }
            options.skip_deep_read |= skip_deep_read;

            cmd_inventory(&config, &domain, &options, !no_ai, out.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_inventory(
    config: &AppConfig,
    domain: &str,
    options: &InventoryOptions,
    use_ai: bool,
    out: Option<&Path>,
) -> Result<()> {
    let pipeline = InventoryPipeline::from_config(config, use_ai)?;

    info!(domain, use_ai, "building inventory");

    let reporter = CliProgress::new();
    let inventory = pipeline.build_inventory(domain, options, &reporter).await?;

    let json = serde_json::to_string_pretty(&inventory)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            eprintln!("  Inventory written to {}", path.display());
        }
        None => println!("{json}"),
    }

    print_summary(domain, &inventory);
    Ok(())
}

fn print_summary(domain: &str, inventory: &Inventory) {
    let stats = &inventory.stats;
    eprintln!();
    eprintln!("  Inventory for {domain}");
    eprintln!("  Source:      {}", stats.discovery_source);
    eprintln!("  URLs found:  {}", stats.urls_found);
    eprintln!("  Classified:  {}", stats.pages_classified);
    eprintln!("  Deep-read:   {}", stats.pages_deep_read);
    eprintln!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _inventory: &Inventory) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_inventory_flags() {
        let cli = Cli::try_parse_from([
            "siteinventory",
            "-vv",
            "inventory",
            "acme.io",
            "--max-urls",
            "100",
            "--skip-deep-read",
            "--no-ai",
            "--out",
            "acme.json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Inventory {
            domain,
            max_urls,
            max_deep_read,
            skip_deep_read,
            no_ai,
            out,
        } = cli.command
        else {
            panic!("expected inventory command");
        };
        assert_eq!(domain, "acme.io");
        assert_eq!(max_urls, Some(100));
        assert_eq!(max_deep_read, None);
        assert!(skip_deep_read);
        assert!(no_ai);
        assert_eq!(out, Some(PathBuf::from("acme.json")));
    }

    #[test]
    fn parses_config_and_log_format() {
        let cli = Cli::try_parse_from(["siteinventory", "config", "show", "--log-format", "json"])
            .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
