mod client;
mod config;
mod error;
mod explore;
mod models;
mod output;
mod signer;

use crate::client::{ApiClient, DEVICES_PATH};
use crate::config::{Config, ConfigError, EffectiveConfig, Scope, resolve, save};
use crate::error::{ApiError, exit_code};
use crate::explore::{ConsolePrompter, Explorer, Presets, Stage};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lmctl",
    version,
    about = "Interactive CLI for the LogicMonitor REST API"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Account subdomain override (otherwise COMPANY or config)"
    )]
    company: Option<String>,

    #[arg(
        long,
        global = true,
        help = "API access id override (otherwise ACCESS_ID or config)"
    )]
    access_id: Option<String>,

    #[arg(
        long,
        global = true,
        help = "API access key override (otherwise ACCESS_KEY or config)"
    )]
    access_key: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "REST base URL (defaults to https://<company>.logicmonitor.com/santaba/rest)"
    )]
    base_url: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory for saved JSON responses (defaults to ./output)"
    )]
    output_dir: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        default_value_t = 30,
        help = "Per-request timeout"
    )]
    timeout: u64,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v, -vv, -vvv)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk devices, data sources and instances interactively (default)
    Explore {
        #[arg(long, help = "Answer the device prompt up front")]
        device_id: Option<String>,
        #[arg(long, help = "Answer the datasource prompt up front")]
        datasource_id: Option<String>,
        #[arg(long, help = "Page through every device instead of the first page")]
        all: bool,
    },
    /// List devices
    Devices {
        #[arg(long, help = "Page through every device instead of the first page")]
        all: bool,
    },
    /// List a device's data sources and save them
    Datasources {
        #[arg(value_name = "DEVICE_ID")]
        device_id: String,
    },
    /// List a data source's instances and save them
    Instances {
        #[arg(value_name = "DEVICE_ID")]
        device_id: String,
        #[arg(value_name = "DATASOURCE_ID")]
        datasource_id: String,
    },
    /// Check that the resolved credentials are accepted
    Validate,
    /// Persist --company/--access-id/--access-key to the chosen scope
    Configure {
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
    },
    /// Show current configuration (secrets masked)
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn main() {
    // Existing environment variables take precedence over .env entries.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env file"),
    }

    if let Err(err) = run(cli) {
        tracing::debug!(error = ?err, "command failed");
        println!("Error: {err}");
        std::process::exit(exit_code_for(&err));
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        tracing::debug!(status = ?api.status(), "request failed");
        return api.exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return exit_code::CONFIG;
    }
    exit_code::GENERAL
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let command = cli.command.unwrap_or(Commands::Explore {
        device_id: None,
        datasource_id: None,
        all: false,
    });

    match command {
        Commands::Configure { scope } => {
            let mut existing = config::load_scope(scope.into(), &cwd)?;
            existing.company = cli.company.or(existing.company);
            existing.access_id = cli.access_id.or(existing.access_id);
            existing.access_key = cli.access_key.or(existing.access_key);
            if let Some(dir) = cli.output_dir {
                existing.output_dir = Some(dir);
            }

            let path = save(scope.into(), &existing, &cwd)?;
            println!("Saved credentials to {}", path.display());
            return Ok(());
        }
        Commands::ConfigShow => {
            let mut masked = config::load(&cwd)?;
            if masked.access_key.is_some() {
                masked.access_key = Some("*****".into());
            }
            println!("{}", serde_json::to_string_pretty(&masked)?);
            return Ok(());
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin, &mut io::stdout()),
                CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin, &mut io::stdout()),
                CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin, &mut io::stdout()),
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut io::stdout())
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let overrides = Config {
        company: cli.company,
        access_id: cli.access_id,
        access_key: cli.access_key,
        base_url: cli.base_url,
        output_dir: cli.output_dir,
    };
    let effective = resolve(&cwd, overrides)?;
    tracing::debug!(
        credentials = ?effective.credentials,
        base_url = %effective.base_url,
        "resolved configuration"
    );
    let client = ApiClient::new(
        &effective.base_url,
        effective.credentials.clone(),
        Duration::from_secs(cli.timeout),
    )?;

    match command {
        Commands::Explore {
            device_id,
            datasource_id,
            all,
        } => explorer(&client, &effective, all)
            .with_presets(Presets {
                device_id,
                datasource_id,
            })
            .run(Stage::ListDevices),
        Commands::Devices { all } => explorer(&client, &effective, all).show_devices(),
        Commands::Datasources { device_id } => {
            explorer(&client, &effective, false).show_datasources(&device_id)
        }
        Commands::Instances {
            device_id,
            datasource_id,
        } => explorer(&client, &effective, false).show_instances(&device_id, &datasource_id),
        Commands::Validate => validate(&client, &effective.credentials.company),
        Commands::Configure { .. } | Commands::ConfigShow | Commands::Completion { .. } => {
            unreachable!("handled earlier")
        }
    }
}

fn validate(client: &ApiClient, company: &str) -> Result<()> {
    client.get_items(DEVICES_PATH, &[("size", "1".to_string())])?;
    println!("Credentials accepted for {company}");
    Ok(())
}

fn explorer<'a>(
    client: &'a ApiClient,
    effective: &EffectiveConfig,
    all: bool,
) -> Explorer<'a, ConsolePrompter, io::Stdout> {
    Explorer::new(
        client,
        &effective.credentials.company,
        effective.output_dir.clone(),
        ConsolePrompter,
        io::stdout(),
    )
    .all_pages(all)
}
