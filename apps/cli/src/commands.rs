//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use agendafetch_agenda::LinkExtractor;
use agendafetch_core::pipeline::{Pipeline, Plan, ProgressReporter, RunResult};
use agendafetch_drive::{DriveClient, StorageBackend, auth};
use agendafetch_shared::{
    AppConfig, RunConfig, config_file_path, init_config, load_config, load_config_from,
    parse_keywords, table_selector,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// AgendaFetch: collect the files an agenda links to into one folder.
#[derive(Parser)]
#[command(
    name = "agendafetch",
    version,
    about = "Copy keyword-matched files from the Drive folders linked in an agenda into one output folder.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.agendafetch/agendafetch.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Flags that override the `[agenda]` section.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct AgendaArgs {
    /// Agenda document id.
    #[arg(long)]
    pub document_id: Option<String>,

    /// Only read links from this table (1-indexed; 0 reads the whole document).
    #[arg(long)]
    pub table: Option<u32>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the output folder from the agenda's linked folders.
    Run {
        #[command(flatten)]
        agenda: AgendaArgs,

        /// Comma-separated keywords to match in file names.
        #[arg(long)]
        keywords: Option<String>,

        /// Drive folder that receives the output folder.
        #[arg(long)]
        parent_id: Option<String>,

        /// Name of the output folder.
        #[arg(long)]
        folder_name: Option<String>,

        /// Resolve and filter, but print the plan instead of changing Drive.
        #[arg(long)]
        dry_run: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the folder links found in the agenda.
    Folders {
        #[command(flatten)]
        agenda: AgendaArgs,

        /// Print the folders as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "agendafetch=info",
        1 => "agendafetch=debug",
        _ => "agendafetch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            agenda,
            keywords,
            parent_id,
            folder_name,
            dry_run,
            json,
        } => {
            let mut config = read_config(config_path.as_ref())?;
            apply_agenda_args(&mut config, agenda);
            if let Some(keywords) = keywords {
                config.search.keywords = keywords;
            }
            if let Some(parent_id) = parent_id {
                config.output.parent_id = parent_id;
            }
            if let Some(folder_name) = folder_name {
                config.output.folder_name = folder_name;
            }
            cmd_run(&config, dry_run, json).await
        }
        Command::Folders { agenda, json } => {
            let mut config = read_config(config_path.as_ref())?;
            apply_agenda_args(&mut config, agenda);
            cmd_folders(&config, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_ref()).await,
        },
    }
}

fn read_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

fn apply_agenda_args(config: &mut AppConfig, args: AgendaArgs) {
    if let Some(document_id) = args.document_id {
        config.agenda.document_id = document_id;
    }
    if let Some(table) = args.table {
        config.agenda.table = table;
    }
}

async fn drive_client(config: &AppConfig) -> Result<DriveClient> {
    let token = auth::access_token(&config.auth).await?;
    Ok(DriveClient::new(token)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig, dry_run: bool, json: bool) -> Result<()> {
    let run_config = RunConfig::from(config);
    // Fail on a bad config before asking for credentials.
    run_config.validate()?;

    let client = drive_client(config).await?;
    let pipeline = Pipeline::new(&client, run_config)?;

    info!(
        document = %config.agenda.document_id,
        keywords = %config.search.keywords,
        output = %config.output.folder_name,
        dry_run,
        "starting agenda fetch"
    );

    let reporter = CliProgress::new(json);

    if dry_run {
        let plan = pipeline.plan(&reporter).await;
        reporter.finish();
        let plan = plan?;
        if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }
        return Ok(());
    }

    let result = pipeline.run(&reporter).await;
    reporter.finish();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

async fn cmd_folders(config: &AppConfig, json: bool) -> Result<()> {
    if config.agenda.document_id.trim().is_empty() {
        return Err(eyre!(
            "agenda document id is not set ([agenda] document_id or --document-id)"
        ));
    }

    let extractor = LinkExtractor::new(table_selector(config.agenda.table))?;
    let client = drive_client(config).await?;
    let html = client.export(&config.agenda.document_id).await?;
    let folders = extractor.extract(&html).into_folders();

    if json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
        return Ok(());
    }

    if folders.is_empty() {
        println!("No folder links found.");
        return Ok(());
    }

    for (i, folder) in folders.iter().enumerate() {
        println!("{:>3}. {}  ({})", i + 1, folder.name, folder.id);
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!(
            "config file already exists at {}; edit it or remove it first",
            path.display()
        ));
    }

    let path = init_config()?;
    println!("Created {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config = read_config(path)?;
    let source = match path {
        Some(p) => p.clone(),
        None => config_file_path()?,
    };

    println!("# {}", source.display());
    println!("{}", toml::to_string_pretty(&config)?);

    let keywords = parse_keywords(&config.search.keywords);
    println!("# parsed keywords: {keywords:?}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_plan(plan: &Plan) {
    println!();
    println!("  Dry run: nothing was changed.");
    println!("  Folders linked: {}", plan.folders.len());
    println!(
        "  Output:         {} (in {})",
        plan.manifest.folder_name, plan.manifest.parent_id
    );
    println!();
    print_groups(&plan.manifest);
    print_skipped(&plan.skipped);
}

fn print_result(result: &RunResult) {
    println!();
    match &result.output {
        None => {
            println!("  No folder links found in the agenda; nothing was changed.");
        }
        Some(output) => {
            println!("  Output folder rebuilt.");
            println!("  Folder:  {} ({})", result.manifest.folder_name, output.folder_id);
            println!("  Linked:  {}", result.folders_found);
            println!("  Copied:  {}", output.files_copied);
            if output.folders_replaced > 0 {
                println!("  Replaced {} previous folder(s)", output.folders_replaced);
            }
            println!();
            print_groups(&result.manifest);
            print_skipped(&result.skipped);
        }
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn print_groups(manifest: &agendafetch_shared::OutputManifest) {
    for (i, group) in manifest.groups.iter().enumerate() {
        println!("  [{i}] {}", group.source.name);
        for file in &group.files {
            println!("        {}", file.name);
        }
    }
}

fn print_skipped(skipped: &[agendafetch_core::pipeline::SkippedFolder]) {
    if skipped.is_empty() {
        return;
    }
    println!();
    println!("  Skipped:");
    for s in skipped {
        println!("    {} ({})", s.folder.name, s.folder.id);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    /// A hidden spinner keeps JSON output clean.
    fn new(hidden: bool) -> Self {
        if hidden {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn folder_resolved(&self, name: &str, matched: usize, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Searching [{current}/{total}] {name}: {matched} match(es)"));
    }

    fn file_copied(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Copying [{current}/{total}] {name}"));
    }

    fn done(&self, _result: &RunResult) {
        self.finish();
    }
}
