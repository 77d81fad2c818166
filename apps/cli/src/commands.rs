//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use brochurizer_core::pipeline::{
    BrochureOutcome, BrochureRequest, PipelineContext, ProgressReporter, create_brochure,
};
use brochurizer_fetcher::{HttpPageFetcher, PageFetcher, check_reachable, normalize_seed_url};
use brochurizer_llm::OpenAiCompatClient;
use brochurizer_shared::{
    AppConfig, BrochureError, ClassifiedLink, LlmSettings, init_config, load_config,
};
use clap::{Parser, Subcommand};
use color_eyre::Section;
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Brochurizer: turn a company website into a short brochure.
#[derive(Parser)]
#[command(
    name = "brochurizer",
    version,
    about = "Create a Markdown brochure for a company from its website.",
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
    /// Create a brochure for the company behind a URL.
    Create {
        /// Company website (the scheme defaults to https).
        url: String,

        /// Translate the brochure into this language.
        #[arg(short, long)]
        language: Option<String>,

        /// Print the brochure without writing it to disk.
        #[arg(long)]
        no_export: bool,

        /// Directory to export into (overrides `[brochure].output_dir`).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Model identifier (overrides config and the MODEL variable).
        #[arg(long)]
        model: Option<String>,

        /// API base URL (overrides config and the BASE_URL variable).
        #[arg(long)]
        base_url: Option<String>,

        /// Skip the up-front reachability check of the URL.
        #[arg(long)]
        skip_reachability: bool,
    },

    /// List the languages a brochure can be translated into.
    Languages,

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

/// Default filter for a `-v` count: `warn`, then info, debug, trace.
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "brochurizer=warn",
        1 => "brochurizer=info",
        2 => "brochurizer=debug",
        _ => "brochurizer=trace",
    }
}

/// Initialize tracing based on CLI flags. Logs go to stderr so the
/// brochure on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)));

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

/// Options for `brochurizer create`.
struct CreateArgs {
    url: String,
    language: Option<String>,
    export: bool,
    output_dir: Option<PathBuf>,
    model: Option<String>,
    base_url: Option<String>,
    skip_reachability: bool,
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Create {
            url,
            language,
            no_export,
            output_dir,
            model,
            base_url,
            skip_reachability,
        } => {
            cmd_create(CreateArgs {
                url,
                language,
                export: !no_export,
                output_dir,
                model,
                base_url,
                skip_reachability,
            })
            .await
        }
        Command::Languages => cmd_languages(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

async fn cmd_create(args: CreateArgs) -> Result<()> {
    let CreateArgs {
        url: raw_url,
        language,
        export,
        output_dir,
        model,
        base_url,
        skip_reachability,
    } = args;

    let config = load_config()?;

    let mut settings = LlmSettings::resolve(&config)?;
    if let Some(model) = model {
        settings.model = model;
    }
    if let Some(base_url) = base_url {
        settings.base_url = base_url.trim_end_matches('/').to_string();
    }

    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.brochure.output_dir));

    let url = normalize_seed_url(&raw_url)?;
    info!(%url, model = %settings.model, language = ?language, "creating brochure");

    let fetcher = HttpPageFetcher::new(&config.fetch)?;
    let llm = OpenAiCompatClient::new(&settings)?;
    let reporter = CliProgress::new();

    let ctx = PipelineContext {
        fetcher: &fetcher,
        llm: &llm,
        model: &settings.model,
        max_content_chars: config.brochure.max_content_chars,
        supported_languages: &config.brochure.supported_languages,
        output_dir: &output_dir,
    };

    let run = async {
        if !skip_reachability {
            reporter.phase(&format!("Checking {url}"));
            let timeout = Duration::from_secs(config.fetch.reachability_timeout_secs);
            check_reachable(&url, timeout).await?;
        }

        reporter.phase(&format!("Fetching {url}"));
        let seed = fetcher.fetch(url.as_str()).await?;

        let request = BrochureRequest {
            seed,
            language,
            export,
        };
        create_brochure(&request, ctx, &reporter).await
    };

    let result = tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            reporter.abandon();
            return Err(eyre!("interrupted, no brochure was written"));
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.abandon();
            return Err(failure_report(e));
        }
    };

    eprintln!();
    eprintln!("  Brochure created!");
    eprintln!("  Links:   {} selected, {} skipped", outcome.links.len(), outcome.skipped_links.len());
    if let Some(language) = &outcome.translated_to {
        eprintln!("  Language: {language}");
    }
    match &outcome.exported_to {
        Some(path) => eprintln!("  Saved:   {}", path.display()),
        None => eprintln!("  Saved:   (not exported)"),
    }
    eprintln!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    eprintln!();

    Ok(())
}

/// Retryable failures get the short "try again" treatment; the rest surface as-is.
fn failure_report(e: BrochureError) -> color_eyre::Report {
    if e.is_retryable() {
        eyre!("Brochure creation failed: {e}")
            .suggestion("Re-run the command to try again, or pass a different URL.")
    } else {
        e.into()
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: an indicatif spinner for phases, raw deltas on stdout
/// while a brochure streams in.
struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn new_spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    fn set_message(&self, msg: String) {
        if let Ok(mut slot) = self.spinner.lock() {
            slot.get_or_insert_with(Self::new_spinner).set_message(msg);
        }
    }

    fn clear(&self) {
        let spinner = self.spinner.lock().ok().and_then(|mut slot| slot.take());
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    }

    fn abandon(&self) {
        self.clear();
        let _ = std::io::stdout().flush();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.set_message(name.to_string());
    }

    fn links_selected(&self, links: &[ClassifiedLink]) {
        info!(count = links.len(), "links selected");
        for link in links {
            info!(kind = %link.kind, url = %link.url, "selected link");
        }
    }

    fn link_fetching(&self, link: &ClassifiedLink, current: usize, total: usize) {
        self.set_message(format!("Fetching [{current}/{total}] {}", link.url));
    }

    fn link_skipped(&self, link: &ClassifiedLink, _reason: &str) {
        // The pipeline already logs the reason.
        self.set_message(format!("Skipped {}", link.url));
    }

    fn stream_started(&self, label: &str) {
        self.clear();
        eprintln!("\n--- {label} ---\n");
    }

    fn delta(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn stream_finished(&self) {
        println!();
    }

    fn done(&self, _outcome: &BrochureOutcome) {
        self.clear();
    }
}

// ---------------------------------------------------------------------------
// languages / config
// ---------------------------------------------------------------------------

fn cmd_languages() -> Result<()> {
    let config = load_config()?;
    for language in &config.brochure.supported_languages {
        println!("{language}");
    }
    Ok(())
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
