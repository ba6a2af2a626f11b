// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use subwatch::app_config::{self, Config, TranslationProvider};
use subwatch::app_controller::{Controller, RunOutcome};
use subwatch::status::ProgressBarReporter;
use subwatch::watcher::{ChangeWatcher, ManualPlayback, PlaybackMonitor, StatusFilePlayback};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Gemini,
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch for new subtitles during playback and translate them (default command)
    Watch(WatchArgs),

    /// Translate a single subtitle file and exit
    Translate(TranslateArgs),

    /// Generate shell completions for subwatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct WatchArgs {
    /// Directory to scan for new subtitle files
    #[arg(short, long)]
    watch_dir: Option<PathBuf>,

    /// JSON file describing the player state
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Directory where translated subtitles are written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Subtitle file to translate
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Directory where the translated subtitle is written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr', or 'auto')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'ro', 'es', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

/// subwatch - translate subtitles while you watch
#[derive(Parser, Debug)]
#[command(name = "subwatch")]
#[command(version)]
#[command(about = "Watches for new subtitle files and translates them with AI providers")]
#[command(long_about = "subwatch notices a new subtitle file while something is playing, translates it \
with an AI provider while keeping every cue's timing, and writes <name>.<lang>.srt.

EXAMPLES:
    subwatch watch -w ~/Downloads/subs           # Translate new .srt files in a folder
    subwatch watch --status-file /tmp/player.json
    subwatch translate movie.srt                 # Translate one file and exit
    subwatch translate -f -t es movie.srt        # Force overwrite, translate to Spanish
    subwatch -p ollama -m llama3.2:3b watch      # Use a local model
    subwatch completions bash > subwatch.bash    # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json in the current directory, or from the
    user configuration directory (subwatch/conf.json). A default one is created
    if none exists.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

// @struct: Custom logger implementation; the level is the global max level so it can change after init
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subwatch", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(load_config(&cli.global)?, args).await,
        Some(Commands::Watch(args)) => run_watch(load_config(&cli.global)?, args).await,
        None => run_watch(load_config(&cli.global)?, WatchArgs::default()).await,
    }
}

/// `conf.json` in the working directory wins over the user configuration directory
fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from("conf.json");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("subwatch").join("conf.json"))
        .unwrap_or(local)
}

fn load_config(options: &GlobalArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = resolve_config_path(options.config_path.as_deref());
    let mut config = Config::load_or_create(&config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }

    config.validate()
        .with_context(|| format!("Configuration validation failed ({})", config_path.display()))?;
    log::set_max_level(config.log_level.to_level_filter());

    Ok(config)
}

/// Token cancelled on Ctrl-C
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            trigger.cancel();
        }
    });
    shutdown
}

async fn run_watch(mut config: Config, args: WatchArgs) -> Result<()> {
    if args.watch_dir.is_some() {
        config.watcher.watch_dir = args.watch_dir;
    }
    if args.status_file.is_some() {
        config.watcher.status_file = args.status_file;
    }
    if args.output_dir.is_some() {
        config.watcher.output_dir = args.output_dir;
    }

    let playback: Arc<dyn PlaybackMonitor> = match (&config.watcher.status_file, &config.watcher.watch_dir) {
        (Some(status_file), _) => Arc::new(StatusFilePlayback::new(status_file)),
        (None, Some(_)) => Arc::new(ManualPlayback::always_playing()),
        (None, None) => {
            return Err(anyhow!(
                "Nothing to watch: set watcher.watch_dir or watcher.status_file (or pass --watch-dir / --status-file)"
            ))
        }
    };

    let controller = Controller::with_config(config);
    info!(
        "subwatch: {} - {}",
        controller.config().translation.provider.display_name(),
        controller.config().translation.get_model()
    );
    if let Err(e) = controller.service().test_connection().await {
        warn!("Provider connection test failed: {}", e);
    }

    let mut watcher = ChangeWatcher::new(controller, playback);
    watcher.run(shutdown_on_ctrl_c()).await;
    Ok(())
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<()> {
    if args.output_dir.is_some() {
        config.watcher.output_dir = args.output_dir;
    }

    let controller = Controller::with_config(config).with_reporter(Arc::new(ProgressBarReporter::new()));
    let shutdown = shutdown_on_ctrl_c();

    match controller.run(&args.input_file, args.force_overwrite, &shutdown).await? {
        RunOutcome::Translated(output) => info!("Success: {}", output.display()),
        RunOutcome::AlreadyTranslated(output) => {
            warn!("Output file already exists: {}. Use -f to force overwrite.", output.display())
        }
        RunOutcome::Cancelled => warn!("Translation interrupted"),
    }
    Ok(())
}
