// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use reflective_translate::app_config::{self, Config, TranslationProvider};
use reflective_translate::errors::AppError;
use reflective_translate::language_utils::display_language;
use reflective_translate::translation::{TranslationRequest, TranslationService};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
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

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a text file or standard input (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for reflective-translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Input text file; reads standard input when absent or '-'
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Write the translation to this file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language, as a name or ISO code (e.g., 'English', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language, as a name or ISO code (e.g., 'Spanish', 'es')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Country whose colloquial style the translation should match
    #[arg(short, long)]
    country: Option<String>,

    /// Token budget above which the text is split into chunks
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Read the input as four lines: source language, target language, country, text
    #[arg(long)]
    prompt: bool,

    /// Only check that the provider is reachable
    #[arg(long)]
    test_connection: bool,
}

/// reflective-translate - translate, reflect, improve
///
/// Translates text with an LLM, asks the model to critique its own
/// translation, then applies the critique. Long texts are split into
/// token-budgeted chunks that are translated with the whole text as context.
#[derive(Parser, Debug)]
#[command(name = "reflective-translate")]
#[command(version)]
#[command(about = "Three-pass LLM translation: translate, reflect, improve")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "reflective-translate translates text with an LLM in three steps: an initial
translation, an expert critique of that translation, and an improved translation.

EXAMPLES:
    reflective-translate article.txt                       # Translate using default config
    reflective-translate -s en -t es -c Mexico article.txt # English to Mexican Spanish
    cat notes.md | reflective-translate -t German -o out.md
    reflective-translate --prompt request.txt              # Four-line prompt file
    reflective-translate -p ollama -m llama3 article.txt   # Use specific provider and model
    reflective-translate completions bash > rt.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys left empty are read from
    OPENAI_API_KEY and ANTHROPIC_API_KEY.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (default, requires API key)
    anthropic - Anthropic API (requires API key)
    ollama    - Local Ollama server
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Filtering is done by the global max level
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
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

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "reflective-translate", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => Ok(run_translate(args).await?),
        None => Ok(run_translate(cli.translate).await?),
    }
}

/// Load the configuration and apply command line overrides
fn load_config(options: &TranslateArgs) -> Result<Config, AppError> {
    let mut config =
        Config::load_or_create(&options.config_path).map_err(|e| AppError::Config(format!("{:#}", e)))?;

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
    if let Some(country) = &options.country {
        config.country = country.clone();
    }
    if let Some(max_tokens) = options.max_tokens {
        config.chunking.max_tokens_per_chunk = max_tokens;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.apply_api_key_overrides(|name| std::env::var(name).ok());

    // Validate the configuration after loading and overriding
    config
        .validate()
        .map_err(|e| AppError::Config(format!("Configuration validation failed: {:#}", e)))?;

    Ok(config)
}

fn read_input(input: Option<&Path>) -> Result<String, AppError> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| AppError::File(format!("Failed to read {}: {}", path.display(), e))),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn write_output(output: Option<&Path>, translation: &str) -> Result<(), AppError> {
    match output {
        Some(path) => {
            std::fs::write(path, translation)
                .map_err(|e| AppError::File(format!("Failed to write {}: {}", path.display(), e)))?;
            info!("Success: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(translation.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn run_translate(options: TranslateArgs) -> Result<(), AppError> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config = load_config(&options)?;
    log::set_max_level(level_filter(&config.log_level));

    let service = TranslationService::from_config(&config)?;

    if options.test_connection {
        service
            .test_connection()
            .await
            .map_err(|e| anyhow!("Connection test failed for {}: {}", service.provider_name(), e))?;
        info!("Connection to {} OK", service.provider_name());
        return Ok(());
    }

    let text = read_input(options.input.as_deref())?;
    let max_tokens = config.chunking.max_tokens_per_chunk;

    let mut request = if options.prompt {
        TranslationRequest::from_prompt(&text, max_tokens)?
    } else {
        TranslationRequest::new(&config.source_language, &config.target_language, text)
            .with_country(&config.country)
            .with_max_tokens_per_chunk(max_tokens)
    };
    request.source_language = display_language(&request.source_language);
    request.target_language = display_language(&request.target_language);

    info!(
        "Translating from {} to {} with {} ({})",
        request.source_language,
        request.target_language,
        config.translation.provider.display_name(),
        config.translation.get_model()
    );

    let translation = service.translate(&request).await?;
    write_output(options.output.as_deref(), &translation)
}
