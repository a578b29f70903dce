///
/// This module implements the full CLI interface for phrase-sync: command parsing,
/// flag overrides on top of the `.phrase` config, and the user-visible output of
/// every command.
///
/// All format, path and orchestration logic lives in the [`phrase-sync-core`] crate.
/// This module is strictly CLI glue.
///
/// ## Commands
/// - `init`: store the project secret and defaults, and set up the default locale.
/// - `pull`: download locale files.
/// - `push`: upload local localization files.
/// - `tags`: list the project's tags.
///
/// ## How To Use
/// - For command-line users: run the `phrase-sync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`phrase-sync-core`]: ../../phrase-sync-core/
use crate::client::PhraseClient;
use crate::load_config::{load_config, save_config, ProjectConfig, DEFAULT_CONFIG_PATH};
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use phrase_sync_core::contract::TranslationService;
use phrase_sync_core::formats::FormatRegistry;
use phrase_sync_core::pull::{DownloadSpec, LocaleOutcome, PullOrchestrator, PullReport};
use phrase_sync_core::push::{FileOutcome, PushOrchestrator, UploadSpec};
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Format downloaded when neither the config nor `--format` names one.
pub const DEFAULT_DOWNLOAD_FORMAT: &str = "yml";

static UPDATED_SINCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{14}$").expect("updated-since pattern"));

/// CLI for phrase-sync: keep localization files in sync with PhraseApp.
#[derive(Parser, Debug)]
#[clap(
    name = "phrase-sync",
    version,
    about = "Pull and push localization files from and to a PhraseApp project"
)]
pub struct Cli {
    /// Path to the project config file
    #[clap(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a phrase project and write the config file
    Init(InitArgs),
    /// Download locale files
    Pull(PullArgs),
    /// Upload localization files
    Push(PushArgs),
    /// List all the tags in the current project
    Tags(TagsArgs),
}

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Your auth token
    #[clap(long)]
    pub secret: Option<String>,
    /// The default locale for your application
    #[clap(long)]
    pub default_locale: Option<String>,
    /// The default format for locale files
    #[clap(long)]
    pub default_format: Option<String>,
    /// The default domain or app prefix for locale files
    #[clap(long)]
    pub domain: Option<String>,
    /// The directory naming for locale files, e.g. ./<locale.name>/
    #[clap(long)]
    pub locale_directory: Option<String>,
    /// The filename for locale files, e.g. <domain>.<format>
    #[clap(long)]
    pub locale_filename: Option<String>,
    /// The default target directory for locale files
    #[clap(long)]
    pub default_target: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct PullArgs {
    /// Locales to download; all locales when omitted
    pub locales: Vec<String>,
    /// Auth token to use instead of the saved one
    #[clap(long)]
    pub secret: Option<String>,
    /// Target folder to store locale files
    #[clap(long)]
    pub target: Option<String>,
    /// Encoding of the downloaded files, e.g. UTF-8, UTF-16 or ISO-8859-1
    #[clap(long)]
    pub encoding: Option<String>,
    /// Format of the downloaded files
    #[clap(long)]
    pub format: Option<String>,
    /// Only download keys with this tag
    #[clap(long)]
    pub tag: Option<String>,
    /// Only download translations changed since YYYYMMDDHHMMSS (UTC)
    #[clap(long)]
    pub updated_since: Option<String>,
    #[clap(long)]
    pub include_empty_translations: bool,
    #[clap(long)]
    pub keep_notranslate_tags: bool,
    #[clap(long)]
    pub convert_emoji: bool,
    #[clap(long)]
    pub skip_unverified_translations: bool,
}

#[derive(Args, Debug, Default)]
pub struct PushArgs {
    /// Files or directories to upload; config/locales when omitted
    pub paths: Vec<PathBuf>,
    /// Auth token to use instead of the saved one
    #[clap(long)]
    pub secret: Option<String>,
    /// Format of the uploaded files; guessed from each extension when omitted
    #[clap(long)]
    pub format: Option<String>,
    /// Descend into subdirectories
    #[clap(long, short = 'R')]
    pub recursive: bool,
    /// Comma-separated tags to attach to the uploaded keys
    #[clap(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    /// Locale of the uploaded file; only valid for a single file
    #[clap(long)]
    pub locale: Option<String>,
    /// Overwrite existing translations with the file content
    #[clap(long)]
    pub force_update_translations: bool,
    /// Do not unverify existing translations that get updated
    #[clap(long)]
    pub skip_unverification: bool,
    /// Do not create an upload tag
    #[clap(long)]
    pub skip_upload_tags: bool,
    #[clap(long)]
    pub convert_emoji: bool,
}

#[derive(Args, Debug, Default)]
pub struct TagsArgs {
    /// Auth token to use instead of the saved one
    #[clap(long)]
    pub secret: Option<String>,
    /// List all tags
    #[clap(long)]
    pub list: bool,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let project = load_config(&cli.config)?;
    let registry = FormatRegistry::standard();
    match cli.command {
        Commands::Init(args) => init(&cli.config, project, args).await,
        Commands::Pull(args) => pull(project, &registry, args).await,
        Commands::Push(args) => push(project, &registry, args).await,
        Commands::Tags(args) => tags(project, args).await,
    }
}

/// Replace `target` with the flag value when one was given.
fn override_with(target: &mut String, flag: Option<String>) {
    if let Some(value) = flag {
        *target = value;
    }
}

fn require_secret(project: &ProjectConfig) -> Result<()> {
    if project.secret.is_empty() {
        tracing::error!("No auth token was given");
        return Err(anyhow!(
            "No auth token was given. Please provide the --secret=YOUR_SECRET parameter."
        ));
    }
    Ok(())
}

fn connect(project: &ProjectConfig) -> Result<PhraseClient> {
    require_secret(project)?;
    PhraseClient::new(project.secret.clone())
        .map_err(|e| anyhow!("Failed to construct the API client: {e}"))
}

async fn init(path: &Path, mut project: ProjectConfig, args: InitArgs) -> Result<()> {
    override_with(&mut project.secret, args.secret);
    let config = &mut project.config;
    override_with(&mut config.default_locale, args.default_locale);
    override_with(&mut config.format, args.default_format);
    override_with(&mut config.domain, args.domain);
    override_with(&mut config.locale_directory, args.locale_directory);
    override_with(&mut config.locale_filename, args.locale_filename);
    override_with(&mut config.target_directory, args.default_target);

    require_secret(&project)?;
    save_config(path, &project)?;
    println!("Updated config file {}", path.display());

    let client = connect(&project)?;
    setup_default_locale(&client, &project.config.default_locale).await;
    Ok(())
}

/// Create the default locale and promote it. Neither failure aborts `init`.
pub async fn setup_default_locale<S: TranslationService + ?Sized>(service: &S, locale: &str) {
    if let Err(e) = service.create_locale(locale).await {
        tracing::warn!(locale, error = %e, "Default locale could not be created");
        eprintln!("Notice: Locale \"{locale}\" could not be created (maybe it already exists)");
    }
    match service.make_default_locale(locale).await {
        Ok(_) => println!("Locale \"{locale}\" is now the default locale"),
        Err(e) => {
            tracing::error!(locale, error = %e, "Failed to make locale the default");
            eprintln!("Error encountered while assigning locale {locale} as default: {e}");
        }
    }
}

async fn pull(mut project: ProjectConfig, registry: &FormatRegistry, args: PullArgs) -> Result<()> {
    override_with(&mut project.secret, args.secret);
    let config = &mut project.config;
    override_with(&mut config.target_directory, args.target);
    override_with(&mut config.encoding, args.encoding);
    override_with(&mut config.format, args.format);
    if config.format.is_empty() {
        config.format = DEFAULT_DOWNLOAD_FORMAT.to_string();
    }

    if let Some(since) = &args.updated_since {
        if !UPDATED_SINCE.is_match(since) {
            tracing::error!(updated_since = %since, "Invalid updated-since");
            return Err(anyhow!(
                "Error parsing updated-since ({since}), format should be YYYYMMDDHHMMSS"
            ));
        }
    }
    registry.require(&project.config.format)?;

    let client = connect(&project)?;
    let spec = DownloadSpec {
        tag: args.tag,
        updated_since: args.updated_since,
        include_empty_translations: args.include_empty_translations,
        keep_notranslate_tags: args.keep_notranslate_tags,
        convert_emoji: args.convert_emoji,
        skip_unverified_translations: args.skip_unverified_translations,
    };
    tracing::info!(command = "pull", "Starting pull");
    let report = PullOrchestrator::new(&client, registry, &project.config)
        .pull(&spec, &args.locales)
        .await
        .map_err(|e| {
            tracing::error!(command = "pull", error = %e, "Pull failed");
            anyhow::Error::new(e)
        })?;

    render_pull_report(&report, &mut std::io::stdout().lock(), &mut std::io::stderr().lock())?;
    tracing::info!(
        command = "pull",
        downloaded = report.downloaded().count(),
        total = report.locales.len(),
        "Pull complete"
    );
    Ok(())
}

/// Print one line per locale: successes to `out`, skips, rate limits and
/// failures to `err`. A rate-limited unit is not reported as downloaded.
pub fn render_pull_report(
    report: &PullReport,
    out: &mut impl Write,
    err: &mut impl Write,
) -> std::io::Result<()> {
    for name in &report.skipped {
        writeln!(err, "Skipping unknown locale {name}")?;
    }
    for unit in &report.locales {
        match &unit.outcome {
            LocaleOutcome::Downloaded { path } => writeln!(out, "Downloaded {}", path.display())?,
            LocaleOutcome::RateLimited { reset_at: Some(reset), .. } => writeln!(
                err,
                "Rate limit reached. Please try again after unix time {reset}"
            )?,
            LocaleOutcome::RateLimited { reset_at: None, .. } => {
                writeln!(err, "Rate limit reached. Please try again later")?
            }
            LocaleOutcome::Failed { error } => {
                writeln!(err, "Error downloading locale {}:\n\t{error}", unit.locale)?
            }
        }
    }
    Ok(())
}

async fn push(mut project: ProjectConfig, registry: &FormatRegistry, args: PushArgs) -> Result<()> {
    override_with(&mut project.secret, args.secret);
    override_with(&mut project.config.format, args.format);

    let client = connect(&project)?;
    let spec = UploadSpec {
        format: Some(project.config.format.clone()).filter(|f| !f.is_empty()),
        locale: args.locale,
        tags: args.tags,
        update_translations: args.force_update_translations,
        skip_unverification: args.skip_unverification,
        skip_upload_tags: args.skip_upload_tags,
        convert_emoji: args.convert_emoji,
    };
    tracing::info!(command = "push", "Starting push");
    let report = PushOrchestrator::new(&client, registry)
        .push(&spec, &args.paths, args.recursive)
        .await
        .map_err(|e| {
            tracing::error!(command = "push", error = %e, "Push failed");
            anyhow::Error::new(e)
        })?;

    for file in &report.files {
        match &file.outcome {
            FileOutcome::Uploaded { locale } => {
                println!("Uploaded {} ({locale})", file.path.display())
            }
            FileOutcome::Unsupported => {
                eprintln!("Could not upload {} (type not supported)", file.path.display())
            }
            FileOutcome::Failed { error } => {
                eprintln!("Error uploading {}:\n\t{error}", file.path.display())
            }
        }
    }
    tracing::info!(
        command = "push",
        uploaded = report.uploaded().count(),
        total = report.files.len(),
        "Push complete"
    );
    Ok(())
}

async fn tags(mut project: ProjectConfig, args: TagsArgs) -> Result<()> {
    override_with(&mut project.secret, args.secret);
    let client = connect(&project)?;
    let tags = client.list_tags().await.map_err(|e| {
        tracing::error!(command = "tags", error = %e, "Failed to list tags");
        anyhow!("Error encountered while pulling tags from the API: {e}")
    })?;
    for tag in tags {
        println!("{}", tag.name);
    }
    Ok(())
}
