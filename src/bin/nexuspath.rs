//! CLI binary for nexuspath.
//!
//! A thin shim over the library crate: flags map onto `Preferences` and
//! `SynthesisConfig`, files go through a `SessionController`, and the result
//! is printed and optionally exported.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nexuspath::{
    write_to_dir, Document, ExportFormat, GeminiBackend, Language, Preferences, ProviderBackend,
    SessionController, StandardExtractor, SynthesisBackend, SynthesisClient, SynthesisConfig,
    TaskMode,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  nexuspath atomic-habits.epub deep-work.pdf --api-key "$KEY"
  nexuspath book.pdf --api-key "$KEY" --mode summary --language Spanish
  nexuspath *.epub --api-key "$KEY" --out-dir plan/ --format pdf --format docx
  nexuspath book.pdf --provider openai --model gpt-4.1-mini

MODELS:
  Without --model the Gemini catalog for your key is queried on every run and
  the first of gemini-1.5-flash, gemini-1.5-pro, gemini-pro that is listed is
  used (otherwise the first model able to generate content).

  With --provider the request goes through that provider instead; its
  credentials are read from the provider's usual environment variable.

LOGGING:
  RUST_LOG overrides -v / -q (e.g. RUST_LOG=nexuspath=debug).
"#;

/// Turn PDF and EPUB books into a summary or a unified life action plan.
#[derive(Parser, Debug)]
#[command(
    name = "nexuspath",
    version,
    about = "Turn PDF and EPUB books into a summary or a unified life action plan",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or EPUB files, in the order their text should be combined.
    #[arg(required = true)]
    documents: Vec<PathBuf>,

    /// Gemini API key.
    #[arg(long)]
    api_key: Option<String>,

    /// Language the answer is written in.
    #[arg(short, long, default_value = "English")]
    language: Language,

    /// What to produce.
    #[arg(short, long, value_enum, default_value = "plan")]
    mode: ModeArg,

    /// Use this model instead of discovering one.
    #[arg(long)]
    model: Option<String>,

    /// Send the request through an edgequake-llm provider (openai, anthropic,
    /// gemini, ollama, …). Requires --model.
    #[arg(long, requires = "model")]
    provider: Option<String>,

    /// Characters of combined text sent to the model.
    #[arg(long, default_value_t = 15_000)]
    budget: usize,

    /// Write exports into this directory.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Export formats to write with --out-dir (txt, docx, pdf). Default: all.
    #[arg(short, long = "format")]
    formats: Vec<ExportFormat>,

    /// Debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only; no summary lines on stderr.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Summary,
    Plan,
}

impl From<ModeArg> for TaskMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Summary => TaskMode::Summary,
            ModeArg::Plan => TaskMode::Plan,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = log_filter(cli.verbose, cli.quiet);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let backend: Arc<dyn SynthesisBackend> = match (&cli.provider, &cli.model) {
        (Some(provider), Some(model)) => Arc::new(
            ProviderBackend::from_name(provider, model)
                .with_context(|| format!("Failed to set up provider '{provider}'"))?,
        ),
        _ => Arc::new(GeminiBackend::new(&config).context("Failed to build HTTP client")?),
    };

    let mut preferences = Preferences::new(cli.language, cli.mode.into());
    if let Some(key) = &cli.api_key {
        preferences = preferences.with_api_key(key.clone());
    }

    let client = SynthesisClient::new(backend, config);
    let mut session = SessionController::new(Arc::new(StandardExtractor), client, preferences);

    let documents = cli
        .documents
        .iter()
        .map(Document::from_path)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read input")?;

    let uploaded = session.upload(documents).await;
    report_notices(&mut session);
    uploaded.context("Extraction failed")?;

    let Some(result) = session.generate().await.cloned() else {
        report_notices(&mut session);
        bail!("Nothing was generated");
    };

    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !result.text.ends_with('\n') {
            handle.write_all(b"\n").context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && result.is_success() {
        eprintln!(
            "{}  {}  {}ms  {} tokens in / {} out",
            green("✔"),
            result.model.as_deref().unwrap_or("-"),
            result.duration_ms,
            result.input_tokens,
            result.output_tokens,
        );
    }

    if let Some(dir) = &cli.out_dir {
        let formats = if cli.formats.is_empty() {
            ExportFormat::ALL.to_vec()
        } else {
            cli.formats.clone()
        };
        for format in formats {
            match session.export(format) {
                Ok(payload) => {
                    let path = write_to_dir(&payload, dir)
                        .await
                        .with_context(|| format!("Failed to write {format} export"))?;
                    if !cli.quiet {
                        eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
                Err(e) => eprintln!("{}  {format}: {e}", yellow("⚠")),
            }
        }
    }
    report_notices(&mut session);

    if let Some(failure) = result.failure {
        bail!("{failure}");
    }
    Ok(())
}

/// Default log level when `RUST_LOG` is unset.
fn log_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

fn build_config(cli: &Cli) -> Result<SynthesisConfig> {
    let mut builder = SynthesisConfig::builder().char_budget(cli.budget);
    if let Some(model) = &cli.model {
        builder = builder.model(model.clone());
    }
    builder.build().context("Invalid configuration")
}

fn report_notices(session: &mut SessionController) {
    for notice in session.take_notices() {
        eprintln!("{}  {}", yellow("⚠"), notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_levels() {
        assert_eq!(log_filter(false, false), "info");
        assert_eq!(log_filter(true, false), "debug");
        assert_eq!(log_filter(false, true), "error");
    }

    #[test]
    fn cli_parses_formats_and_mode() {
        let cli = Cli::try_parse_from([
            "nexuspath", "a.pdf", "b.epub", "--mode", "summary", "-f", "pdf", "-f", "txt",
        ])
        .unwrap();
        assert_eq!(cli.documents.len(), 2);
        assert!(matches!(cli.mode, ModeArg::Summary));
        assert_eq!(cli.formats, vec![ExportFormat::Pdf, ExportFormat::Text]);
        assert_eq!(cli.language, Language::English);
    }
}
