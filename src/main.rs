use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use certfill::strategies::SlotPrinter;
use certfill::{BooleanRendering, ExtractedFieldSet, FillEngine, FillOptions, MatchPolicy, MatchSource, RuleBook};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Preview,
    Render,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Shared,
    Consuming,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Booleans {
    Label,
    Specification,
}

#[derive(Parser)]
#[command(name = "certfill")]
#[command(about = "Fill Certificate-of-Analysis templates with extracted data")]
#[command(version)]
struct Cli {
    /// Template file; read from stdin when omitted
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// JSON object of extracted fields
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Treat the template as Markdown and flatten it first
    #[arg(long)]
    markdown: bool,

    #[arg(long, value_enum, default_value = "preview")]
    mode: Mode,

    /// Whether one field may fill several slots
    #[arg(long, value_enum, default_value = "shared")]
    policy: Policy,

    /// How true/false test results are written
    #[arg(long, value_enum, default_value = "label")]
    booleans: Booleans,

    /// Extra YAML rule files (glob pattern)
    #[arg(long, value_name = "GLOB")]
    rules: Option<String>,

    /// Raw OCR text used to backfill missing fields
    #[arg(long, value_name = "FILE")]
    aux_text: Option<PathBuf>,

    /// List the located slots instead of filling
    #[arg(long)]
    slots: bool,
}

fn read_template(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read template: {}", path.display())),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read template from stdin")?;
            Ok(input)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let rules = match &cli.rules {
        Some(pattern) => RuleBook::from_config_glob(pattern).with_context(|| format!("Failed to load rules from {}", pattern))?,
        None => RuleBook::builtin(),
    };
    let engine = FillEngine::with_rules(rules);

    let source = read_template(cli.template.as_ref())?;
    let template = if cli.markdown {
        engine
            .template_from_markdown(&source)
            .context("Failed to flatten Markdown template")?
    } else {
        engine.template(&source)
    };

    if cli.slots {
        SlotPrinter::print(&template);
        return Ok(());
    }

    let data_path = cli.data.as_ref().context("--data is required unless --slots is given")?;
    let raw = fs::read_to_string(data_path).with_context(|| format!("Failed to read data: {}", data_path.display()))?;
    let raw: ExtractedFieldSet =
        serde_json::from_str(&raw).with_context(|| format!("Data is not a JSON object: {}", data_path.display()))?;

    let aux = match &cli.aux_text {
        Some(path) => {
            Some(fs::read_to_string(path).with_context(|| format!("Failed to read OCR text: {}", path.display()))?)
        }
        None => None,
    };
    let fields = engine.normalize(&raw, aux.as_deref());

    let options = match cli.mode {
        Mode::Preview => FillOptions::preview(),
        Mode::Render => FillOptions::render(),
    }
    .with_policy(match cli.policy {
        Policy::Shared => MatchPolicy::NonConsuming,
        Policy::Consuming => MatchPolicy::Consuming,
    })
    .with_booleans(match cli.booleans {
        Booleans::Label => BooleanRendering::Label,
        Booleans::Specification => BooleanRendering::NearestSpecification,
    });

    let outcome = engine.fill(&template, &fields, options);
    let unmatched = outcome
        .matches
        .iter()
        .filter(|m| m.source == MatchSource::Unmatched)
        .count();
    if unmatched > 0 {
        tracing::warn!(unmatched, total = outcome.matches.len(), "some slots stayed empty");
    }

    print!("{}", outcome.text);
    Ok(())
}
