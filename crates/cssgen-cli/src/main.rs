use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cssgen_common::config::ResolvedConfigData;
use cssgen_engine::config::UserConfig;
use cssgen_engine::extractor::WhitespaceTokenExtractor;
use cssgen_engine::generator::GenerateOptions;
use cssgen_engine::Generator;

/// Thin one-shot batch driver: resolve a config, walk a directory, extract
/// tokens from every file, generate a stylesheet, print it.
#[derive(Parser)]
#[command(name = "cssgen", version, about = "On-demand atomic-CSS batch generator")]
struct Cli {
    /// Path to a TOML config file (static rules, shortcuts, blocklist, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to walk for source files
    #[arg(long, default_value = ".")]
    input: PathBuf,

    /// Write the generated CSS here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Prefix every selector with this scope
    #[arg(long)]
    scope: Option<String>,

    /// Omit preflight CSS
    #[arg(long)]
    no_preflights: bool,

    /// Omit the configured safelist
    #[arg(long)]
    no_safelist: bool,

    /// Minify the output (no layer comments, no joining newlines)
    #[arg(long)]
    minify: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ResolvedConfigData> {
    let Some(path) = path else {
        return Ok(ResolvedConfigData::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let data = load_config(cli.config.as_ref())?;
    let config = UserConfig::new()
        .with_data(data)
        .with_extractor(Arc::new(WhitespaceTokenExtractor::new()))
        .resolve()
        .context("resolving config")?;
    let generator = Generator::new(config);

    let mut tokens = HashSet::new();
    for entry in walkdir::WalkDir::new(&cli.input)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Ok(code) = std::fs::read_to_string(path) else {
            continue;
        };
        generator
            .apply_extractors(&code, path.to_str(), &mut tokens)
            .await;
    }
    tracing::debug!(count = tokens.len(), "tokens extracted");

    let opts = GenerateOptions {
        scope: cli.scope.clone(),
        preflights: !cli.no_preflights,
        safelist: !cli.no_safelist,
        minify: cli.minify,
        ..GenerateOptions::default()
    };
    let result = generator
        .generate_from_tokens(tokens, &opts)
        .await
        .context("generating stylesheet")?;
    Ok(result.css)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let output = cli.output.clone();
    let css = run(cli).await?;

    match output {
        Some(path) => std::fs::write(&path, css)
            .with_context(|| format!("writing output file {}", path.display()))?,
        None => println!("{css}"),
    }
    Ok(())
}
