use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lqa_lens::config::{Config, API_KEY_ENV};
use lqa_lens::glossary::{self, GlossaryEntry};
use lqa_lens::llm::OpenRouterBackend;
use lqa_lens::pipeline::{run_batch, Pipeline};
use lqa_lens::report::AnalysisRequest;
use lqa_lens::{logging, scene, skills};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "lqa",
    about = "Localization QA reports for UI screenshot pairs",
    version
)]
struct Args {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one source/target screenshot pair
    Analyze {
        /// Source-language screenshot (path, http(s) URL, or data URL)
        #[arg(long)]
        source: String,

        /// Localized screenshot (path, http(s) URL, or data URL)
        #[arg(long)]
        target: String,

        /// Target language tag, e.g. de-DE
        #[arg(long)]
        lang: String,

        /// Language the report is written in
        #[arg(long, default_value = "en")]
        report_lang: String,

        /// Glossary file: tagged text, or a JSON array of {source, target, note}
        #[arg(long)]
        glossary: Option<PathBuf>,

        /// Free-text description of the screen
        #[arg(long, default_value = "")]
        scene: String,

        /// Screenshot id stamped on the report
        #[arg(long)]
        id: Option<String>,

        /// Skip the verifier pass
        #[arg(long)]
        no_verify: bool,

        /// Give up on the whole analysis after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Analyze every pair listed in a JSON manifest
    Batch {
        manifest: PathBuf,

        /// Pipelines in flight (defaults to config max_concurrency)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show the scene and heuristics that would be injected (offline)
    Skills {
        #[arg(long, default_value = "")]
        scene: String,

        #[arg(long)]
        lang: String,
    },

    /// Store the OpenRouter API key in the system keychain
    Setup,
}

/// Manifest entry: a request plus an optional uncompiled glossary
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    #[serde(flatten)]
    request: AnalysisRequest,
    #[serde(default)]
    glossary_terms: Vec<GlossaryEntry>,
}

impl ManifestEntry {
    fn into_request(self) -> AnalysisRequest {
        let mut request = self.request;
        if request.glossary_text.is_none() && !self.glossary_terms.is_empty() {
            request.glossary_text = Some(glossary::compile(&self.glossary_terms));
        }
        request
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutput {
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<lqa_lens::Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_json);

    match args.command {
        Command::Analyze {
            source,
            target,
            lang,
            report_lang,
            glossary,
            scene,
            id,
            no_verify,
            timeout_secs,
        } => {
            let mut request = AnalysisRequest::new(source, target, lang)
                .with_report_language(report_lang)
                .with_scene_hint(scene);
            if let Some(id) = id {
                request = request.with_request_id(id);
            }
            if let Some(path) = glossary {
                request = request.with_glossary(read_glossary(&path)?);
            }

            let mut config = Config::load();
            if no_verify {
                config.verify = false;
            }
            let pipeline = Pipeline::new(OpenRouterBackend::from_config(&config)?, config);

            let report = match timeout_secs {
                Some(secs) => {
                    pipeline
                        .run_with_timeout(&request, Duration::from_secs(secs))
                        .await?
                }
                None => pipeline.run(&request).await?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Batch {
            manifest,
            concurrency,
            timeout_secs,
        } => {
            let content = std::fs::read_to_string(&manifest)
                .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
            let entries: Vec<ManifestEntry> = serde_json::from_str(&content)
                .with_context(|| format!("invalid manifest {}", manifest.display()))?;
            let requests: Vec<AnalysisRequest> =
                entries.into_iter().map(ManifestEntry::into_request).collect();

            let config = Config::load();
            let pipeline = Pipeline::new(OpenRouterBackend::from_config(&config)?, config);
            let concurrency = concurrency.unwrap_or(pipeline.config().max_concurrency);

            let items = run_batch(
                &pipeline,
                &requests,
                concurrency,
                timeout_secs.map(Duration::from_secs),
            )
            .await;

            let failed = items.iter().filter(|i| i.result.is_err()).count();
            let output: Vec<BatchOutput> = items
                .into_iter()
                .map(|item| match item.result {
                    Ok(report) => BatchOutput {
                        request_id: item.request_id,
                        report: Some(report),
                        error: None,
                    },
                    Err(err) => BatchOutput {
                        request_id: item.request_id,
                        report: None,
                        error: Some(err.to_string()),
                    },
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
            if failed > 0 {
                eprintln!("  {} of {} requests failed", failed, output.len());
            }
        }

        Command::Skills { scene, lang } => {
            let scene_type = scene::classify(&scene);
            let set = skills::retrieve(&scene, &lang);
            println!("Scene: {}", scene_type);
            println!();
            print!("{}", skills::format(&set, skills::DEFAULT_MAX_SCENE_SKILLS));
        }

        Command::Setup => run_setup()?,
    }

    Ok(())
}

/// Glossary files are either tagged text or a JSON list of entries to compile.
fn read_glossary(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read glossary {}", path.display()))?;
    if content.trim_start().starts_with('[') {
        if let Ok(entries) = serde_json::from_str::<Vec<GlossaryEntry>>(&content) {
            return Ok(glossary::compile(&entries));
        }
    }
    Ok(content)
}

fn run_setup() -> Result<()> {
    eprintln!();
    eprintln!("  Get an API key at https://openrouter.ai/keys");
    eprint!("  Paste your OpenRouter API key: ");
    io::stderr().flush()?;

    let mut key = String::new();
    io::stdin().lock().read_line(&mut key)?;
    let key = key.trim();

    if key.is_empty() {
        anyhow::bail!("no key entered");
    }
    if !Config::validate_api_key_format(key) {
        eprintln!("  Warning: key doesn't look like an OpenRouter key (expected sk-...)");
    }

    Config::set_api_key(key)?;
    Config::load().save()?;
    eprintln!("  Saved to system keychain. {} still takes precedence when set.", API_KEY_ENV);
    eprintln!("  Config: {}", Config::config_location());
    Ok(())
}
