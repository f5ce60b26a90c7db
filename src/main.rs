mod batch;
mod error;
mod fetch;
mod parser;
mod settings;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use error::TranscriptError;
use fetch::{FetchedPage, PageFetcher};
use parser::render::SpeakerLine;
use parser::turn::Turn;
use parser::Formatter;
use settings::Settings;

#[derive(Parser)]
#[command(name = "turn_labeler", about = "Label the speakers of a two-party conversation transcript")]
struct Cli {
    /// Settings file (default: ./labeler.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print a JSON report instead of the plain transcript
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label pasted conversation text (file or stdin)
    Format {
        /// Input file, `-` or absent for stdin
        file: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract a conversation from a saved page (.json or .html)
    Extract {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch a shared conversation page and extract it
    Fetch {
        url: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Label many text files in parallel, writing <stem>.labeled.txt next to each
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Write results here instead of next to the inputs
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessReport<'a> {
    success: bool,
    conversation: Vec<SpeakerLine>,
    message_count: usize,
    formatted: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureReport {
    success: bool,
    error: String,
    suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_length: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let formatter = Formatter::from_settings(&settings)?;

    let result = match cli.command {
        Commands::Format { file, output } => {
            let text = read_input(file.as_deref())?;
            let turns = formatter.segment_text(&text);
            emit(&formatter, turns, None, cli.json, output.as_deref())
        }
        Commands::Extract { file, output } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let turns = if looks_like_json(&file, &raw) {
                match serde_json::from_str(&raw) {
                    Ok(doc) => formatter.document_turns(&doc),
                    Err(e) => {
                        tracing::warn!(
                            "{} is not valid JSON ({}), reading it as markup",
                            file.display(),
                            e
                        );
                        formatter.markup_turns(&raw)
                    }
                }
            } else {
                formatter.markup_turns(&raw)
            };
            emit(&formatter, turns, Some(raw.len()), cli.json, output.as_deref())
        }
        Commands::Fetch { url, output } => {
            let fetcher = PageFetcher::new(&settings)?;
            match fetcher.fetch(&url).await {
                Ok(FetchedPage::Document(doc)) => {
                    let turns = formatter.document_turns(&doc);
                    emit(&formatter, turns, None, cli.json, output.as_deref())
                }
                Ok(FetchedPage::Markup(html)) => {
                    let turns = formatter.markup_turns(&html);
                    emit(&formatter, turns, Some(html.len()), cli.json, output.as_deref())
                }
                Err(e) => {
                    report_failure(cli.json, e.to_string(), Some(e.suggestion()), None)?;
                    Err(e.into())
                }
            }
        }
        Commands::Batch { files, out_dir } => {
            let counts = batch::run(&formatter, &files, out_dir.as_deref())?;
            counts.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn looks_like_json(path: &Path, raw: &str) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        || raw.trim_start().starts_with(['{', '['])
}

/// Print (or write) the transcript, or report why there is none.
fn emit(
    formatter: &Formatter,
    turns: Result<Vec<Turn>, TranscriptError>,
    raw_length: Option<usize>,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let turns = match turns {
        Ok(turns) => turns,
        Err(e) => {
            report_failure(json, e.to_string(), e.suggestion(), raw_length)?;
            return Err(e.into());
        }
    };

    let formatted = formatter.render(&turns);
    if formatted.is_empty() {
        tracing::warn!("Every turn was empty, nothing to print");
    }

    let body = if json {
        let conversation = formatter.speaker_lines(&turns);
        let report = SuccessReport {
            success: true,
            message_count: conversation.len(),
            conversation,
            formatted: &formatted,
        };
        serde_json::to_string_pretty(&report)?
    } else {
        formatted
    };

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", body))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", body),
    }
    Ok(())
}

fn report_failure(
    json: bool,
    error: String,
    suggestion: Option<&str>,
    raw_length: Option<usize>,
) -> Result<()> {
    if json {
        let report = FailureReport {
            success: false,
            error,
            suggestion: suggestion.map(str::to_string),
            raw_length,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(hint) = suggestion {
        eprintln!("{}", hint);
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_detection() {
        assert!(looks_like_json(Path::new("page.JSON"), "<html>"));
        assert!(looks_like_json(Path::new("page.txt"), "  {\"a\": 1}"));
        assert!(!looks_like_json(Path::new("page.html"), "<!doctype html>"));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn saved_json_page() {
        let path = Path::new("tests/fixtures/conversation.json");
        let raw = std::fs::read_to_string(path).unwrap();
        assert!(looks_like_json(path, &raw));
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let out = Formatter::new(Default::default()).format_document(&doc).unwrap();
        assert_eq!(out, "User: hi\n\nAssistant: hello");
    }

    #[test]
    fn labeled_fixture_end_to_end() {
        let text = std::fs::read_to_string("tests/fixtures/labeled.txt").unwrap();
        let formatter = Formatter::new(parser::turn::RoleNames::new("Darko", "Claude").unwrap());
        let out = formatter.format_text(&text).unwrap();
        let labels: Vec<&str> = out
            .split("\n\n")
            .filter_map(|block| block.split(':').next())
            .collect();
        assert_eq!(labels, vec!["Darko", "Claude", "Darko", "Claude"]);
    }
}
