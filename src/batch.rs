use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::warn;

use crate::parser::Formatter;

pub struct BatchCounts {
    total: usize,
    ok: usize,
    empty: usize,
    errors: usize,
}

impl BatchCounts {
    pub fn print(&self) {
        println!(
            "Formatted {} files ({} ok, {} empty, {} errors).",
            self.total, self.ok, self.empty, self.errors
        );
    }
}

enum Outcome {
    Written,
    Empty,
    Failed,
}

/// Label every file in parallel. Per-file failures are logged and counted, never fatal.
pub fn run(
    formatter: &Formatter,
    files: &[PathBuf],
    out_dir: Option<&Path>,
) -> Result<BatchCounts> {
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let outcomes: Vec<Outcome> = files
        .par_iter()
        .map(|file| {
            let outcome = label_file(formatter, file, out_dir);
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_and_clear();

    let mut counts = BatchCounts {
        total: files.len(),
        ok: 0,
        empty: 0,
        errors: 0,
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Written => counts.ok += 1,
            Outcome::Empty => counts.empty += 1,
            Outcome::Failed => counts.errors += 1,
        }
    }
    Ok(counts)
}

fn label_file(formatter: &Formatter, file: &Path, out_dir: Option<&Path>) -> Outcome {
    let text = match std::fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => {
            warn!("Failed to read {}: {}", file.display(), e);
            return Outcome::Failed;
        }
    };

    let formatted = match formatter.format_text(&text) {
        Ok(f) if f.is_empty() => return Outcome::Empty,
        Ok(f) => f,
        Err(e) => {
            warn!("{}: {}", file.display(), e);
            return Outcome::Failed;
        }
    };

    let target = output_path(file, out_dir);
    match std::fs::write(&target, format!("{}\n", formatted)) {
        Ok(()) => Outcome::Written,
        Err(e) => {
            warn!("Failed to write {}: {}", target.display(), e);
            Outcome::Failed
        }
    }
}

pub fn output_path(file: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string());
    let name = format!("{}.labeled.txt", stem);
    match out_dir {
        Some(dir) => dir.join(name),
        None => file.with_file_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths() {
        assert_eq!(
            output_path(Path::new("chats/monday.txt"), None),
            PathBuf::from("chats/monday.labeled.txt")
        );
        assert_eq!(
            output_path(Path::new("chats/monday.txt"), Some(Path::new("out"))),
            PathBuf::from("out/monday.labeled.txt")
        );
    }

    #[test]
    fn labels_fixture_into_out_dir() {
        let out = std::env::temp_dir().join("turn_labeler_batch_test");
        let files = vec![PathBuf::from("tests/fixtures/unlabeled.txt")];
        let counts = run(&Formatter::new(Default::default()), &files, Some(out.as_path())).unwrap();
        assert_eq!(counts.ok, 1);
        let written = std::fs::read_to_string(out.join("unlabeled.labeled.txt")).unwrap();
        assert!(written.starts_with("User: "));
    }
}
