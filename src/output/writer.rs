//! Persists a debate run: incremental log, JSON transcript and markdown report.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::debate::{Phase, Transcript, Verdict};
use crate::error::OutputError;

/// Longest slug produced by [`generate_slug`].
pub const MAX_SLUG_LEN: usize = 50;

/// Slug used when a topic has no usable characters.
const FALLBACK_SLUG: &str = "debate";

pub const LOG_FILENAME: &str = "debate.log";
pub const TRANSCRIPT_FILENAME: &str = "transcript.json";
pub const REPORT_FILENAME: &str = "report.md";

/// Turns a topic into a directory-safe slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a single
/// `-`, strips leading and trailing dashes and caps the length at
/// [`MAX_SLUG_LEN`].
pub fn generate_slug(topic: &str) -> String {
    let mut slug = String::with_capacity(topic.len());
    for c in topic.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Creates `base/slug-YYYYMMDD-HHMMSS` and returns its path.
pub fn create_output_dir(base: impl AsRef<Path>, slug: &str) -> Result<PathBuf, OutputError> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let dir = base.as_ref().join(format!("{slug}-{stamp}"));
    fs::create_dir_all(&dir).map_err(|source| OutputError::CreateDir {
        path: dir.display().to_string(),
        source,
    })?;
    debug!(path = %dir.display(), "Created output directory");
    Ok(dir)
}

/// Writes the artifacts of one run into a single directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Creates a writer for an existing directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Appends a timestamped line to the log file.
    ///
    /// Each call opens, appends and closes the file so the log survives an
    /// aborted run.
    pub fn log(&self, line: &str) -> Result<(), OutputError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(LOG_FILENAME))?;
        writeln!(file, "[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), line)?;
        Ok(())
    }

    /// Writes the transcript as pretty-printed JSON.
    pub fn write_json(&self, transcript: &Transcript) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(TRANSCRIPT_FILENAME);
        let json = serde_json::to_string_pretty(transcript)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Writes the markdown report.
    pub fn write_markdown(
        &self,
        transcript: &Transcript,
        verdict: Option<&Verdict>,
    ) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(REPORT_FILENAME);
        fs::write(&path, render_report(transcript, verdict))?;
        Ok(path)
    }
}

/// Renders the markdown report for a run.
pub fn render_report(transcript: &Transcript, verdict: Option<&Verdict>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Debate: {}\n", transcript.topic);

    out.push_str("## Verdict\n\n");
    match verdict {
        Some(v) => {
            let detected = if v.converged { "Yes" } else { "No" };
            let _ = writeln!(out, "- **Consensus detected:** {detected}");
            if !v.position.is_empty() {
                let _ = writeln!(out, "- **Position:** {}", v.position);
            }
            let _ = writeln!(out, "- **Agreement score:** {}/10", v.strength);
            if !v.dissenters.is_empty() {
                let _ = writeln!(out, "- **Dissenters:** {}", v.dissenters.join(", "));
            }
        }
        None => out.push_str("No consensus checkpoint was reached.\n"),
    }
    let _ = writeln!(out, "- **Rounds:** {}\n", transcript.rounds);

    out.push_str("## Transcript\n");

    let contrarian_from = transcript
        .turns
        .iter()
        .find(|t| t.participant.role.is_contrarian())
        .map(|t| t.round);

    let mut current_phase = None;
    let mut current_round = None;
    for turn in &transcript.turns {
        let phase = match contrarian_from {
            Some(start) if turn.round >= start => Phase::ContrarianPhase,
            _ => Phase::FreeDebate,
        };
        if current_phase != Some(phase) {
            let _ = writeln!(out, "\n### Phase: {phase}");
            current_phase = Some(phase);
        }
        if current_round != Some(turn.round) {
            let _ = writeln!(out, "\n#### Round {}", turn.round);
            current_round = Some(turn.round);
        }
        let _ = writeln!(
            out,
            "\n**{}** ({}):\n\n{}",
            turn.participant.name, turn.participant.model, turn.content
        );
    }

    out
}
