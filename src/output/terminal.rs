//! Coloured terminal rendering of a debate.

use std::fmt::Display;
use std::sync::Arc;

use console::Style;
use tracing::warn;

use super::writer::OutputWriter;
use crate::debate::{DebateObserver, Phase, Turn, Verdict};

/// Colour scheme for terminal output.
///
/// [`Palette::detect`] colours only when stdout is a terminal that supports
/// it; [`Palette::forced`] pins styling on or off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette {
    forced: Option<bool>,
}

impl Palette {
    /// Colours when stdout supports it.
    pub fn detect() -> Self {
        Self::default()
    }

    /// Always (or never) emits colour codes.
    pub fn forced(enabled: bool) -> Self {
        Self {
            forced: Some(enabled),
        }
    }

    fn paint(&self, style: Style, text: impl Display) -> String {
        let style = match self.forced {
            Some(enabled) => style.force_styling(enabled),
            None => style,
        };
        style.apply_to(text).to_string()
    }

    /// `[Round N] Name: content`, with the round in yellow and the name in bold.
    pub fn turn(&self, turn: &Turn) -> String {
        format!(
            "{} {}: {}",
            self.paint(Style::new().yellow(), format_args!("[Round {}]", turn.round)),
            self.paint(Style::new().bold(), &turn.participant.name),
            turn.content
        )
    }

    /// Phase banner: cyan for free debate, red for the contrarian phase.
    pub fn phase(&self, phase: Phase) -> String {
        let style = match phase {
            Phase::FreeDebate => Style::new().cyan(),
            Phase::ContrarianPhase => Style::new().red(),
        };
        format!(
            "\n{}\n",
            self.paint(style.bold(), format_args!("=== Phase: {phase} ==="))
        )
    }

    /// Multi-line verdict summary.
    pub fn verdict(&self, verdict: &Verdict) -> String {
        let (detected, style) = if verdict.converged {
            ("Yes", Style::new().green())
        } else {
            ("No", Style::new().red())
        };
        let mut lines = vec![
            format!("Consensus Detected: {}", self.paint(style.bold(), detected)),
            format!("Position: {}", verdict.position),
            format!(
                "Agreement Score: {}",
                self.paint(Style::new().yellow(), format_args!("{}/10", verdict.strength))
            ),
        ];
        if !verdict.dissenters.is_empty() {
            lines.push(format!("Dissenters: {}", verdict.dissenters.join(", ")));
        }
        lines.join("\n")
    }
}

/// Formats a turn for stdout.
pub fn format_turn(turn: &Turn) -> String {
    Palette::detect().turn(turn)
}

/// Formats a phase banner for stdout.
pub fn format_phase(phase: Phase) -> String {
    Palette::detect().phase(phase)
}

/// Formats a verdict summary for stdout.
pub fn format_verdict(verdict: &Verdict) -> String {
    Palette::detect().verdict(verdict)
}

/// Prints turns and phase banners to stdout and mirrors them into the
/// run's log file.
#[derive(Debug, Clone, Default)]
pub struct TerminalObserver {
    palette: Palette,
    writer: Option<Arc<OutputWriter>>,
}

impl TerminalObserver {
    /// Creates an observer that only prints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also appends every event to `writer`'s log.
    pub fn with_writer(mut self, writer: Arc<OutputWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    fn log(&self, line: &str) {
        if let Some(writer) = &self.writer {
            if let Err(e) = writer.log(line) {
                warn!(error = %e, "Failed to append to debate log");
            }
        }
    }
}

impl DebateObserver for TerminalObserver {
    fn on_turn(&self, turn: &Turn) {
        println!("{}", self.palette.turn(turn));
        self.log(&format!(
            "[Round {}] {} ({}): {}",
            turn.round, turn.participant.name, turn.participant.model, turn.content
        ));
    }

    fn on_phase(&self, phase: Phase) {
        println!("{}", self.palette.phase(phase));
        self.log(&format!("Phase started: {phase}"));
    }
}
