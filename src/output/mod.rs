//! Terminal rendering and on-disk artifacts of a debate run.

pub mod terminal;
pub mod writer;

pub use terminal::{format_phase, format_turn, format_verdict, Palette, TerminalObserver};
pub use writer::{create_output_dir, generate_slug, render_report, OutputWriter};
