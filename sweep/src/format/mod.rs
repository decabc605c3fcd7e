use humansize::{BINARY, format_size as format_size_human};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Color behavior selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<&str> for ColorChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

/// Trait for run report output that can be TTY-aware or plain text.
///
/// Each method prints one report line with a fixed status glyph after
/// `indent` spaces. The glyph vocabulary is stable so the report can be
/// grepped: `✓` kept or succeeded, `⊘` deliberately skipped, `!` tag
/// passed over, `×` deleted or failed, `⚠` warning.
pub trait Reporter: Send + Sync {
    /// Print a line without a status glyph
    fn info(&self, message: &str);

    /// Print a keep or success line
    fn keep(&self, indent: usize, message: &str);

    /// Print a deliberate-skip line
    fn skip(&self, indent: usize, message: &str);

    /// Print a passed-over-tag notice
    fn note(&self, indent: usize, message: &str);

    /// Print a deletion or failure line
    fn delete(&self, indent: usize, message: &str);

    /// Print a warning line
    fn warn(&self, indent: usize, message: &str);

    /// Print an error message to stderr
    fn error(&self, message: &str);
}

/// TTY-aware reporter with colored glyphs
pub struct TtyReporter;

impl Reporter for TtyReporter {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn keep(&self, indent: usize, message: &str) {
        println!("{}{} {}", " ".repeat(indent), "✓".green().bold(), message);
    }

    fn skip(&self, indent: usize, message: &str) {
        println!("{}{} {}", " ".repeat(indent), "⊘".blue().bold(), message);
    }

    fn note(&self, indent: usize, message: &str) {
        println!("{}{} {}", " ".repeat(indent), "!".yellow().bold(), message);
    }

    fn delete(&self, indent: usize, message: &str) {
        println!("{}{} {}", " ".repeat(indent), "×".red().bold(), message);
    }

    fn warn(&self, indent: usize, message: &str) {
        println!("{}{} {}", " ".repeat(indent), "⚠".yellow().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }
}

/// Plain text reporter for non-TTY output (piped, scripted)
pub struct PlainReporter;

impl Reporter for PlainReporter {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn keep(&self, indent: usize, message: &str) {
        println!("{}✓ {}", " ".repeat(indent), message);
    }

    fn skip(&self, indent: usize, message: &str) {
        println!("{}⊘ {}", " ".repeat(indent), message);
    }

    fn note(&self, indent: usize, message: &str) {
        println!("{}! {}", " ".repeat(indent), message);
    }

    fn delete(&self, indent: usize, message: &str) {
        println!("{}× {}", " ".repeat(indent), message);
    }

    fn warn(&self, indent: usize, message: &str) {
        println!("{}⚠ {}", " ".repeat(indent), message);
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }
}

/// Create the appropriate reporter for the color choice
pub fn create_reporter(choice: ColorChoice) -> Box<dyn Reporter> {
    match choice {
        ColorChoice::Always => Box::new(TtyReporter),
        ColorChoice::Never => Box::new(PlainReporter),
        ColorChoice::Auto => {
            // Check if NO_COLOR is set
            if std::env::var("NO_COLOR").is_ok() {
                return Box::new(PlainReporter);
            }

            // Check if stdout OR stderr is a terminal (since we output to both)
            if std::io::stdout().is_terminal() || std::io::stderr().is_terminal() {
                Box::new(TtyReporter)
            } else {
                Box::new(PlainReporter)
            }
        }
    }
}

/// Formats a byte size into a human-readable string using binary units (KiB, MiB).
pub fn format_size(size_bytes: u64) -> String {
    format_size_human(size_bytes, BINARY)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
