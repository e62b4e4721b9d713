//! Colored terminal output for command results.
//!
//! Log records go through `log`/`env_logger`; this is for the short summary a
//! user reads at the end of a command.

use colored::Colorize;
use std::io::{self, Write};

/// Writes status lines to stdout and warnings/errors to stderr.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Only shown with `--verbose`.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose && !self.quiet {
            writeln!(io::stdout(), "{}", message.dimmed())?;
        }
        Ok(())
    }

    pub fn progress(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout(), "{} {}", "→".cyan(), message)?;
        }
        Ok(())
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout(), "{} {}", "✓".green(), message)?;
        }
        Ok(())
    }

    pub fn warn(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stderr(), "{} {}", "⚠".yellow(), message.yellow())?;
        }
        Ok(())
    }

    pub fn error(&self, message: &str) -> io::Result<()> {
        writeln!(io::stderr(), "{} {}", "✗".red(), message.red())
    }

    pub fn section(&self, title: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout())?;
            writeln!(io::stdout(), "{}", title.bold())?;
            writeln!(io::stdout(), "{}", "─".repeat(title.chars().count()).dimmed())?;
        }
        Ok(())
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout(), "  {}", message)?;
        }
        Ok(())
    }
}
