//! Display formatting for CLI output

use console::style;
use reledit_kube::diff::{ChangeType, LineType, ValuesDiff};
use std::io::{self, Write};

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Renderer for the change an edit makes to the persisted values
pub struct ValuesDiffRenderer<W: Write> {
    writer: W,
}

impl ValuesDiffRenderer<io::Stdout> {
    /// Create a new renderer that writes to stdout
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl<W: Write> ValuesDiffRenderer<W> {
    /// Create a renderer that writes to a custom writer
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the renderer, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Render a values diff
    pub fn render(&mut self, diff: &ValuesDiff) -> io::Result<()> {
        writeln!(
            self.writer,
            "{} {}",
            style("Values changes:").bold(),
            diff.summary()
        )?;

        if !diff.has_changes() {
            return Ok(());
        }

        for change in &diff.changes {
            let path = if change.path.is_empty() {
                "(document root)"
            } else {
                change.path.as_str()
            };
            let (icon, path) = match change.change_type {
                ChangeType::Added => (style("+").green(), style(path).green()),
                ChangeType::Modified => (style("~").yellow(), style(path).yellow()),
                ChangeType::Removed => (style("-").red(), style(path).red()),
            };
            writeln!(self.writer, "  {} {}", icon, path)?;
        }

        writeln!(self.writer)?;
        for line in &diff.content.lines {
            match line.line_type {
                LineType::Added => writeln!(self.writer, "{}", style(format!("+{}", line.content)).green())?,
                LineType::Removed => writeln!(self.writer, "{}", style(format!("-{}", line.content)).red())?,
                LineType::Context => writeln!(self.writer, "{}", style(format!(" {}", line.content)).dim())?,
            }
        }

        Ok(())
    }
}

/// Print a values diff to stdout
pub fn display_values_diff(diff: &ValuesDiff) {
    if let Err(e) = ValuesDiffRenderer::stdout().render(diff) {
        tracing::warn!(error = %e, "could not print values diff");
    }
}
