//! Output handling for CLI
//!
//! - JSON results go to stdout, one object, pretty printed
//! - Consistency reports are plain text, stderr unless a writer is given
//! - UTF-8 only

use std::io::{self, Write};

use serde::Serialize;

use crate::analysis::ConsistencyAnalyzer;

use super::errors::CliResult;

/// Write a JSON value to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write the findings report, with an optional closing line
pub fn write_report_to<W: Write>(
    analyzer: &ConsistencyAnalyzer,
    trailer: Option<&str>,
    out: &mut W,
) -> CliResult<()> {
    analyzer.report(out)?;
    if let Some(line) = trailer {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    Ok(())
}
