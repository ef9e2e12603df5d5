//! Site list loading
//!
//! The list is a CSV file in the ranking-export shape (`rank,domain`). The
//! first row is always skipped, then up to `max_rows` rows are read and the
//! second column of each is taken as a site identifier. Blank lines are rows
//! too: they hold no identifier but count toward the cap.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};

/// Read up to `max_rows` site identifiers from the second column of a CSV file
///
/// Rows with fewer than two columns, blank lines included, are skipped but
/// still count toward `max_rows`. Values are trimmed and otherwise returned
/// as-is, duplicates included. A file that cannot be opened is an error; a
/// read error part way through is logged and the identifiers read so far are
/// returned.
#[instrument]
pub fn read_sites(path: &Path, max_rows: usize) -> Result<Vec<String>> {
    let contents = std::fs::read(path).map_err(|e| Error::SiteList {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let marked = mark_blank_rows(&contents);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(marked.as_slice());

    let mut sites = Vec::new();
    for (row, record) in reader.records().skip(1).take(max_rows).enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row + 1, error = %e, "Stopped reading site list");
                break;
            }
        };
        if let Some(site) = record.get(1) {
            sites.push(site.trim().to_string());
        }
    }

    info!("Loaded {} sites from '{}'", sites.len(), path.display());
    Ok(sites)
}

// The reader drops empty lines, so each blank line outside a quoted field is
// rewritten as a single empty field.
fn mark_blank_rows(contents: &[u8]) -> Vec<u8> {
    let mut marked = Vec::with_capacity(contents.len());
    let mut in_quotes = false;
    for line in contents.split_inclusive(|&b| b == b'\n') {
        let body = line.strip_suffix(b"\n").unwrap_or(line);
        let body = body.strip_suffix(b"\r").unwrap_or(body);
        if body.is_empty() && !in_quotes {
            marked.extend_from_slice(b"\"\"");
        }
        if body.iter().filter(|&&b| b == b'"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
        marked.extend_from_slice(line);
    }
    marked
}
