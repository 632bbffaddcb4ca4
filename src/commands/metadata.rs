use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::cli::{parse_metadata_tokens, validate_metadata_args, MetadataArgs, MetadataMode};
use crate::cli::METADATA_USAGE;
use crate::client::{ArchiveClient, Item, MetadataEdit};
use crate::error::{IafsError, Result};

/// Priority used for spreadsheet edits when none is given.
pub const SPREADSHEET_PRIORITY: i64 = -5;

/// Run `iafs metadata` and return the process exit code.
///
/// Validation happens before any call to the archive. Identifiers, then
/// spreadsheet rows, are processed one at a time; a failure is reported on
/// `err` and processing continues. The exit code is 0 only if nothing failed.
pub fn run_metadata<C, O, E>(client: &C, args: &MetadataArgs, out: &mut O, err: &mut E) -> Result<i32>
where
    C: ArchiveClient,
    O: Write,
    E: Write,
{
    if let Err(e) = validate_metadata_args(args) {
        writeln!(err, "{}\n{}", e, METADATA_USAGE)?;
        return Ok(1);
    }

    let mode = args.mode();
    let fields = parse_metadata_tokens(args.edit_tokens())?;
    let mut all_ok = true;
    let mut formats: BTreeSet<String> = BTreeSet::new();

    for identifier in &args.identifiers {
        let item = match client.get_item(identifier) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", identifier, e);
                writeln!(err, "{} - error: {}", identifier, e)?;
                all_ok = false;
                continue;
            }
        };

        match mode {
            MetadataMode::Exists => {
                if item.exists() {
                    writeln!(out, "{} exists", identifier)?;
                } else {
                    writeln!(err, "{} does not exist", identifier)?;
                    all_ok = false;
                }
            }
            MetadataMode::Modify | MetadataMode::Append => {
                let edit = MetadataEdit {
                    fields: fields.clone(),
                    target: args.target.clone(),
                    append: mode == MetadataMode::Append,
                    priority: args.priority,
                };
                all_ok &= submit_edit(client, &item, &edit, out, err)?;
            }
            MetadataMode::Formats => {
                formats.extend(item.formats().map(str::to_string));
            }
            MetadataMode::Dump => {
                writeln!(out, "{}", serde_json::to_string(&item.raw)?)?;
            }
        }
    }

    if mode == MetadataMode::Formats && !args.identifiers.is_empty() {
        let joined = formats.into_iter().collect::<Vec<_>>().join("\n");
        writeln!(out, "{}", joined)?;
    }

    if let Some(path) = &args.spreadsheet {
        all_ok &= run_spreadsheet(client, args, path, out, err)?;
    }

    Ok(if all_ok { 0 } else { 1 })
}

/// Send one edit and report the outcome. Returns whether the service answered 200.
fn submit_edit<C, O, E>(
    client: &C,
    item: &Item,
    edit: &MetadataEdit,
    out: &mut O,
    err: &mut E,
) -> Result<bool>
where
    C: ArchiveClient,
    O: Write,
    E: Write,
{
    let response = match client.modify_metadata(item, edit) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Metadata write for {} failed: {}", item.identifier, e);
            writeln!(err, "{} - error: {}", item.identifier, e)?;
            return Ok(false);
        }
    };

    if response.is_ok() && response.body.success {
        writeln!(out, "{} - success: {}", item.identifier, response.log())?;
    } else {
        writeln!(
            err,
            "{} - error ({}): {}",
            item.identifier,
            response.status,
            response.error()
        )?;
    }

    Ok(response.is_ok())
}

/// One spreadsheet row turned into an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetRow {
    pub identifier: String,
    pub fields: Map<String, Value>,
}

/// Build the edit for a CSV row, or `None` when the row has no identifier.
///
/// The `identifier` and `file` columns are not metadata; every other non-empty
/// column becomes a field with a lower-cased key.
pub fn row_to_edit(headers: &csv::StringRecord, record: &csv::StringRecord) -> Option<SpreadsheetRow> {
    let identifier = headers
        .iter()
        .zip(record.iter())
        .find(|(key, _)| *key == "identifier")
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())?;

    let fields = headers
        .iter()
        .zip(record.iter())
        .filter(|(key, value)| *key != "identifier" && *key != "file" && !value.is_empty())
        .map(|(key, value)| (key.to_lowercase(), Value::String(value.to_string())))
        .collect();

    Some(SpreadsheetRow {
        identifier: identifier.to_string(),
        fields,
    })
}

fn run_spreadsheet<C, O, E>(
    client: &C,
    args: &MetadataArgs,
    path: &Path,
    out: &mut O,
    err: &mut E,
) -> Result<bool>
where
    C: ArchiveClient,
    O: Write,
    E: Write,
{
    // Row lengths may differ from the header; a short row that lacks the
    // identifier cell is skipped like any other row without one.
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| IafsError::Csv(format!("Failed to open {}: {}", path.display(), e)))?;
    let headers = reader.headers()?.clone();
    let priority = args.priority.unwrap_or(SPREADSHEET_PRIORITY);
    let mut all_ok = true;

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                writeln!(err, "{}: row {} - error: {}", path.display(), line + 1, e)?;
                all_ok = false;
                continue;
            }
        };

        let Some(row) = row_to_edit(&headers, &record) else {
            tracing::debug!("Skipping spreadsheet row {} without identifier", line + 1);
            continue;
        };

        let item = match client.get_item(&row.identifier) {
            Ok(item) => item,
            Err(e) => {
                writeln!(err, "{} - error: {}", row.identifier, e)?;
                all_ok = false;
                continue;
            }
        };

        let edit = MetadataEdit {
            fields: row.fields,
            target: args.target.clone(),
            append: !args.append.is_empty(),
            priority: Some(priority),
        };
        all_ok &= submit_edit(client, &item, &edit, out, err)?;
    }

    Ok(all_ok)
}
