//! Fixed-width summary table of a status response.
//!
//! ```text
//! Client ID                                          xDS stream type                Config Status
//! test_nodeid                                        test_stream_type1              RDS   STALE
//!                                                                                   CDS   STALE
//! ```
//!
//! Columns are 50/30/30 characters, left-justified, and every field is
//! followed by one space, so each line ends with a trailing space.

use crate::ClientStatusResponse;
use std::io::{self, Write};

/// Printed instead of the table when the response has no clients.
pub const NO_CLIENTS: &str = "No xDS clients connected.";

/// Status column for a client that reports no per-xDS entries.
pub const NOT_AVAILABLE: &str = "N/A";

const HEADER: (&str, &str, &str) = ("Client ID", "xDS stream type", "Config Status");

const CLIENT_ID_WIDTH: usize = 50;
const STREAM_TYPE_WIDTH: usize = 30;
const STATUS_WIDTH: usize = 30;

/// One printed line of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    /// Client id, or empty on continuation lines.
    pub client_id: String,
    /// Stream type, or empty when unknown and on continuation lines.
    pub stream_type: String,
    /// Status column. `None` prints the id and stream columns only.
    pub config_status: Option<String>,
}

impl DisplayRow {
    fn new(client_id: &str, stream_type: &str, config_status: Option<String>) -> Self {
        Self {
            client_id: client_id.to_owned(),
            stream_type: stream_type.to_owned(),
            config_status,
        }
    }
}

/// The summarized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// The response listed no clients at all.
    NoClients,
    /// Rows to print under the header.
    Table {
        /// Rows in print order.
        rows: Vec<DisplayRow>,
        /// Whether any client, with or without a node, reported per-xDS
        /// entries. Decides whether the detailed export runs.
        has_xds_config: bool,
    },
}

impl Summary {
    /// Whether the detailed export should run.
    #[must_use]
    pub fn has_xds_config(&self) -> bool {
        matches!(
            self,
            Self::Table {
                has_xds_config: true,
                ..
            }
        )
    }

    /// The table rows; empty for [`Summary::NoClients`].
    #[must_use]
    pub fn rows(&self) -> &[DisplayRow] {
        match self {
            Self::NoClients => &[],
            Self::Table { rows, .. } => rows,
        }
    }
}

/// Summarize a response into table rows.
///
/// Clients without a node print nothing, but their per-xDS entries still
/// count towards [`Summary::has_xds_config`].
#[must_use]
pub fn summarize(response: &ClientStatusResponse) -> Summary {
    if response.config.is_empty() {
        return Summary::NoClients;
    }

    let mut rows = Vec::new();
    for client in &response.config {
        let Some(node) = &client.node else {
            continue;
        };
        let id = node.id.as_str();
        let stream_type = node.stream_type().unwrap_or_default();

        if client.xds_config.is_empty() {
            rows.push(DisplayRow::new(id, stream_type, Some(NOT_AVAILABLE.to_owned())));
            continue;
        }

        let mut statuses = client.xds_config.iter().filter_map(|c| c.status_line());
        rows.push(DisplayRow::new(id, stream_type, statuses.next()));
        rows.extend(statuses.map(|status| DisplayRow::new("", "", Some(status))));
    }

    Summary::Table {
        rows,
        has_xds_config: response.has_xds_config(),
    }
}

/// Print the summary.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn render<W: Write>(summary: &Summary, out: &mut W) -> io::Result<()> {
    let rows = match summary {
        Summary::NoClients => return writeln!(out, "{}", NO_CLIENTS),
        Summary::Table { rows, .. } => rows,
    };

    let (id, stream_type, status) = HEADER;
    write_line(out, id, stream_type, Some(status))?;
    for row in rows {
        write_line(
            out,
            &row.client_id,
            &row.stream_type,
            row.config_status.as_deref(),
        )?;
    }
    Ok(())
}

fn write_line<W: Write>(
    out: &mut W,
    client_id: &str,
    stream_type: &str,
    status: Option<&str>,
) -> io::Result<()> {
    write!(
        out,
        "{:<id_width$} {:<stream_width$} ",
        client_id,
        stream_type,
        id_width = CLIENT_ID_WIDTH,
        stream_width = STREAM_TYPE_WIDTH,
    )?;
    if let Some(status) = status {
        write!(out, "{:<width$} ", status, width = STATUS_WIDTH)?;
    }
    writeln!(out)
}
