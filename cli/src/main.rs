//! csds CLI: query xDS client status and print it.
//!
//! Builds the node matcher request from `--request_file` and `--request_yaml`,
//! fetches the client status, prints the summary table, and exports the
//! detailed config when any client reports one.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use csds::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "csds", version, about = "Query and render xDS client status")]
struct Args {
    /// YAML or JSON file holding `node_matchers`.
    #[arg(long = "request_file", env = "CSDS_REQUEST_FILE")]
    request_file: Option<PathBuf>,

    /// Inline `node_matchers` as JSON or YAML; merged over the request file.
    #[arg(long = "request_yaml", env = "CSDS_REQUEST_YAML")]
    request_yaml: Option<String>,

    /// Where to save the detailed config; empty prints it to stdout.
    #[arg(long = "file_to_save_config", env = "CSDS_FILE_TO_SAVE_CONFIG", default_value = "")]
    file_to_save_config: String,

    /// Recorded `ClientStatusResponse` JSON to answer the query from.
    #[arg(long = "response_file", env = "CSDS_RESPONSE_FILE")]
    response_file: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let stdout = io::stdout();
    if let Err(e) = run(&args, &mut stdout.lock()) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Orchestration
// ═══════════════════════════════════════════════════════════════════════════════

fn run(args: &Args, out: &mut impl Write) -> csds::Result<()> {
    let matchers = build_request(args.request_file.as_deref(), args.request_yaml.as_deref())?;
    if matchers.is_empty() {
        return Err(Error::MissingNodeMatchers);
    }
    if let Some(project) = csds::metadata_value(matchers.matchers(), csds::GCP_PROJECT_NUMBER_KEY) {
        info!(project, "querying Traffic Director project");
    }

    let mut client = ReplayClient::from_file(&args.response_file)?;
    let response = client.fetch(&ClientStatusRequest::new(matchers))?;
    debug!(clients = response.config.len(), "received client status");

    let summary = summarize(&response);
    render(&summary, out).map_err(Error::Output)?;

    if summary.has_xds_config() {
        export(&response, &Destination::from_flag(&args.file_to_save_config), out)?;
    }
    out.flush().map_err(Error::Output)
}
