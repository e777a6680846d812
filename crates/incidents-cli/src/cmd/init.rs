//! `inc init`: create the data directory and an empty incident store.
//!
//! Running it again is safe: an existing store is loaded (and quarantined
//! if unreadable), and an existing config is left alone.

use crate::cmd::{fail_code, fail_store, warn_if_recovered};
use crate::output::{OutputMode, render};
use clap::Args;
use incidents_core::config;
use incidents_core::error::ErrorCode;
use incidents_core::store::{IncidentStore, StartupReport};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug, Default)]
pub struct InitArgs {}

#[derive(Debug, Serialize)]
struct InitOutput {
    data_dir: String,
    config_written: bool,
    /// `initialized`, `loaded`, or `recovered`.
    store: &'static str,
    incidents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    quarantined: Option<String>,
}

/// Execute `inc init`. Creates the data directory skeleton:
///
/// ```text
/// .incidents/
///   config.toml      (default config)
///   incidents.json   (empty collection)
///   incidents.lock   (advisory lock file)
/// ```
///
/// # Errors
///
/// Returns an error if the directory, config, or store cannot be written.
pub fn run_init(_args: &InitArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let config_written = config::write_default_config(data_dir)
        .map_err(|e| fail_code(output, ErrorCode::StoreWriteFailed, format!("{e:#}")))?;
    let project_config = config::load_config(data_dir)
        .map_err(|e| fail_code(output, ErrorCode::ConfigParseError, format!("{e:#}")))?;

    let (store, report) = IncidentStore::open_dir(data_dir, &project_config.store)
        .map_err(|e| fail_store(output, &e))?;
    warn_if_recovered(&report, output);

    let (state, quarantined) = match &report {
        StartupReport::Initialized => ("initialized", None),
        StartupReport::Loaded { .. } => ("loaded", None),
        StartupReport::Recovered { quarantined, .. } => (
            "recovered",
            quarantined.as_ref().map(|p| p.display().to_string()),
        ),
    };

    let payload = InitOutput {
        data_dir: data_dir.display().to_string(),
        config_written,
        store: state,
        incidents: store.len(),
        quarantined,
    };

    render(output, &payload, |p, w| match p.store {
        "loaded" => writeln!(
            w,
            "✓ Incident store at {} already initialized ({} incident(s))",
            p.data_dir, p.incidents
        ),
        _ => writeln!(w, "✓ Initialized incident store at {}", p.data_dir),
    })
}
