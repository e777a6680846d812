//! `inc status`: move an incident along its lifecycle.

use crate::cmd::{fail_code, fail_store, not_found, open_project};
use crate::output::{OutputMode, render_item};
use clap::Args;
use incidents_core::error::ErrorCode;
use incidents_core::model::incident::{ParseEnumError, Status};
use std::path::Path;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Incident ID.
    pub id: String,

    /// Target status: OPEN, INVESTIGATING, RESOLVED, or ARCHIVED.
    #[arg(value_name = "STATUS")]
    pub status: String,
}

pub fn run_status(args: &StatusArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let requested: Status = args
        .status
        .parse()
        .map_err(|e: ParseEnumError| fail_code(output, ErrorCode::ValidationFailed, e.to_string()))?;

    let mut project = open_project(data_dir, output)?;
    let updated = project
        .store
        .change_status(&args.id, requested)
        .map_err(|e| fail_store(output, &e))?
        .ok_or_else(|| not_found(output, &args.id))?;

    render_item(&updated, output)?;
    Ok(())
}
