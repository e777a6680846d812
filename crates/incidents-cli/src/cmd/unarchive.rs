//! `inc unarchive`: return an ARCHIVED incident to OPEN.

use crate::cmd::{fail_store, not_found, open_project};
use crate::output::{OutputMode, render_item};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct UnarchiveArgs {
    /// Incident ID.
    pub id: String,
}

pub fn run_unarchive(
    args: &UnarchiveArgs,
    output: OutputMode,
    data_dir: &Path,
) -> anyhow::Result<()> {
    let mut project = open_project(data_dir, output)?;
    let reopened = project
        .store
        .unarchive(&args.id)
        .map_err(|e| fail_store(output, &e))?
        .ok_or_else(|| not_found(output, &args.id))?;

    render_item(&reopened, output)?;
    Ok(())
}
