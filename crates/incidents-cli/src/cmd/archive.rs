//! `inc archive`: hide an OPEN or RESOLVED incident from default views.

use crate::cmd::{fail_store, not_found, open_project};
use crate::output::{OutputMode, render_item};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Incident ID.
    pub id: String,
}

pub fn run_archive(args: &ArchiveArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let mut project = open_project(data_dir, output)?;
    let archived = project
        .store
        .archive(&args.id)
        .map_err(|e| fail_store(output, &e))?
        .ok_or_else(|| not_found(output, &args.id))?;

    render_item(&archived, output)?;
    Ok(())
}
