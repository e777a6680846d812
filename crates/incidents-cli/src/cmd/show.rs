//! `inc show`: print one incident.

use crate::cmd::{not_found, open_project};
use crate::output::{OutputMode, render_item};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Incident ID (exact match).
    pub id: String,
}

pub fn run_show(args: &ShowArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let project = open_project(data_dir, output)?;
    let Some(incident) = project.store.find_by_id(&args.id) else {
        return Err(not_found(output, &args.id));
    };

    render_item(&incident, output)?;
    Ok(())
}
