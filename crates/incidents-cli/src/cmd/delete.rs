//! `inc delete`: permanently remove an incident.
//!
//! Unlike archive this cannot be undone; the record is gone from the store
//! file once the command returns.

use crate::cmd::{fail_store, not_found, open_project};
use crate::output::{OutputMode, render};
use clap::Args;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Incident ID.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    id: String,
    title: String,
    deleted: bool,
}

pub fn run_delete(args: &DeleteArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let mut project = open_project(data_dir, output)?;
    let removed = project
        .store
        .delete(&args.id)
        .map_err(|e| fail_store(output, &e))?
        .ok_or_else(|| not_found(output, &args.id))?;

    let payload = DeleteOutput {
        id: removed.id,
        title: removed.title,
        deleted: true,
    };
    render(output, &payload, |p, w| {
        writeln!(w, "✓ Deleted incident {} ({})", p.id, p.title)
    })
}
