//! `inc list`: list incidents in the order they were reported.

use crate::cmd::open_project;
use crate::output::{OutputMode, render_list};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include ARCHIVED incidents.
    #[arg(short, long)]
    pub all: bool,
}

pub fn run_list(args: &ListArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let project = open_project(data_dir, output)?;
    let include_archived = args.all || project.config.list.include_archived;

    render_list(&project.store.list_all(include_archived), output)?;
    Ok(())
}
