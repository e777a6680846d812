//! `inc create`: report a new incident.

use crate::cmd::{fail_store, open_project};
use crate::output::{OutputMode, render_item};
use clap::Args;
use incidents_core::validate::CreatePayload;
use std::path::Path;

/// Every field is optional here so that missing ones are reported together
/// with any other validation failure.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short summary, at least 5 characters.
    #[arg(short, long)]
    pub title: Option<String>,

    /// What happened, at least 10 characters.
    #[arg(short, long)]
    pub description: Option<String>,

    /// IT, SAFETY, FACILITIES, or OTHER.
    #[arg(short, long)]
    pub category: Option<String>,

    /// LOW, MEDIUM, or HIGH.
    #[arg(short, long)]
    pub severity: Option<String>,
}

impl CreateArgs {
    fn payload(&self) -> CreatePayload {
        CreatePayload {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            severity: self.severity.clone(),
        }
    }
}

pub fn run_create(args: &CreateArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let mut project = open_project(data_dir, output)?;
    let incident = project
        .store
        .submit(&args.payload())
        .map_err(|e| fail_store(output, &e))?;

    render_item(&incident, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CreateArgs,
    }

    #[test]
    fn create_args_map_to_payload() {
        let w = Wrapper::parse_from([
            "test",
            "--title",
            "Server down",
            "-d",
            "Main server offline",
            "-c",
            "IT",
            "-s",
            "HIGH",
        ]);
        let payload = w.args.payload();
        assert_eq!(payload.title.as_deref(), Some("Server down"));
        assert_eq!(payload.category.as_deref(), Some("IT"));
        assert_eq!(payload.severity.as_deref(), Some("HIGH"));
    }

    #[test]
    fn missing_flags_stay_none() {
        let w = Wrapper::parse_from(["test", "--title", "Only a title"]);
        let payload = w.args.payload();
        assert!(payload.description.is_none());
        assert!(payload.category.is_none());
        assert!(payload.severity.is_none());
    }
}
