use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iafs")]
#[command(version)]
#[command(about = "Browse archive items as a filesystem and edit their metadata")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Mount archive items at a mount point, backed by two local roots")]
    Mount {
        #[arg(help = "Local directory checked first; new files land here")]
        primary_root: String,
        #[arg(help = "Local directory checked when the primary root misses")]
        fallback_root: String,
        #[arg(help = "Existing directory to mount the filesystem on")]
        mount_point: String,
    },
    #[command(about = "Retrieve and modify item metadata")]
    Metadata(MetadataArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct MetadataArgs {
    #[arg(help = "Item identifiers")]
    pub identifiers: Vec<String>,

    #[arg(
        short = 'm',
        long,
        value_name = "KEY:VALUE",
        conflicts_with = "append",
        help = "Modify the metadata of an item"
    )]
    pub modify: Vec<String>,

    #[arg(
        short = 't',
        long,
        requires = "modify",
        help = "The metadata target to modify"
    )]
    pub target: Option<String>,

    #[arg(
        short = 'a',
        long,
        value_name = "KEY:VALUE",
        help = "Append metadata to an element"
    )]
    pub append: Vec<String>,

    #[arg(
        short = 's',
        long,
        value_name = "METADATA.CSV",
        help = "Modify metadata in bulk using a spreadsheet as input"
    )]
    pub spreadsheet: Option<PathBuf>,

    #[arg(
        short = 'e',
        long,
        conflicts_with_all = ["formats", "modify", "append"],
        help = "Check if an item exists"
    )]
    pub exists: bool,

    #[arg(
        short = 'F',
        long,
        conflicts_with_all = ["modify", "append"],
        help = "Return the file-formats the given item contains"
    )]
    pub formats: bool,

    #[arg(
        short = 'p',
        long,
        allow_negative_numbers = true,
        help = "Set the task priority"
    )]
    pub priority: Option<i64>,
}

/// What the per-identifier loop does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMode {
    Exists,
    Modify,
    Append,
    Formats,
    Dump,
}

impl MetadataArgs {
    pub fn mode(&self) -> MetadataMode {
        if self.exists {
            MetadataMode::Exists
        } else if !self.modify.is_empty() {
            MetadataMode::Modify
        } else if !self.append.is_empty() {
            MetadataMode::Append
        } else if self.formats {
            MetadataMode::Formats
        } else {
            MetadataMode::Dump
        }
    }

    /// The `key:value` tokens of the active edit mode.
    pub fn edit_tokens(&self) -> &[String] {
        if !self.modify.is_empty() {
            &self.modify
        } else {
            &self.append
        }
    }
}
