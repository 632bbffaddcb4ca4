pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod overlay;

pub use config::get_config_path;
pub use config::load_config;
pub use config::ArchiveConfig;
pub use config::Config;
pub use config::MountConfig;

pub use error::{IafsError, Result};

pub use client::{ArchiveClient, HttpArchiveClient, Item, MetadataEdit, ModifyResponse};
pub use overlay::{ArchiveAdapter, ArchiveOperations, IaFs, PathResolver};
