pub mod args;
pub mod validation;

pub use args::{Args, Commands, MetadataArgs, MetadataMode};
pub use validation::{
    parse_metadata_tokens, validate_metadata_args, validate_mount_args, MountPaths,
    METADATA_USAGE,
};
