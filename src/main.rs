use clap::error::ErrorKind;
use clap::Parser;

use iafs::cli::{Args, Commands, MetadataArgs};
use iafs::{commands, error, load_config, HttpArchiveClient};

fn main() {
    match run() {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> error::Result<i32> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("IAFS_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            eprint!("{}", e);
            return Ok(1);
        }
    };

    match args.command {
        Commands::Mount {
            primary_root,
            fallback_root,
            mount_point,
        } => commands::run_mount(&primary_root, &fallback_root, &mount_point),
        Commands::Metadata(metadata_args) => run_metadata(&metadata_args),
    }
}

fn run_metadata(args: &MetadataArgs) -> error::Result<i32> {
    let config = load_config()?;
    let client = HttpArchiveClient::new(&config.archive)?;

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    commands::run_metadata(&client, args, &mut stdout.lock(), &mut stderr.lock())
}
