//! esdl-cli - Command-line interface for the regional Earth System Data Lab
//!
//! The three things one does with the archive, as subcommands:
//! - `ls` lists the cubes in the bucket or the contents of one cube
//! - `get` copies a cube (or part of it) to a local directory
//! - `open` and `read` inspect a cube where it lives, without copying it

use anyhow::Result;
use clap::{Parser, Subcommand};
use esdl_cloud::{CloudError, DownloadOptions, StoreOptions};
use esdl_core::Config;
use std::path::PathBuf;
use std::process;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// esdl - list, copy and open the regional Earth System Data Lab archive
#[derive(Parser)]
#[command(name = "esdl")]
#[command(author, version, about = "List, copy and open the regional Earth System Data Lab archive", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show progress bar during downloads
    #[arg(long, global = true)]
    progress: bool,

    /// Region of the bucket
    #[arg(long, global = true, env = "ESDL_REGION")]
    region: Option<String>,

    /// S3-compatible endpoint to use instead of AWS
    #[arg(long, global = true, env = "ESDL_ENDPOINT")]
    endpoint: Option<String>,

    /// Permit plain http endpoints
    #[arg(long, global = true)]
    allow_http: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the contents of a bucket or prefix
    Ls {
        /// Bucket or prefix (defaults to the configured bucket)
        location: Option<String>,

        /// List every object beneath the prefix
        #[arg(short, long)]
        recursive: bool,

        /// Show size and modification time
        #[arg(short, long)]
        long: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy objects to a local directory
    Get {
        /// Objects or prefixes to copy
        #[arg(required = true)]
        sources: Vec<String>,

        /// Output directory (defaults to the configured destination)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Copy everything beneath each source
        #[arg(short, long)]
        recursive: bool,

        /// Only copy files whose relative path matches (repeatable)
        #[arg(long)]
        include: Vec<String>,
    },

    /// Describe a remote dataset without downloading it
    Open {
        /// Dataset URL
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read one chunk of a variable and summarize its values
    Read {
        /// Dataset URL
        url: String,

        /// Variable name
        variable: String,

        /// Chunk grid indices, one per dimension
        #[arg(long, required = true, value_delimiter = ',')]
        chunk: Vec<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with = "show")]
        path: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug,hyper=info,hyper_util=info,reqwest=info,h2=info,rustls=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file options overridden by command-line flags and environment
fn store_options(cli: &Cli, config: &Config) -> StoreOptions {
    let mut options = config.store_options();
    if let Some(region) = &cli.region {
        options.region = Some(region.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        options.endpoint = Some(endpoint.clone());
    }
    if cli.allow_http {
        options.allow_http = true;
    }
    options
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() { 3 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    match run(cli) {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet);

    // `config --path` must work even when the file does not parse
    let config = match &cli.command {
        Commands::Config { show, path } => return commands::config(*show, *path),
        _ => Config::load()?,
    };
    let options = store_options(&cli, &config);
    debug!("Store options: {:?}", options);

    match &cli.command {
        Commands::Ls {
            location,
            recursive,
            long,
            json,
        } => {
            let location = location.as_deref().unwrap_or(&config.store.bucket);
            commands::list(location, &options, *recursive, *long, *json)?;
        }

        Commands::Get {
            sources,
            output,
            recursive,
            include,
        } => {
            let dest = output
                .clone()
                .unwrap_or_else(|| config.download.destination.clone());
            let download = DownloadOptions {
                recursive: *recursive,
                include: include.clone(),
            };
            commands::get(sources, &dest, &options, download, cli.progress)?;
        }

        Commands::Open { url, json } => {
            commands::open(url, &options, *json)?;
        }

        Commands::Read {
            url,
            variable,
            chunk,
            json,
        } => {
            commands::read(url, variable, chunk, &options, *json)?;
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn cloud_exit_code(err: &CloudError) -> i32 {
    match err {
        CloudError::ObjectStore(_) => 2,
        CloudError::Io(_) => 2,
        CloudError::InvalidLocation(_) => 3,
        CloudError::InvalidPattern(_) => 3,
        CloudError::Runtime(_) => 1,
    }
}

/// Map errors to exit codes:
/// - 0: Success
/// - 1: General error
/// - 2: IO or network error
/// - 3: Invalid location or arguments
/// - 4: Dataset format error
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(core_err) = err.downcast_ref::<esdl_core::Error>() {
        match core_err {
            esdl_core::Error::Cloud(e) => cloud_exit_code(e),
            esdl_core::Error::Io(_) => 2,
            esdl_core::Error::NotFound(_) => 2,
            esdl_core::Error::Config(_) => 1,
            esdl_core::Error::Metadata { .. } => 4,
            esdl_core::Error::Dataset(_) => 4,
            esdl_core::Error::Zarr(_) => 4,
        }
    } else if let Some(cloud_err) = err.downcast_ref::<CloudError>() {
        cloud_exit_code(cloud_err)
    } else if err.is::<std::io::Error>() {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let invalid: anyhow::Error = CloudError::InvalidLocation("x".into()).into();
        assert_eq!(map_error_to_exit_code(&invalid), 3);

        let wrapped: anyhow::Error =
            esdl_core::Error::Cloud(CloudError::InvalidLocation("x".into())).into();
        assert_eq!(map_error_to_exit_code(&wrapped), 3);

        let dataset: anyhow::Error = esdl_core::Error::Dataset("bad".into()).into();
        assert_eq!(map_error_to_exit_code(&dataset), 4);

        let io: anyhow::Error = std::io::Error::other("disk").into();
        assert_eq!(map_error_to_exit_code(&io), 2);

        assert_eq!(map_error_to_exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "esdl",
            "--region",
            "us-west-2",
            "--endpoint",
            "http://localhost:9000",
            "--allow-http",
            "ls",
        ]);
        let options = store_options(&cli, &Config::default());
        assert_eq!(options.region.as_deref(), Some("us-west-2"));
        assert_eq!(options.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(options.allow_http);
        assert!(options.anonymous);
    }

    #[test]
    fn test_chunk_indices_parse() {
        let cli = Cli::parse_from(["esdl", "read", "b/c.zarr", "gpp", "--chunk", "1,0,2"]);
        match cli.command {
            Commands::Read { chunk, .. } => assert_eq!(chunk, [1, 0, 2]),
            _ => panic!("expected read"),
        }
    }
}
