#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::resolve::ResolveArgs;
use fuse_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fuse-resolve")]
#[command(author, version, about = "Resolve module specifiers the way the bundler does", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve specifiers as seen from an importing file
    Resolve {
        /// Specifiers to resolve
        #[arg(required = true)]
        targets: Vec<String>,

        /// Importing file (default: <home>/index.js)
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Project root used for bundle paths (default: working directory)
        #[arg(long, value_name = "DIR")]
        home: Option<PathBuf>,

        /// Alias entry; repeat in priority order. A trailing `$` on KEY
        /// matches the whole specifier only.
        #[arg(long = "alias", value_name = "KEY=TARGET")]
        aliases: Vec<String>,

        /// TypeScript baseUrl (default: home when --paths is given)
        #[arg(long, value_name = "DIR")]
        base_url: Option<PathBuf>,

        /// JSON file holding a TypeScript `paths` object
        #[arg(long, value_name = "FILE")]
        paths: Option<PathBuf>,

        /// Extension priority list, comma-separated (default: .js,.jsx,.ts,.tsx,.mjs,.json)
        #[arg(long, value_delimiter = ',')]
        extensions: Vec<String>,

        /// Ignore `browser` fields in package.json
        #[arg(long)]
        no_browser: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Resolve {
            targets,
            from,
            home,
            aliases,
            base_url,
            paths,
            extensions,
            no_browser,
        }) => commands::resolve::run(
            &config.cwd,
            ResolveArgs {
                targets,
                from,
                home,
                aliases,
                base_url,
                paths,
                extensions,
                no_browser,
            },
            config.json_logs,
        ),
    }
}
