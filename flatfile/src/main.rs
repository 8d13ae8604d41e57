mod commands;
mod error;

use std::path::PathBuf;

use anyhow::Context;
use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "v",
        visible_alias = "validate",
        about = "Report every warning and error in a file"
    )]
    Validate {
        #[structopt(long, help = "Stop at the first record group with errors")]
        stop_on_error: bool,

        #[structopt(parse(from_os_str), help = "Path to the JSON layout file")]
        layout: PathBuf,

        #[structopt(parse(from_os_str), help = "Path to the flat file")]
        path: PathBuf,
    },

    #[structopt(
        name = "d",
        visible_alias = "dump",
        about = "Print each record group as a line of JSON"
    )]
    Dump {
        #[structopt(long, help = "Print only the values of groups without errors")]
        values: bool,

        #[structopt(parse(from_os_str), help = "Path to the JSON layout file")]
        layout: PathBuf,

        #[structopt(parse(from_os_str), help = "Path to the flat file")]
        path: PathBuf,
    },

    #[structopt(
        name = "i",
        visible_alias = "info",
        about = "Describe a layout and its record hierarchy"
    )]
    Info {
        #[structopt(parse(from_os_str), help = "Path to the JSON layout file")]
        layout: PathBuf,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "flatfile",
    about = "Validate and inspect hierarchical flat files.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "flatfile (v|d|i) [FLAGS] <layout> [file]"
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn main() -> anyhow::Result<()> {
    let opts = CliOpts::from_args();

    let default_level = if opts.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match opts.cmd {
        Commands::Validate {
            stop_on_error,
            layout,
            path,
        } => {
            let clean = commands::validate(layout, path.clone(), stop_on_error)
                .with_context(|| format!("validating `{}`", path.display()))?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Dump {
            values,
            layout,
            path,
        } => commands::dump(layout, path.clone(), values)
            .with_context(|| format!("dumping `{}`", path.display()))?,
        Commands::Info { layout } => commands::info(layout)?,
    }

    Ok(())
}
