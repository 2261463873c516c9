//! This is the main entry point for the flash image tool.
//!
//! The program packs a host directory into a fixed-size flash filesystem image,
//! or lists, visualizes and unpacks an existing image. It exits 0 on success and
//! 1 on any argument, I/O or engine error.

use clap::Parser;
use clap::error::ErrorKind;
use log::error;
use std::process;

use flashpack::FlashGeometry;
use flashpack::cli::{Action, Cli};
use flashpack::pipeline::pipeline_error::PipelineError;
use flashpack::pipeline::{extract, ingest, report};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => return,
                _ => process::exit(1),
            }
        }
    };

    stderrlog::new()
        .verbosity(*cli.verbose() as usize + 2)
        .init()
        .unwrap();

    if let Err(err) = run(&cli) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let geometry = FlashGeometry::new(*cli.size(), *cli.page_size(), *cli.block_size())?;

    match cli.action() {
        Action::Pack(src_dir) => ingest::pack(geometry, cli.image(), &src_dir),
        Action::Unpack(dest_dir) => extract::unpack(geometry, cli.image(), &dest_dir),
        Action::List => report::list(geometry, cli.image()),
        Action::Visualize => report::visualize(geometry, cli.image()),
    }
}
