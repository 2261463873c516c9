//! Command-line configuration.
//!
//! Exactly one action flag is required per invocation; the geometry options all
//! have defaults but must match the values the image was created with, since the
//! image file carries no self-describing header.

use clap::{ArgAction, ArgGroup, Parser};
use getset::Getters;
use std::path::PathBuf;

/// The action resolved from the mutually exclusive action flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Pack a host directory into a fresh image.
    Pack(PathBuf),
    /// Extract the image's files into a host directory.
    Unpack(PathBuf),
    /// Print one line per file stored in the image.
    List,
    /// Dump block/page occupancy and capacity usage.
    Visualize,
}

/// Build, inspect and extract flash filesystem images.
#[derive(Debug, Parser, Getters)]
#[command(
    name = "flashpack",
    version,
    group(ArgGroup::new("action").required(true))
)]
pub struct Cli {
    /// Create a flash image from the files of a directory.
    #[arg(short = 'c', long = "create", value_name = "PACK_DIR", group = "action")]
    create: Option<PathBuf>,

    /// Unpack the files of a flash image into a directory.
    #[arg(short = 'u', long = "unpack", value_name = "DEST_DIR", group = "action")]
    unpack: Option<PathBuf>,

    /// List the files stored in a flash image.
    #[arg(short = 'l', long, group = "action")]
    list: bool,

    /// Dump the block/page occupancy map and capacity usage of a flash image.
    #[arg(short = 'i', long, group = "action")]
    visualize: bool,

    /// Image size in bytes (decimal or 0x-prefixed hexadecimal).
    #[arg(short = 's', long, value_name = "BYTES", default_value = "0x100000", value_parser = parse_u64)]
    #[get = "pub"]
    size: u64,

    /// Logical page size in bytes.
    #[arg(short = 'p', long, value_name = "BYTES", default_value = "512", value_parser = parse_u32)]
    #[get = "pub"]
    page_size: u32,

    /// Erase-block size in bytes.
    #[arg(short = 'b', long, value_name = "BYTES", default_value = "4096", value_parser = parse_u32)]
    #[get = "pub"]
    block_size: u32,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    #[get = "pub"]
    verbose: u8,

    /// Path of the flash image file.
    #[arg(value_name = "IMAGE_FILE")]
    #[get = "pub"]
    image: PathBuf,
}

impl Cli {
    /// Resolves the action flags into an [`Action`].
    ///
    /// The required argument group guarantees exactly one flag is set.
    pub fn action(&self) -> Action {
        if let Some(dir) = &self.create {
            Action::Pack(dir.clone())
        } else if let Some(dir) = &self.unpack {
            Action::Unpack(dir.clone())
        } else if self.list {
            Action::List
        } else {
            Action::Visualize
        }
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };

    parsed.map_err(|_| format!("`{s}` is not a valid number"))
}

/// Parses a decimal or `0x`-prefixed hexadecimal number fitting in 32 bits.
fn parse_u32(s: &str) -> Result<u32, String> {
    parse_u64(s)?
        .try_into()
        .map_err(|_| format!("`{s}` does not fit in 32 bits"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_action_flag_is_required() {
        assert!(Cli::try_parse_from(["flashpack", "image.bin"]).is_err());
        assert!(Cli::try_parse_from(["flashpack", "-l", "-i", "image.bin"]).is_err());
        assert!(Cli::try_parse_from(["flashpack", "-l", "image.bin"]).is_ok());
    }

    #[test]
    fn create_resolves_to_the_pack_action() {
        let cli = Cli::try_parse_from(["flashpack", "-c", "files", "image.bin"]).unwrap();
        assert_eq!(cli.action(), Action::Pack(PathBuf::from("files")));
        assert_eq!(cli.image(), &PathBuf::from("image.bin"));
    }

    #[test]
    fn geometry_options_accept_hex_and_have_defaults() {
        let cli =
            Cli::try_parse_from(["flashpack", "-l", "-s", "0x40000", "image.bin"]).unwrap();
        assert_eq!(*cli.size(), 0x40000);
        assert_eq!(*cli.page_size(), 512);
        assert_eq!(*cli.block_size(), 4096);

        let cli = Cli::try_parse_from([
            "flashpack",
            "-l",
            "--page-size",
            "1024",
            "--block-size",
            "0x2000",
            "image.bin",
        ])
        .unwrap();
        assert_eq!(*cli.page_size(), 1024);
        assert_eq!(*cli.block_size(), 0x2000);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(Cli::try_parse_from(["flashpack", "-l", "-s", "0xZZ", "image.bin"]).is_err());
        assert!(Cli::try_parse_from(["flashpack", "-l", "-s", "12kb", "image.bin"]).is_err());
    }
}
