//! CLI module for bff
//!
//! This module handles command-line argument parsing and command execution.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

pub mod commands;

/// Exit status for help output and usage errors
pub const USAGE_EXIT_CODE: i32 = 1;

/// bff - black frame filter
///
/// Replaces spurious all-black frames with the last good frame and re-encodes
/// the input to H.264/AAC in an MP4 container.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "bff")]
#[command(about = "Black frame filter - replaces black frames with the last good frame and re-encodes to H.264/AAC MP4")]
#[command(long_about = None)]
pub struct Cli {
    /// Input media file
    #[arg(short = 'i', long = "input", visible_alias = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Output MP4 file, replaced if it already exists
    #[arg(short = 'o', long = "output", visible_alias = "out", value_name = "PATH")]
    pub output: PathBuf,
}

/// Parse an argument list, first element being the program name
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_long_and_alias_flags() {
        let cli = parse_args(["bff", "--in", "capture.ts", "--output", "clean.mp4"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("capture.ts"));
        assert_eq!(cli.output, PathBuf::from("clean.mp4"));

        let cli = parse_args(["bff", "--input", "a.mkv", "--out", "b.mp4"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("a.mkv"));
        assert_eq!(cli.output, PathBuf::from("b.mp4"));
    }

    #[test]
    fn test_short_flags() {
        let cli = parse_args(["bff", "-i", "a.mov", "-o", "b.mp4"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("a.mov"));
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let err = parse_args(["bff", "-i", "a.mov"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_help_is_reported_as_error_kind() {
        let err = parse_args(["bff", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_no_other_flags() {
        assert!(parse_args(["bff", "-i", "a", "-o", "b", "--crf", "20"]).is_err());
        assert!(parse_args(["bff", "--version"]).is_err());
    }
}
