//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch and verify remote-stored note attachments.
///
/// Resolves an attachment identifier to a signed download URL, streams it
/// into the local cache with progress reporting, and verifies the result
/// before it becomes visible.
#[derive(Parser, Debug)]
#[command(name = "attachments")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download an attachment into the local cache
    Fetch {
        /// Attachment identifier (content hash)
        identifier: String,

        /// Resolution endpoint that returns the signed download URL
        #[arg(long)]
        resolve_url: String,

        /// Access token; sent as an Authorization bearer header on the
        /// resolution request
        #[arg(long)]
        token: Option<String>,

        /// Extra request header as NAME:VALUE (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Check that a remote attachment exists and is non-empty
    Check {
        /// Attachment identifier (content hash)
        identifier: String,

        /// Access token for the authorized metadata query
        #[arg(long)]
        token: String,

        /// Sync API host override
        #[arg(long)]
        api_host: Option<String>,
    },
}

/// Parses a NAME:VALUE header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("invalid header '{raw}', expected NAME:VALUE")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_fetch_parses_successfully() {
        let args = Args::try_parse_from([
            "attachments",
            "fetch",
            "doc123",
            "--resolve-url",
            "https://sync.example.com/attachments/doc123/url",
        ])
        .unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        match args.command {
            Command::Fetch {
                identifier,
                resolve_url,
                token,
                headers,
                cache_dir,
                no_progress,
            } => {
                assert_eq!(identifier, "doc123");
                assert!(resolve_url.contains("doc123"));
                assert!(token.is_none());
                assert!(headers.is_empty());
                assert!(cache_dir.is_none());
                assert!(!no_progress);
            }
            Command::Check { .. } => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_cli_fetch_repeatable_headers() {
        let args = Args::try_parse_from([
            "attachments",
            "fetch",
            "doc123",
            "--resolve-url",
            "https://sync.example.com/u",
            "--header",
            "Authorization: Bearer tok",
            "--header",
            "X-Client: cli",
        ])
        .unwrap();
        match args.command {
            Command::Fetch { headers, .. } => assert_eq!(headers.len(), 2),
            Command::Check { .. } => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_cli_check_parses_successfully() {
        let args =
            Args::try_parse_from(["attachments", "check", "doc123", "--token", "tok-123"]).unwrap();
        match args.command {
            Command::Check {
                identifier,
                token,
                api_host,
            } => {
                assert_eq!(identifier, "doc123");
                assert_eq!(token, "tok-123");
                assert!(api_host.is_none());
            }
            Command::Fetch { .. } => panic!("expected check command"),
        }
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        let result = Args::try_parse_from(["attachments"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from([
            "attachments",
            "check",
            "doc123",
            "--token",
            "t",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_parse_header_valid() {
        let (name, value) = parse_header("Authorization: Bearer tok").unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer tok");
    }

    #[test]
    fn test_parse_header_missing_separator_is_error() {
        assert!(parse_header("no-separator").is_err());
    }

    #[test]
    fn test_parse_header_empty_name_is_error() {
        assert!(parse_header(":value-only").is_err());
    }
}
