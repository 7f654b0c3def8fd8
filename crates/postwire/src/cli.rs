//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "postwire",
    version,
    about = "Send one email over SMTP (STARTTLS + AUTH LOGIN) and print the transcript"
)]
pub struct Cli {
    /// JSON configuration file; defaults to `<config dir>/postwire/config.json`.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value = "warn",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    /// Recipient address.
    #[arg(short, long, value_name = "ADDR")]
    pub to: String,

    #[arg(short, long)]
    pub subject: String,

    /// File holding the message body; standard input when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub body_file: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_required_only() {
        let cli = Cli::try_parse_from([
            "postwire",
            "--to",
            "owner@example.org",
            "--subject",
            "Report",
        ])
        .unwrap();
        assert_eq!(cli.to, "owner@example.org");
        assert_eq!(cli.subject, "Report");
        assert!(cli.config.is_none());
        assert!(cli.body_file.is_none());
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_parses_short_flags() {
        let cli = Cli::try_parse_from([
            "postwire",
            "-c",
            "/etc/postwire.json",
            "-l",
            "debug",
            "-t",
            "owner@example.org",
            "-s",
            "Report",
            "-b",
            "body.txt",
        ])
        .unwrap();
        assert_eq!(cli.config.unwrap(), PathBuf::from("/etc/postwire.json"));
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.body_file.unwrap(), PathBuf::from("body.txt"));
    }

    #[test]
    fn test_recipient_is_required() {
        assert!(Cli::try_parse_from(["postwire", "--subject", "Report"]).is_err());
    }
}
