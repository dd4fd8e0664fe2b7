use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tal",
    about = "Trust Anchor Ledger: tamper-evident anchoring for credential certificates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Audit the ledger chain stored in a data directory
    Verify(VerifyArgs),
    /// Generate an Ed25519 issuer key pair
    Keygen,
    /// Print the SHA-256 fingerprint of a token or key
    Hash(HashArgs),
    /// Sign a certificate payload and print the registration body
    Sign(SignArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Directory for ledger and registry documents (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,
}

#[derive(Args)]
pub struct HashArgs {
    pub text: String,
}

#[derive(Args)]
pub struct SignArgs {
    /// Issuer secret key, 64 hex characters
    #[arg(long)]
    pub secret_key: String,
    #[arg(long)]
    pub issuer: String,
    #[arg(long)]
    pub credential: String,
    /// Raw token; only its hash is placed in the payload
    #[arg(long)]
    pub token: String,
    /// Expiry in milliseconds since the UNIX epoch
    #[arg(long)]
    pub expiry: u64,
    /// Hash of the anchoring ledger block
    #[arg(long)]
    pub block: String,
    /// Defaults to a fresh UUIDv7
    #[arg(long)]
    pub certificate_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "tal",
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--data-dir",
            "/srv/tal",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert_eq!(args.data_dir, Some(PathBuf::from("/srv/tal")));
            assert!(args.config.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verify_default_dir() {
        let cli = Cli::try_parse_from(["tal", "verify"]).unwrap();
        if let Command::Verify(args) = cli.command {
            assert_eq!(args.data_dir, PathBuf::from("./data"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["tal", "keygen", "-v", "--format", "json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Keygen));
    }

    #[test]
    fn parse_sign() {
        let cli = Cli::try_parse_from([
            "tal",
            "sign",
            "--secret-key",
            "00",
            "--issuer",
            "u",
            "--credential",
            "c",
            "--token",
            "t",
            "--expiry",
            "123",
            "--block",
            "h",
        ])
        .unwrap();
        if let Command::Sign(args) = cli.command {
            assert_eq!(args.expiry, 123);
            assert!(args.certificate_id.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn bad_bind_address_rejected() {
        assert!(Cli::try_parse_from(["tal", "serve", "--bind", "nowhere"]).is_err());
    }
}
