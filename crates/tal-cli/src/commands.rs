use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};
use tal_crypto::{ContentHasher, SigningKey};
use tal_ledger::{Ledger, LedgerStats};
use tal_registry::CertificatePayload;
use tal_server::{ServerConfig, TalServer};
use tal_store::FileDocumentStore;
use tal_types::Timestamp;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Verify(args) => cmd_verify(args, format),
        Command::Keygen => cmd_keygen(format),
        Command::Hash(args) => cmd_hash(args, format),
        Command::Sign(args) => cmd_sign(args),
    }
}

fn resolve_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    println!(
        "{} TAL server on {} (data: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.data_dir.display()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(TalServer::new(config).serve())?;
    Ok(())
}

/// Open the chain under `data_dir` and return its stats and first violation.
fn audit_chain(data_dir: &Path) -> anyhow::Result<(LedgerStats, Option<String>)> {
    let store = FileDocumentStore::open(data_dir)
        .with_context(|| format!("opening data directory {}", data_dir.display()))?;
    let ledger = Ledger::open(Arc::new(store))?;
    let violation = ledger.audit()?.err().map(|e| e.to_string());
    Ok((ledger.stats()?, violation))
}

fn cmd_verify(args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (stats, violation) = audit_chain(&args.data_dir)?;
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "valid": stats.is_valid,
                    "stats": stats,
                    "violation": violation,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("Ledger: {}", args.data_dir.display().to_string().bold());
            println!("  Blocks: {}", stats.total_blocks.to_string().bold());
            println!("  Genesis: {}", stats.genesis_timestamp);
            println!("  Latest: {}", stats.latest_timestamp);
            match &violation {
                None => println!("{} Chain integrity verified.", "✓".green().bold()),
                Some(v) => println!("{} {}", "✗".red().bold(), v.red()),
            }
        }
    }
    if let Some(v) = violation {
        bail!("ledger chain failed verification: {v}");
    }
    Ok(())
}

fn cmd_keygen(format: OutputFormat) -> anyhow::Result<()> {
    let key = SigningKey::generate();
    let public = key.verifying_key().to_hex();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "secretKey": key.to_hex(),
                "publicKey": public,
            }))?
        ),
        OutputFormat::Text => {
            println!("{} Generated Ed25519 key pair", "✓".green().bold());
            println!("  Secret key: {}", key.to_hex().yellow());
            println!("  Public key: {}", public.cyan());
        }
    }
    Ok(())
}

fn cmd_hash(args: HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let digest = ContentHasher::hash_hex(args.text.as_bytes());
    match format {
        OutputFormat::Json => println!("{}", json!({ "hash": digest })),
        OutputFormat::Text => println!("{digest}"),
    }
    Ok(())
}

/// Build the `POST /certificates` body for the given issuer and claim.
fn signed_registration(args: SignArgs) -> anyhow::Result<Value> {
    let key = SigningKey::from_hex(&args.secret_key)
        .map_err(|e| anyhow::anyhow!("invalid secret key: {e}"))?;
    let payload = CertificatePayload {
        issuer_user_id: args.issuer,
        credential_id: args.credential,
        token_hash: ContentHasher::hash_hex(args.token.as_bytes()),
        expiry: Timestamp::from_millis(args.expiry),
        ledger_block_hash: args.block,
    };
    let message = payload.canonical_bytes()?;
    let signature = key.sign(&message).to_hex();

    let certificate_id = args
        .certificate_id
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    Ok(json!({
        "certificateId": certificate_id,
        "payload": payload,
        "signature": signature,
        "issuerPublicKey": key.verifying_key().to_hex(),
    }))
}

fn cmd_sign(args: SignArgs) -> anyhow::Result<()> {
    let body = signed_registration(args)?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
