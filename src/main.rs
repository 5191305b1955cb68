//! Seglane CLI
//!
//! Entry point for the `seglane` command-line tool.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use seg_protocol::{
    decode_result, encode_payment, Address, ManifestId, VideoProfile, PAYMENT_HEADER,
    SEGMENT_HEADER, SENDER_HEADER,
};
use seglane::keys::{encode_signing_key, encode_verifying_key, fingerprint, load_signing_key};
use seglane::{
    address_of, gen_seg_creds, generate_keypair, ticket_payment, win_prob_from_f64,
    ResultSummary, SegmentSigner,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seglane")]
#[command(about = "Segment transcoding lane submitter tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a submitter keypair
    Keygen,

    /// Emit a ticket payment header
    Payment {
        /// File holding the sender's base64 signing key
        #[arg(long, short = 'k')]
        key: PathBuf,

        /// Worker address the tickets pay (0x-prefixed hex)
        #[arg(long, short = 'r')]
        recipient: String,

        /// Ticket face value
        #[arg(long)]
        face_value: u64,

        /// Winning probability in [0, 1]
        #[arg(long, default_value_t = 1.0)]
        win_prob: f64,

        /// Ticket nonces (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "1")]
        nonces: Vec<u32>,
    },

    /// Emit signed request headers for a segment file
    Creds {
        /// File holding the base64 signing key
        #[arg(long, short = 'k')]
        key: PathBuf,

        /// Stream manifest id
        #[arg(long, short = 'm')]
        manifest: String,

        /// Segment sequence number
        #[arg(long, short = 's')]
        seq: u64,

        /// Rendition preset (repeatable, e.g. P720p60fps16x9)
        #[arg(long = "profile", short = 'p')]
        profiles: Vec<String>,

        /// Segment duration in milliseconds
        #[arg(long, default_value_t = 2000)]
        duration_ms: u64,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Segment file
        segment: PathBuf,
    },

    /// Print an encoded transcode result as JSON
    DecodeResult {
        /// File holding the response body
        path: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Keygen => keygen(),
        Commands::Payment {
            key,
            recipient,
            face_value,
            win_prob,
            nonces,
        } => payment(key, recipient, face_value, win_prob, nonces),
        Commands::Creds {
            key,
            manifest,
            seq,
            profiles,
            duration_ms,
            json,
            segment,
        } => creds(key, manifest, seq, profiles, duration_ms, json, segment),
        Commands::DecodeResult { path } => decode(path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn keygen() -> CliResult {
    let key = generate_keypair();
    let verifying = key.verifying_key();
    let out = json!({
        "signing_key": encode_signing_key(&key),
        "verifying_key": encode_verifying_key(&verifying),
        "address": address_of(&verifying).to_string(),
        "fingerprint": fingerprint(&verifying),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn payment(
    key: PathBuf,
    recipient: String,
    face_value: u64,
    win_prob: f64,
    nonces: Vec<u32>,
) -> CliResult {
    let signer = SegmentSigner::new(load_signing_key(&key)?);
    let recipient: Address = recipient.parse()?;
    let payment = ticket_payment(
        &signer,
        recipient,
        face_value,
        win_prob_from_f64(win_prob),
        &nonces,
    );
    println!("{}: {}", PAYMENT_HEADER, encode_payment(&payment));
    Ok(())
}

fn creds(
    key: PathBuf,
    manifest: String,
    seq: u64,
    profiles: Vec<String>,
    duration_ms: u64,
    json: bool,
    segment: PathBuf,
) -> CliResult {
    let signer = SegmentSigner::new(load_signing_key(&key)?);
    let profiles = profiles
        .iter()
        .map(|name| {
            VideoProfile::preset(name).ok_or_else(|| {
                let known: Vec<&str> = VideoProfile::preset_names().collect();
                format!("unknown profile {:?} (known: {})", name, known.join(", "))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = fs::read(&segment)?;

    let (_, header) = gen_seg_creds(
        &signer,
        ManifestId::new(manifest),
        seq,
        &data,
        profiles,
        duration_ms,
    );
    let sender = signer.address().to_string();

    if json {
        let out = json!({ SEGMENT_HEADER: header, SENDER_HEADER: sender });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}: {}", SEGMENT_HEADER, header);
        println!("{}: {}", SENDER_HEADER, sender);
    }
    Ok(())
}

fn decode(path: PathBuf) -> CliResult {
    let bytes = fs::read(&path)?;
    let result = decode_result(&bytes)?;
    let summary = ResultSummary::from(&result);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
