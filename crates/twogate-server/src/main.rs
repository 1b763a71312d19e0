//! twogate server — application entry point.

use std::path::PathBuf;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use twogate_auth::gateway::{LogMailGateway, LogSmsGateway};
use twogate_auth::{AuthConfig, AuthService};
use twogate_server::api::{self, AppState};
use twogate_store::MemoryCredentialStore;

#[derive(Parser)]
#[command(name = "twogate-server", version, about = "Two-factor authentication service")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8080, env = "TWOGATE_PORT")]
    port: u16,

    /// Path to the PEM-encoded Ed25519 private key for token signing
    #[arg(long, env = "TWOGATE_JWT_PRIVATE_KEY")]
    jwt_private_key: PathBuf,

    /// Path to the PEM-encoded Ed25519 public key for token verification
    #[arg(long, env = "TWOGATE_JWT_PUBLIC_KEY")]
    jwt_public_key: PathBuf,

    /// Token issuer (`iss` claim)
    #[arg(long, env = "TWOGATE_JWT_ISSUER", default_value = "twogate")]
    jwt_issuer: String,

    /// Issuer label shown in authenticator apps
    #[arg(long, env = "TWOGATE_TOTP_ISSUER", default_value = "TwoGate")]
    totp_issuer: String,

    /// Optional pepper mixed into password hashes
    #[arg(long, env = "TWOGATE_PEPPER")]
    pepper: Option<String>,

    /// Base64-encoded 32-byte key for encrypting TOTP secrets at rest
    #[arg(long, env = "TWOGATE_SECRET_KEY")]
    secret_encryption_key: Option<String>,
}

fn decode_secret_key(encoded: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = STANDARD
        .decode(encoded)
        .context("secret encryption key is not valid base64")?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow::anyhow!("secret encryption key must decode to exactly 32 bytes"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("twogate=info".parse()?))
        .json()
        .init();

    let args = Args::parse();

    let jwt_private_key_pem = std::fs::read_to_string(&args.jwt_private_key)
        .with_context(|| format!("reading {}", args.jwt_private_key.display()))?;
    let jwt_public_key_pem = std::fs::read_to_string(&args.jwt_public_key)
        .with_context(|| format!("reading {}", args.jwt_public_key.display()))?;
    let secret_encryption_key = args
        .secret_encryption_key
        .as_deref()
        .map(decode_secret_key)
        .transpose()?;

    let config = AuthConfig {
        jwt_private_key_pem,
        jwt_public_key_pem,
        jwt_issuer: args.jwt_issuer,
        totp_issuer: args.totp_issuer,
        pepper: args.pepper,
        secret_encryption_key,
        ..AuthConfig::default()
    };

    let store = MemoryCredentialStore::new();
    let service = AuthService::new(store, LogSmsGateway, LogMailGateway, config);
    let state = AppState::new(service);

    tracing::info!("starting twogate server on port {}", args.port);
    api::serve(state, args.port).await
}
