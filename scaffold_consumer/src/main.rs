//! Consumer: a separate Rust project that uses scaffold-sdk as a dependency.
//!
//! Run from repo root: `cargo run -p scaffold-consumer`
//! `SCAFFOLD_PATH` names a directory of section files or a single document (default `scaffold`).

use scaffold_sdk::{load, resolve};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scaffold_sdk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::var("SCAFFOLD_PATH").unwrap_or_else(|_| "scaffold".into());
    tracing::info!("loading scaffold from {}", path);
    let document = load(&path)?;
    let scaffold = resolve(&document)?;
    println!("{}", serde_json::to_string_pretty(&scaffold)?);
    Ok(())
}
