//! qrframe CLI
//!
//! Exercises the codec end to end without a video container: `encode`
//! renders a file into numbered PNG stills plus a manifest, `decode`
//! reads the stills back and reconstructs the original bytes.

use clap::{Parser, Subcommand};
use qrframe::config::FileConfig;
use qrframe::decode::BatchDecoder;
use qrframe::encode::{Encoder, EncoderConfig, EncodingMetadata, ManifestEntry};
use qrframe::extract::PngDirectorySource;
use qrframe::reconstruct;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "qrframe", version, about = "Content-to-frame QR codec")]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a file into a directory of QR frame stills.
    Encode {
        /// Input file to encode.
        input: PathBuf,
        /// Directory to write frames and manifest into.
        #[arg(short, long)]
        out_dir: PathBuf,
    },
    /// Decode a directory of QR frame stills back into a file.
    Decode {
        /// Directory containing `frame_NNNNN.png` stills.
        frames_dir: PathBuf,
        /// Path to write the reconstructed content to.
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Manifest file written beside the frames.
#[derive(Serialize, Deserialize)]
struct ManifestFile {
    metadata: EncodingMetadata,
    chunks: Vec<ManifestEntry>,
}

const MANIFEST_NAME: &str = "manifest.toml";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => match FileConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config: {e}");
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    let outcome = match cli.command {
        Command::Encode { input, out_dir } => encode(&input, &out_dir, &config),
        Command::Decode { frames_dir, output } => decode(&frames_dir, &output, &config).await,
    };

    if let Err(e) = outcome {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn encode(input: &Path, out_dir: &Path, config: &FileConfig) -> Result<(), String> {
    let content =
        std::fs::read(input).map_err(|e| format!("failed to read {}: {e}", input.display()))?;
    info!("encoding {} ({} bytes)", input.display(), content.len());

    let encoder = Encoder::with_config(EncoderConfig {
        compression: config.codec.compression,
    });
    let result = encoder.encode(&content).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;

    for frame in &result.frames {
        let path = PngDirectorySource::frame_path(out_dir, frame.metadata.frame_index as u32);
        let image = image::RgbaImage::from_raw(
            frame.image.width(),
            frame.image.height(),
            frame.image.data().to_vec(),
        )
        .ok_or("frame buffer did not match its dimensions")?;
        image
            .save(&path)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }

    let manifest = ManifestFile {
        metadata: result.metadata.clone(),
        chunks: result.manifest,
    };
    let serialized =
        toml::to_string_pretty(&manifest).map_err(|e| format!("manifest serialization: {e}"))?;
    std::fs::write(out_dir.join(MANIFEST_NAME), serialized)
        .map_err(|e| format!("failed to write manifest: {e}"))?;

    info!(
        "wrote {} frames ({}) to {}",
        result.frames.len(),
        result.metadata.parameters.label(),
        out_dir.display()
    );
    Ok(())
}

async fn decode(frames_dir: &Path, output: &Path, config: &FileConfig) -> Result<(), String> {
    let mut source = PngDirectorySource::new(frames_dir);
    let count = source.count_frames();
    if count == 0 {
        return Err(format!("no frames found in {}", frames_dir.display()));
    }
    info!("decoding {count} frames from {}", frames_dir.display());

    let indices: Vec<u32> = (0..count).collect();
    let decoder = BatchDecoder::new(config.batch.to_options());
    let frames = decoder
        .decode_from_source(&mut source, &indices, 30.0, None)
        .await;

    let result = reconstruct::reconstruct(&frames).map_err(|e| e.to_string())?;

    // Verify against the manifest hash when one is present.
    match read_manifest(frames_dir) {
        Some(manifest) => {
            if manifest.metadata.content_hash == result.metadata.content_hash {
                info!("content hash verified against manifest");
            } else {
                warn!(
                    expected = %manifest.metadata.content_hash,
                    actual = %result.metadata.content_hash,
                    "content hash does not match manifest"
                );
            }
        }
        None => warn!("no manifest found, skipping hash verification"),
    }

    std::fs::write(output, &result.content)
        .map_err(|e| format!("failed to write {}: {e}", output.display()))?;
    info!(
        "reconstructed {} bytes to {}",
        result.content.len(),
        output.display()
    );
    Ok(())
}

fn read_manifest(frames_dir: &Path) -> Option<ManifestFile> {
    let content = std::fs::read_to_string(frames_dir.join(MANIFEST_NAME)).ok()?;
    toml::from_str(&content).ok()
}
