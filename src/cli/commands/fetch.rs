//! Fetch artwork through the engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use tokio::runtime::Runtime;

use artwork_minder::artwork::{ArtIdentity, ArtSubject, ArtworkKind};
use artwork_minder::config;
use artwork_minder::engine::{ArtworkManager, ArtworkOutcome, ChannelRecipient};
use artwork_minder::sources::NetworkState;

use super::{KindArg, default_output};

/// How long to wait for disk writes before exiting
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Artist name
    #[arg(long)]
    pub artist: Option<String>,
    /// Album title
    #[arg(long)]
    pub album: Option<String>,
    /// Artwork URI (file path, file:// or http(s):// URL)
    #[arg(long)]
    pub uri: Option<String>,
    /// Fetch an artist image instead of album artwork
    #[arg(long)]
    pub artist_only: bool,
    /// Resolution to fetch
    #[arg(long, value_enum, default_value = "full")]
    pub kind: KindArg,
    /// Output file (default: artwork-<kind>.jpg)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Last.fm API key (or set LASTFM_API_KEY env var; overrides config)
    #[arg(long, env = "LASTFM_API_KEY")]
    pub api_key: Option<String>,
    /// Pretend there is no network connection
    #[arg(long, conflicts_with = "metered")]
    pub offline: bool,
    /// Pretend the connection is metered (not Wi-Fi)
    #[arg(long)]
    pub metered: bool,
}

impl FetchArgs {
    fn identity(&self) -> ArtIdentity {
        let subject = if self.artist_only {
            ArtSubject::Artist
        } else {
            ArtSubject::Album
        };
        ArtIdentity::new(subject, self.artist.clone(), self.album.clone(), self.uri.clone())
    }

    fn network(&self) -> NetworkState {
        if self.offline {
            NetworkState::OFFLINE
        } else if self.metered {
            NetworkState::CELLULAR
        } else {
            NetworkState::WIFI
        }
    }
}

/// Fetch artwork and write its JPEG payload to a file
pub fn cmd_fetch(rt: &Runtime, args: &FetchArgs) -> anyhow::Result<()> {
    let identity = args.identity();
    identity
        .validate()
        .context("Need --artist and --album, --artist with --artist-only, or --uri")?;

    let mut config = config::load();
    if args.api_key.is_some() {
        config.credentials.lastfm_api_key = args.api_key.clone();
    }
    let kind = ArtworkKind::from(args.kind);
    let out = args.out.clone().unwrap_or_else(|| default_output(kind));

    println!("Fetching {} artwork for {}", kind, identity);

    let (outcome, manager) = rt.block_on(async {
        let manager = ArtworkManager::from_config(&config, Arc::new(args.network()))?;
        let (recipient, rx) = ChannelRecipient::new();
        let handle = manager.request_artwork(identity, kind, recipient.clone());

        let outcome = rx.await.context("Artwork engine stopped")?;
        if recipient.placeholder_shown() {
            println!("Not cached, fetched from sources");
        }
        drop(handle);
        anyhow::Ok((outcome, manager))
    })?;

    let image = match outcome {
        ArtworkOutcome::Delivered(image) => image,
        ArtworkOutcome::Exhausted => bail!("No artwork found for {}", args.identity()),
    };

    std::fs::write(&out, image.encoded())
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("✓ Saved {}x{} image to {}", image.width(), image.height(), out.display());
    if let Some(dominant) = image.palette().dominant() {
        let [r, g, b] = dominant.rgb;
        println!("  Dominant colour: #{:02x}{:02x}{:02x}", r, g, b);
    }

    if !manager.write_behind().flush(FLUSH_TIMEOUT) {
        eprintln!("Warning: some images were not written to the disk cache");
    }
    Ok(())
}
