use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facefuse::{config, enroll, index, storage::GalleryStore, FaceObservation, IndexHandle, Matcher};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facefuse")]
#[command(version, about = "Multi-frame face enrollment and cosine-similarity recognition")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse pre-extracted face observations into one identity vector and store it
    Enroll {
        /// Identity key to enroll under
        #[arg(short, long)]
        user: String,
        /// JSON array of face observations
        #[arg(short, long)]
        observations: PathBuf,
        /// Number of best frames to fuse
        #[arg(long)]
        select_top: Option<usize>,
    },
    /// Look up the closest enrolled identities for a query vector
    Recognize {
        /// JSON array of numbers
        #[arg(short, long)]
        query: PathBuf,
        #[arg(short, default_value_t = 1)]
        k: usize,
        /// Override the configured match threshold
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// List enrolled identities
    List,
    /// Remove an enrolled identity, or the whole gallery with --all
    Purge {
        #[arg(short, long, required_unless_present = "all", conflicts_with = "all")]
        user: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;
    let store = GalleryStore::open(&cfg.gallery_dir);

    match cli.command {
        Commands::Enroll {
            user,
            observations,
            select_top,
        } => enroll_user(&cfg, &store, &user, &observations, select_top),
        Commands::Recognize { query, k, threshold } => recognize(&cfg, &store, &query, k, threshold),
        Commands::List => list(&store),
        Commands::Purge { user, all } => purge(&store, user.as_deref(), all),
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn enroll_user(
    cfg: &config::Config,
    store: &GalleryStore,
    user: &str,
    path: &Path,
    select_top: Option<usize>,
) -> Result<()> {
    info!("Enrolling identity: {}", user);

    let observations: Vec<FaceObservation> = read_json(path)?;
    let mut options = cfg.enroll_options();
    if let Some(n) = select_top {
        options.select_top = n.max(1);
    }
    if observations.len() < options.min_images {
        warn!(
            "{} observation(s) given, fewer than the configured minimum of {}",
            observations.len(),
            options.min_images
        );
    }

    let fused = enroll::fuse_observations(&observations, &options).context("Enrollment rejected")?;
    info!(
        "Selected {} of {} frame(s): {:?}",
        fused.frames_selected, fused.frames_processed, fused.selected_indices
    );

    store
        .upsert(index::GalleryEntry {
            identity_key: user.to_string(),
            vector: fused.vector.clone(),
            version_tag: fused.version.clone(),
        })
        .context("Failed to save identity")?;

    println!("{}", serde_json::to_string_pretty(&fused)?);
    info!("✓ Identity enrolled: {}", user);
    Ok(())
}

fn recognize(
    cfg: &config::Config,
    store: &GalleryStore,
    path: &Path,
    k: usize,
    threshold: Option<f32>,
) -> Result<()> {
    let query: Vec<f32> = read_json(path)?;
    let entries = store.load().context("Failed to load gallery")?;
    if entries.is_empty() {
        warn!("Gallery is empty, nothing can match");
    }

    let handle = Arc::new(IndexHandle::new(cfg.index_backend));
    handle.rebuild(&entries);
    info!(
        "Indexed {} identity vector(s) with {:?} backend",
        handle.snapshot().len(),
        handle.backend()
    );

    let matcher = Matcher::new(Arc::clone(&handle), threshold.unwrap_or(cfg.threshold));
    let hits = handle.query(&query, k);
    let best = matcher.match_one(&query);

    match &best {
        Some(m) if m.is_match => info!("✓ Matched {} (score {:.3})", m.identity_key, m.score),
        Some(m) => info!(
            "No match: closest is {} (score {:.3}, threshold {:.3})",
            m.identity_key, m.score, matcher.threshold
        ),
        None => info!("No match: gallery empty or query unusable"),
    }

    let out = serde_json::json!({ "best": best, "hits": hits });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn list(store: &GalleryStore) -> Result<()> {
    for entry in store.load()? {
        println!("{}\t{}\t{}", entry.identity_key, entry.version_tag, entry.vector.len());
    }
    Ok(())
}

fn purge(store: &GalleryStore, user: Option<&str>, all: bool) -> Result<()> {
    let user = match user {
        Some(user) if !all => user,
        _ => {
            info!("Purging every enrolled identity in {}", store.dir().display());
            return store.purge().context("Failed to purge gallery");
        }
    };
    info!("Removing identity: {}", user);
    if store.remove(user).context("Failed to remove identity")? {
        info!("✓ Removed: {}", user);
    } else {
        warn!("No identity enrolled under {}", user);
    }
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = config::ensure_config(path)?;
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
