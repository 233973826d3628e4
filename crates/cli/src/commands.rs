use crate::app::App;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use recall_indexer::sync::{apply_update, sync_directory, DirectorySync};
use recall_indexer::{FileWatcher, IndexUpdate};
use recall_vector_store::RetrievalResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub async fn index(app: &App, force: bool) -> Result<()> {
    let folder = app.folder()?;
    let started = Instant::now();

    let sync = index_folder(app, &folder, force).await?;

    println!(
        "Indexed {} files ({} chunks) from {} in {:.1}s",
        sync.files,
        sync.chunks,
        folder.display(),
        started.elapsed().as_secs_f64()
    );
    if sync.pruned_documents > 0 {
        println!("Removed {} documents no longer present", sync.pruned_documents);
    }
    Ok(())
}

async fn index_folder(app: &App, folder: &Path, force: bool) -> Result<DirectorySync> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("spinner template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Indexing {}", folder.display()));

    let indexed = if force {
        app.indexer.rebuild_directory(folder).await
    } else {
        app.indexer.index_directory(folder).await
    };
    let indexed = match indexed {
        Ok(indexed) => indexed,
        Err(err) => {
            spinner.finish_and_clear();
            return Err(err).context("indexing failed");
        }
    };

    spinner.set_message("Writing vector store");
    let sync = sync_directory(app.store(), indexed).await;
    spinner.finish_and_clear();
    sync.context("updating vector store")
}

#[derive(Debug, Serialize)]
struct SearchHit {
    rank: usize,
    score: f32,
    document_id: String,
    source: PathBuf,
    chunk_index: usize,
    content: String,
}

impl SearchHit {
    fn new(rank: usize, result: RetrievalResult) -> Self {
        Self {
            rank,
            score: result.score,
            document_id: result.document_id,
            source: result.chunk.metadata.source,
            chunk_index: result.chunk.index,
            content: result.chunk.content,
        }
    }
}

pub async fn search(
    app: &App,
    query: &str,
    top_k: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let defaults = app.retriever.config();
    let top_k = top_k.unwrap_or(defaults.top_k);
    let threshold = threshold.unwrap_or(defaults.similarity_threshold);

    let results = app
        .retriever
        .retrieve_with(query, top_k, threshold)
        .await
        .context("search failed")?;
    let hits: Vec<SearchHit> = results
        .into_iter()
        .enumerate()
        .map(|(i, r)| SearchHit::new(i + 1, r))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results above threshold {threshold:.2}");
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{}. [{:.3}] {} (chunk {})",
            hit.rank,
            hit.score,
            hit.source.display(),
            hit.chunk_index
        );
        for line in hit.content.lines().filter(|l| !l.trim().is_empty()) {
            println!("   {line}");
        }
        println!();
    }
    Ok(())
}

pub async fn watch(app: &App) -> Result<()> {
    let folder = app.folder()?;
    let (watcher, mut updates, sync) = begin_watch(app, &folder).await?;
    println!(
        "Indexed {} files ({} chunks); watching {} (Ctrl-C to stop)",
        sync.files,
        sync.chunks,
        folder.display()
    );

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                let path = update.path().to_path_buf();
                if let Err(err) = apply_update(app.store(), update).await {
                    log::error!("Failed to apply update for {}: {err}", path.display());
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    log::warn!("Ctrl-C handler failed: {err}");
                }
                break;
            }
        }
    }

    watcher.stop().await;
    println!("Stopped watching {}", folder.display());
    Ok(())
}

/// Start the watcher, then run the initial sync. Writes that land during the scan
/// queue up on the update channel and are applied after it.
async fn begin_watch(
    app: &App,
    folder: &Path,
) -> Result<(FileWatcher, mpsc::Receiver<IndexUpdate>, DirectorySync)> {
    let (watcher, updates) =
        FileWatcher::start(app.indexer.clone(), folder, app.config.watcher.clone())
            .context("starting file watcher")?;
    let sync = index_folder(app, folder, false).await?;
    Ok((watcher, updates, sync))
}

pub async fn stats(app: &App) -> Result<()> {
    let stats = app.retriever.stats().await?;
    let cache = app.indexer.cache();
    let cached = cache.document_count()?;

    println!("Store:     {}", app.store().path().display());
    println!("Documents: {}", stats.documents);
    println!("Chunks:    {}", stats.chunks);
    println!("Cache:     {} ({cached} documents)", cache.dir().display());
    Ok(())
}
