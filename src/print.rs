//! The pipeline: inventory or ids → detail records → descriptions → sheets →
//! document. Each CLI command runs a prefix or suffix of it.

use std::collections::{HashMap, HashSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::bgg::{BggClient, CollectionOutcome};
use crate::cli::{
    CacheArgs, CollectionArgs, DescribeArgs, DetailsArgs, LayoutArgs, LayoutFormat, LayoutOptions,
    PrintArgs, PrintFormat, ServiceArgs,
};
use crate::config::{BggConfig, CacheConfig, load_layout_config};
use crate::description::{self, DescriptionCache};
use crate::formats::{GameRecord, RawCollectionEntry};
use crate::impose::{ImpositionEngine, LayoutConfig, LayoutMode};
use crate::markup;
use crate::normalize::normalize_record;
use crate::render::{PageDimensions, RenderSource, RendererPool};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    Written {
        path: PathBuf,
        records: usize,
        sheets: usize,
    },
    /// The inventory is still being prepared; nothing was written.
    Pending { message: String },
}

/// Trims, drops empties and keeps the first occurrence of each id.
pub fn normalize_ids(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .flat_map(|chunk| chunk.split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_owned)
        .collect()
}

/// Fetches details for `ids` in batches and normalizes them, in `ids` order.
///
/// Inventory entries with a matching id fill gaps in the detail record. Ids
/// the catalog does not return are logged and left out.
pub async fn resolve_records(
    client: &BggClient,
    ids: &[String],
    inventory: &[RawCollectionEntry],
    batch_size: usize,
) -> anyhow::Result<Vec<GameRecord>> {
    let batch_size = batch_size.max(1);
    let mut details = HashMap::new();
    for (batch, chunk) in ids.chunks(batch_size).enumerate() {
        tracing::debug!(batch, ids = chunk.len(), "detail batch");
        let fetched = client
            .fetch_details(chunk)
            .await
            .with_context(|| format!("fetch details (batch {batch})"))?;
        for record in fetched {
            details.entry(record.id.clone()).or_insert(record);
        }
    }

    let entries = inventory
        .iter()
        .map(|entry| (entry.external_id.as_str(), entry))
        .collect::<HashMap<_, _>>();

    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        match details.get(id) {
            Some(detail) => {
                records.push(normalize_record(detail, entries.get(id.as_str()).copied()));
            }
            None => tracing::warn!(id = %id, "catalog returned no detail; skipping"),
        }
    }
    tracing::info!(requested = ids.len(), resolved = records.len(), "records resolved");
    Ok(records)
}

pub async fn run(args: PrintArgs) -> anyhow::Result<PrintOutcome> {
    let layout = layout_config(&args.layout)?;
    let engine = ImpositionEngine::new(layout.clone()).context("layout config")?;
    let config = service_config(&args.service)?;
    let client = BggClient::new(config.clone())?;

    let (ids, inventory) = match args.username.as_deref() {
        Some(username) => {
            match client
                .fetch_collection(username, args.force)
                .await
                .context("fetch collection")?
            {
                CollectionOutcome::Pending { message } => {
                    return Ok(PrintOutcome::Pending { message });
                }
                CollectionOutcome::Ready { items, .. } => {
                    let ids = items
                        .iter()
                        .map(|entry| entry.external_id.clone())
                        .collect::<Vec<_>>();
                    (ids, items)
                }
            }
        }
        None => (args.ids.clone(), Vec::new()),
    };

    let ids = normalize_ids(&ids);
    if ids.is_empty() {
        anyhow::bail!("nothing to print: no ids");
    }

    let mut records = resolve_records(&client, &ids, &inventory, args.batch_size).await?;
    let cache = Arc::new(description_cache(&client, &config, &args.cache)?);
    description::enrich(&mut records, cache, args.concurrency).await;

    let sheets = engine.layout(&records);
    tracing::info!(records = records.len(), sheets = sheets.len(), format = ?args.format, "print");

    let bytes = match args.format {
        PrintFormat::Json => serde_json::to_vec_pretty(&sheets).context("serialize sheets")?,
        PrintFormat::Html => markup::render_sheets(&sheets, &layout).into_bytes(),
        PrintFormat::Pdf => {
            let pool = RendererPool::command(
                args.renderer.into(),
                args.renderer_bin.as_deref().map(PathBuf::from),
                args.renderers,
                Duration::from_secs(args.render_timeout_secs),
            )?;
            let html = markup::render_sheets(&sheets, &layout);
            pool.render(&RenderSource::Markup(html), PageDimensions::from(&layout))
                .await
                .context("render document")?
        }
    };

    let path = PathBuf::from(&args.out);
    write_file(&path, &bytes)?;
    Ok(PrintOutcome::Written {
        path,
        records: records.len(),
        sheets: sheets.len(),
    })
}

pub async fn collection(args: CollectionArgs) -> anyhow::Result<CollectionOutcome> {
    let client = BggClient::new(service_config(&args.service)?)?;
    let outcome = client
        .fetch_collection(&args.username, args.force)
        .await
        .context("fetch collection")?;
    if !outcome.is_pending() {
        let json = serde_json::to_vec_pretty(&outcome).context("serialize collection")?;
        write_output(args.out.as_deref(), &json)?;
    }
    Ok(outcome)
}

pub async fn details(args: DetailsArgs) -> anyhow::Result<()> {
    let config = service_config(&args.service)?;
    let client = BggClient::new(config.clone())?;
    let ids = normalize_ids(&args.ids);
    if ids.is_empty() {
        anyhow::bail!("no ids given");
    }

    let mut records = resolve_records(&client, &ids, &[], args.batch_size).await?;
    if args.describe {
        let cache = Arc::new(description_cache(&client, &config, &args.cache)?);
        description::enrich(&mut records, cache, args.concurrency).await;
    }

    let json = serde_json::to_vec_pretty(&records).context("serialize records")?;
    write_output(args.out.as_deref(), &json)
}

pub async fn describe(args: DescribeArgs) -> anyhow::Result<()> {
    let config = service_config(&args.service)?;
    let client = BggClient::new(config.clone())?;
    let cache = description_cache(&client, &config, &CacheArgs::default())?;

    let id = args.id.trim();
    let description = cache
        .get_or_fetch(id)
        .await
        .with_context(|| format!("no description found for {id}"))?;
    println!("{description}");
    Ok(())
}

pub fn layout(args: LayoutArgs) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.records)
        .with_context(|| format!("read records: {}", args.records))?;
    let records: Vec<GameRecord> =
        serde_json::from_str(&json).with_context(|| format!("parse records: {}", args.records))?;

    let config = layout_config(&args.layout)?;
    let engine = ImpositionEngine::new(config.clone()).context("layout config")?;
    let sheets = engine.layout(&records);

    let bytes = match args.format {
        LayoutFormat::Json => serde_json::to_vec_pretty(&sheets).context("serialize sheets")?,
        LayoutFormat::Html => markup::render_sheets(&sheets, &config).into_bytes(),
    };
    write_file(Path::new(&args.out), &bytes)?;
    tracing::info!(records = records.len(), sheets = sheets.len(), out = %args.out, "layout written");
    Ok(())
}

/// Layout YAML (or defaults) with the bleed flags applied on top.
pub fn layout_config(options: &LayoutOptions) -> anyhow::Result<LayoutConfig> {
    let mut config = match options.layout.as_deref() {
        Some(path) => load_layout_config(Path::new(path))?,
        None => LayoutConfig::default(),
    };
    if options.no_bleed {
        config.mode = LayoutMode::NoBleed;
    }
    if let Some(bleed_mm) = options.bleed_mm {
        config.bleed_mm = bleed_mm;
    }
    Ok(config)
}

fn service_config(service: &ServiceArgs) -> anyhow::Result<BggConfig> {
    BggConfig::from_env()?.with_overrides(service.api_base.as_deref(), service.site_base.as_deref())
}

fn description_cache(
    client: &BggClient,
    config: &BggConfig,
    cache: &CacheArgs,
) -> anyhow::Result<DescriptionCache> {
    let cache_config = CacheConfig::new(cache.cache_capacity, cache.cache_ttl_days)?;
    DescriptionCache::new(client.http().clone(), config.site_base.clone(), cache_config)
}

fn write_output(out: Option<&str>, bytes: &[u8]) -> anyhow::Result<()> {
    match out {
        Some(path) => write_file(Path::new(path), bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("write stdout")?;
            stdout.write_all(b"\n").context("write stdout")?;
            Ok(())
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write output: {}", path.display()))
}
