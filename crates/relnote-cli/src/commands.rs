//! Command handlers.

use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use relnote_core::{
    upload_media, Category, ReleaseDraft, ReleaseFilter, ReleaseRepository, ReleaseStore,
    SaveOutcome,
};
use relnote_db::{log_pool_metrics, Database, FilesystemBlobStorage, PoolConfig};

use crate::{date_filter, Cli, Commands};

#[derive(Serialize)]
struct SaveReport<'a> {
    release_id: uuid::Uuid,
    created: bool,
    release: Option<&'a relnote_core::Release>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(cli: &Cli) -> Result<Database> {
    let Some(url) = cli.database_url.as_deref() else {
        bail!("DATABASE_URL is not set (use --database-url or the environment)");
    };
    let config = PoolConfig::from_env()?;
    let db = Database::connect_with_config(url, config)
        .await
        .context("connecting to database")?;
    db.migrate().await.context("running migrations")?;
    log_pool_metrics(db.pool());
    Ok(db)
}

fn read_draft(path: &Path) -> Result<ReleaseDraft> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading draft {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing draft {}", path.display()))
}

/// Await `fut`, giving up after `timeout`.
async fn within<T>(timeout: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                subsystem = "cli",
                timeout_secs = timeout.as_secs_f64(),
                "Command timed out"
            );
            Err(anyhow!(
                "timed out after {:?}; writes may be partial, rerun the same command",
                timeout
            ))
        }
    }
}

/// Save a draft, then write it back to `write_back` if given.
///
/// The write-back happens whether the save succeeded, failed or timed out:
/// the draft already carries every id stored so far, so rerunning with the
/// written file updates those rows instead of inserting new ones.
async fn save_draft(
    repo: &ReleaseRepository,
    draft: &mut ReleaseDraft,
    write_back: Option<&Path>,
    timeout: Duration,
) -> Result<SaveOutcome> {
    let result = within(timeout, async { Ok(repo.save(draft).await?) }).await;

    if let Some(path) = write_back {
        let json = serde_json::to_string_pretty(&*draft)?;
        std::fs::write(path, json).with_context(|| format!("writing draft {}", path.display()))?;
    }
    result
}

/// Run one parsed command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let timeout = Duration::from_secs(cli.timeout_secs);

    if let Commands::Save { draft, write_back } = &cli.command {
        let mut release_draft = read_draft(draft)?;
        let db = within(timeout, connect(&cli)).await?;
        let repo = db.repository(cli.strategy);
        let target = (*write_back && draft != Path::new("-")).then_some(draft.as_path());

        let outcome = save_draft(&repo, &mut release_draft, target, timeout).await?;
        info!(
            subsystem = "cli",
            op = "save",
            release_id = %outcome.release_id,
            created = outcome.created,
            "Release saved"
        );
        return print_json(&SaveReport {
            release_id: outcome.release_id,
            created: outcome.created,
            release: outcome.release(),
        });
    }

    within(timeout, run_query(&cli)).await
}

async fn run_query(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::List {
            category,
            date,
            from,
            to,
            sort,
        } => {
            let db = connect(cli).await?;
            let repo = db.repository(cli.strategy);
            let mut filter = ReleaseFilter::new()
                .date(date_filter(*date, *from, *to))
                .sort((*sort).into());
            if let Some(category) = category {
                filter = filter.category(Category::from(category.as_str()));
            }
            let releases = filter.apply(repo.fetch_all().await?, Utc::now());
            print_json(&releases)
        }

        Commands::Show { id } => {
            let db = connect(cli).await?;
            let release = db.repository(cli.strategy).fetch(*id).await?;
            print_json(&release)
        }

        Commands::Delete { id } => {
            let db = connect(cli).await?;
            db.repository(cli.strategy).delete(*id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }

        Commands::Upload {
            file,
            media_type,
            storage_path,
            public_url,
        } => {
            let storage = FilesystemBlobStorage::new(storage_path, public_url.as_str());
            storage
                .validate()
                .await
                .map_err(|e| anyhow!("blob storage unusable: {}", e))?;

            let data = tokio::fs::read(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload");
            let media = upload_media(&storage, file_name, &data, *media_type).await?;
            print_json(&media)
        }

        Commands::Tags => {
            let db = connect(cli).await?;
            let tags = db.releases.list_tags().await?;
            print_json(&tags)
        }

        Commands::Save { .. } => bail!("save is not a query command"),
    }
}
