use anyhow::{Context, Result};
use providers::paperless::{PaperlessClient, PaperlessConfig};
use providers::DocumentService;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uploader_core::config::{self, AppConfig};
use uploader_core::pipeline::{Pipeline, PipelineConfig};
use uploader_core::service::UploaderService;
use uploader_core::tags;

/// Everything resolved once at startup and shared by the commands.
pub struct Bootstrap {
    pub cfg: AppConfig,
    pub client: Arc<PaperlessClient>,
    pub tag_ids: Vec<i64>,
}

/// Builds the client and resolves configured tag names to ids.
pub async fn bootstrap(cfg: AppConfig) -> Result<Bootstrap> {
    info!(
        url = %cfg.paperless_url,
        api_key = %cfg.masked_api_key(),
        watch_folder = %cfg.watch_folder.display(),
        post_upload_action = ?cfg.post_upload_action,
        processed_folder = %cfg.processed_folder.display(),
        tags = ?cfg.tags,
        "loaded configuration"
    );
    let client = PaperlessClient::new(PaperlessConfig::new(&cfg.paperless_url, &cfg.api_key))
        .context("failed to build Paperless client")?;
    let catalog = client
        .fetch_tags()
        .await
        .context("failed to get tags from Paperless")?;
    let resolution = tags::resolve(&catalog, &cfg.tags);
    Ok(Bootstrap {
        cfg,
        client: Arc::new(client),
        tag_ids: resolution.ids,
    })
}

pub async fn upload_one(boot: &Bootstrap, file: &Path) -> Result<()> {
    println!("Uploading {} to Paperless...", file.display());
    boot.client
        .upload(file, &boot.tag_ids)
        .await
        .with_context(|| format!("failed to upload document {}", file.display()))?;
    println!("Document uploaded successfully!");
    Ok(())
}

/// Runs the watch pipeline until Ctrl-C or a fatal pipeline error.
pub async fn watch(boot: Bootstrap) -> Result<()> {
    let pipeline = Pipeline::new(
        boot.client.clone(),
        PipelineConfig::from_app(&boot.cfg, boot.tag_ids.clone()),
    );
    let mut service = UploaderService::start(pipeline);
    let finished = tokio::select! {
        res = service.wait() => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };
    match finished {
        Some(res) => res.context("watch pipeline stopped")?,
        None => {
            info!("interrupt received");
            service.stop().await.context("failed to stop watch pipeline")?;
        }
    }
    Ok(())
}

/// Config file `create-config` writes to.
pub fn example_config_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE))
}

pub fn create_config(path: &Path, force: bool) -> Result<()> {
    let overwritten = config::write_example(path, force)?;
    if overwritten {
        info!(path = %path.display(), "overwrote existing config with example configuration");
    } else {
        info!(path = %path.display(), "created example config; edit it with your details");
    }
    Ok(())
}
