use std::path::Path;

use cobot_media::{ensure_dir, ExternalTool, SubtitleTemplate};
use cobot_worker::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env();

    println!(
        "cobot-selfcheck: starting with upload_dir={}, record_dir={}",
        config.upload_dir.display(),
        config.record_dir.display()
    );
    ensure_writable(&config.upload_dir).await?;
    ensure_writable(&config.record_dir).await?;
    ensure_tool(&config.mediainfo, "--Version").await?;
    ensure_tool(&config.ffmpeg, "-version").await?;
    if let Some(path) = &config.subtitle_template {
        SubtitleTemplate::from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("subtitle template {}: {}", path.display(), e))?;
    }

    println!("cobot-selfcheck: ok");
    Ok(())
}

async fn ensure_writable(path: &Path) -> anyhow::Result<()> {
    ensure_dir(path).await?;
    let scratch = tempfile::Builder::new()
        .prefix(".cobot-selfcheck-")
        .tempfile_in(path)
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", path.display(), e))?;
    drop(scratch);
    Ok(())
}

async fn ensure_tool(tool: &ExternalTool, version_flag: &str) -> anyhow::Result<()> {
    let output = tool
        .run_captured([version_flag], Some(std::time::Duration::from_secs(10)))
        .await
        .map_err(|e| anyhow::anyhow!("{} not available: {}", tool.name(), e))?;

    if !output.success {
        return Err(anyhow::anyhow!(
            "{} {} failed: {:?}",
            tool.name(),
            version_flag,
            output.exit_code
        ));
    }
    println!(
        "cobot-selfcheck: {} -> {}",
        tool.name(),
        output.stdout.lines().next().unwrap_or_default()
    );
    Ok(())
}
