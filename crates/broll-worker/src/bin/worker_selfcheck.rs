use std::path::Path;

use broll_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    ensure_dir(&config.work_dir).await?;
    ensure_dir(&config.artifact_dir).await?;
    ensure_media_tools()?;
    ensure_provider(&config)?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_media_tools() -> anyhow::Result<()> {
    let ffmpeg = broll_media::check_ffmpeg()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    let ffprobe = broll_media::check_ffprobe()
        .map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    println!(
        "worker-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

fn ensure_provider(config: &WorkerConfig) -> anyhow::Result<()> {
    if !config.has_any_provider() {
        return Err(anyhow::anyhow!(
            "missing footage credentials: set PEXELS_API_KEY or PIXABAY_API_KEY"
        ));
    }
    Ok(())
}
