//! site-sync - 静态站点发布
//!
//! 遍历本地构建目录，把每个文件按内容类型与缓存策略上传到 S3，
//! 然后对 CloudFront distribution 发起一次通配失效请求。
//! 任何配置或上传错误都会以非零退出。

use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use tracing::info;

use opskit::config::env::SyncConfig;
use opskit::services::site_sync;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    opskit::logging::init();

    let cfg = SyncConfig::from_env().context("loading sync configuration")?;

    let plan = site_sync::plan_uploads(&cfg.build_dir)
        .with_context(|| format!("planning uploads from {}", cfg.build_dir.display()))?;
    info!(
        build_dir = %cfg.build_dir.display(),
        bucket = %cfg.bucket,
        objects = plan.len(),
        "starting site sync"
    );

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(cfg.region.clone()))
        .load()
        .await;
    let s3 = aws_sdk_s3::Client::new(&shared);

    let uploaded = site_sync::sync_site(&s3, &cfg, &plan).await?;
    info!(uploaded, "upload complete");

    match cfg.distribution_id.as_deref() {
        Some(distribution_id) => {
            let cf = aws_sdk_cloudfront::Client::new(&shared);
            site_sync::invalidate_distribution(&cf, distribution_id).await?;
        }
        None => {
            info!("CLOUDFRONT_DISTRIBUTION_ID not set; skipping invalidation");
        }
    }

    Ok(())
}
