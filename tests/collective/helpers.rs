use nway::{FabricConfig, LocalFabric};
use std::sync::Arc;
use std::time::Duration;

/// Fabric limits with a short barrier timeout so failing runs end quickly.
pub fn fast_config() -> FabricConfig {
    FabricConfig {
        barrier_timeout: Duration::from_secs(2),
        ..FabricConfig::default()
    }
}

/// Helper: run a collective operation across N in-process ranks concurrently.
/// Returns each rank's output in rank order.
pub async fn run_collective<F, Fut, R>(world_size: u32, config: FabricConfig, f: F) -> Vec<R>
where
    F: Fn(Arc<LocalFabric>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let fabrics = LocalFabric::bootstrap_local(world_size, config).unwrap();
    let fabrics: Vec<Arc<LocalFabric>> = fabrics.into_iter().map(Arc::new).collect();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for fabric in &fabrics {
        let fabric = Arc::clone(fabric);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(fabric).await }));
    }
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(h.await.unwrap());
    }
    out
}
