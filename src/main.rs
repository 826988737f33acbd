/// Entry point of the cgroup observer.
///
/// Configuration is read from `CGROUP_OBSERVER_*` environment variables and logging is
/// controlled through `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the observer can't start, e.g.
/// because no cgroup v1 hierarchy is mounted.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info CGROUP_OBSERVER_OUTPUT=json cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = cgroup_observer::Config::from_env()?;
    cgroup_observer::run(config).await?;
    Ok(())
}
