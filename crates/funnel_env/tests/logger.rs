#![allow(clippy::unwrap_used)]

use funnel_env::TelemetryGuard;

fn logger() -> &'static TelemetryGuard {
    use once_cell::sync::OnceCell;

    static INSTANCE: OnceCell<TelemetryGuard> = OnceCell::new();
    INSTANCE.get_or_init(|| {
        let config = funnel_env::Config::new().unwrap();

        funnel_env::setup(&config.log, "funnel_env_test", vec!["funnel_env"])
    })
}

#[tokio::test]
async fn basic() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    logger();

    funnel_env::logger::info!(answer = 13, "logging subsystem smoke event");

    Ok(())
}
