use pending_notify::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // The system authority needs to run inside a bundled app
    let center = match UserNotificationCenter::try_new() {
        Ok(center) => center,
        Err(err) => {
            println!("❌ No notification center available: {err}");
            return Ok(());
        }
    };
    let tracker = PermissionTracker::new(std::sync::Arc::new(center));

    println!("🔐 Current permission: {:?}", tracker.current_status().await);

    println!("🔐 Requesting notification permission...");
    match tracker.request_permission().await {
        Ok(granted) => println!("✅ Permission granted: {granted}"),
        Err(err) => {
            println!("❌ Permission request failed: {err:?}");
            return Err(err.into());
        }
    }

    let status = tracker.current_status().await?;
    println!("🎉 Permission is now {status:?}");
    Ok(())
}
