//! Walks through the notification screen flow against the in-memory authority.
//!
//! Run with `RUST_LOG=debug` to watch every refresh.

use std::time::Duration;

use pending_notify::memory::MemoryAuthority;
use pending_notify::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let authority = MemoryAuthority::new();
    let session = NotificationSession::start(authority.clone(), SessionConfig::default())?;

    // The app comes to the foreground
    session.on_phase_change(ScenePhase::Active).await?;
    println!("Permission before asking: {:?}", session.status());

    let status = session.request_permission().await?;
    println!("Permission after asking: {status:?}");
    if let Some(url) = session.settings_url()? {
        println!("Notifications are off, open {url} to turn them on");
        return Ok(());
    }

    // Schedule a few, like tapping the button with different delays
    let mut ids = Vec::new();
    for seconds in [5, 10, 30] {
        ids.push(session.schedule_after(seconds).await?);
    }
    print_pending(&session.pending());

    // Swipe to delete the middle one
    session.cancel(&ids[1]).await?;
    print_pending(&session.pending());

    // Five seconds pass while the app is open, the first one is presented
    let mut updates = session.subscribe_pending();
    authority.advance(Duration::from_secs(6)).await?;
    updates.changed().await?;
    print_pending(&session.pending());

    // Clear everything from the toolbar
    session.clear_all().await?;
    print_pending(&session.pending());

    Ok(())
}

fn print_pending(snapshot: &PendingSnapshot) {
    println!(
        "Pending requests: {} (refresh #{})",
        snapshot.len(),
        snapshot.generation
    );
    for request in &snapshot.requests {
        println!("  {}  {}", request.title, request.identifier);
    }
}
