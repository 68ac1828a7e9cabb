//! Background host
//!
//! Stands in for the extension's background context. Each stdin line is a
//! JSON object: a browser update tagged by `event`
//! (`{"event":"tab_activated","tab_id":1,"window_id":1}`) or a runtime
//! message tagged by `type` (`{"type":"QUESTION_ASKED","site":"claude"}`).

use aimeter_core::dispatcher::{self, DispatcherHandle};
use aimeter_core::{
    today_key, BrowserUpdate, Config, DailyAggregate, DailyStore, InMemoryBrowser, RuntimeMessage,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HostLine {
    Message(RuntimeMessage),
    Browser(BrowserUpdate),
}

/// Run until stdin closes or Ctrl+C
pub async fn run(store: Arc<DailyStore>, config: &Config, follow: bool) -> Result<()> {
    let browser = Arc::new(InMemoryBrowser::new());
    let handle = dispatcher::spawn(browser.clone(), store.clone(), &config.dispatcher);

    let follower = follow.then(|| {
        let changes = store.subscribe();
        tokio::spawn(follow_today(changes, today_key, |record| {
            match serde_json::to_string(record) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize record"),
            }
        }))
    });

    tracing::info!("Background host started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => handle_line(&browser, &handle, &line)?,
                    None => break,
                }
            }
            _ = &mut interrupted => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    if let Some(follower) = follower {
        follower.abort();
    }

    tracing::info!("Background host stopped");
    Ok(())
}

/// Emit every write of the current day; the day is re-read per record so
/// the follower moves on at local midnight.
async fn follow_today<D, E>(
    mut changes: broadcast::Receiver<DailyAggregate>,
    current_day: D,
    mut emit: E,
) where
    D: Fn() -> String,
    E: FnMut(&DailyAggregate),
{
    loop {
        match changes.recv().await {
            Ok(record) if record.date == current_day() => emit(&record),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Follower lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn handle_line(browser: &InMemoryBrowser, handle: &DispatcherHandle, line: &str) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let parsed = match serde_json::from_str::<HostLine>(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, line = %line, "Skipping malformed host line");
            return Ok(());
        }
    };

    match parsed {
        HostLine::Message(message) => handle
            .send_message(message)
            .context("dispatcher stopped")?,
        HostLine::Browser(update) => {
            if let Some(event) = browser.apply(update) {
                handle.send_event(event).context("dispatcher stopped")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimeter_core::{MemoryStore, TrackedSite};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_follower_moves_to_the_new_day() {
        let store = Arc::new(DailyStore::new(Arc::new(MemoryStore::new())));
        let day = Arc::new(Mutex::new("2025-06-14".to_string()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let follower = tokio::spawn(follow_today(
            store.subscribe(),
            {
                let day = day.clone();
                move || day.lock().unwrap().clone()
            },
            {
                let seen = seen.clone();
                move |record: &DailyAggregate| {
                    let usage = record.site(TrackedSite::Claude);
                    seen.lock().unwrap().push((record.date.clone(), usage.time));
                }
            },
        ));

        store
            .increment_time("2025-06-14", TrackedSite::Claude, 1)
            .unwrap();
        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
        *day.lock().unwrap() = "2025-06-15".to_string();
        store
            .increment_time("2025-06-14", TrackedSite::Claude, 1)
            .unwrap();
        store
            .increment_time("2025-06-15", TrackedSite::Claude, 1)
            .unwrap();

        drop(store);
        follower.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("2025-06-14".to_string(), 0),
                ("2025-06-14".to_string(), 1),
                ("2025-06-15".to_string(), 0),
                ("2025-06-15".to_string(), 1),
            ]
        );
    }
}
