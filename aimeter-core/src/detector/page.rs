//! Async driver for one page load

use super::{stabilize, Detector, Page, PageSignal, StabilizePolicy};
use crate::config::DetectorConfig;
use crate::messaging::{notify_question, Notifier};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Detect questions on the page at `url` until `signals` closes.
///
/// Message-list pages are stabilized first; signals that arrive before the
/// known set is seeded are dropped. Submission detections are reported after
/// `notify_delay_ms`. Returns the number of questions detected.
pub async fn run_page(
    url: &str,
    page: Arc<dyn Page>,
    notifier: Arc<dyn Notifier>,
    mut signals: mpsc::UnboundedReceiver<PageSignal>,
    config: DetectorConfig,
) -> usize {
    let Some(mut detector) = Detector::for_url(url, &config) else {
        tracing::debug!(url = %url, "Not a tracked page, detector not started");
        return 0;
    };
    let site = detector.site();
    tracing::info!(site = %site, "Question detector started");

    if let Detector::MessageList(observer) = &mut detector {
        let scheme = observer.scheme();
        let policy = StabilizePolicy::from(&config);
        let stabilizing = stabilize(page.as_ref(), &scheme, &policy);
        tokio::pin!(stabilizing);

        let outcome = loop {
            tokio::select! {
                outcome = &mut stabilizing => break outcome,
                signal = signals.recv() => {
                    if signal.is_none() {
                        tracing::debug!(site = %site, "Page closed before stabilizing");
                        return 0;
                    }
                }
            }
        };

        tracing::debug!(site = %site, attempts = outcome.attempts(), "Message list stabilized");
        observer.seed(outcome.into_seed());
    }

    let mut detected = 0;
    loop {
        let deadline = detector.deadline();
        let found = tokio::select! {
            signal = signals.recv() => match signal {
                Some(signal) => detector.handle(&signal, Instant::now()),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                detector.poll(Instant::now(), page.as_ref())
            }
        };

        for _ in 0..found {
            match &detector {
                Detector::MessageList(_) => notify_question(notifier.as_ref(), site),
                Detector::SubmissionAction(_) => {
                    let notifier = notifier.clone();
                    let delay = config.notify_delay();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        notify_question(notifier.as_ref(), site);
                    });
                }
            }
        }
        detected += found;
    }

    tracing::debug!(site = %site, detected, "Question detector stopped");
    detected
}
