use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(100);

/// Console spinner running on its own task while a blocking call is in flight.
///
/// It shares nothing with the caller except the cancellation token. Dropping
/// the guard stops the animation; [`Spinner::finish`] also waits for the
/// task to clear the bar.
pub struct Spinner {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Animate `label` on stderr.
    pub fn start(label: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::stderr());
        Self::with_bar(label, bar)
    }

    /// Drive an existing bar, e.g. one with a hidden draw target.
    pub fn with_bar(label: impl Into<String>, bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template("{msg} {spinner}") {
            bar.set_style(style.tick_chars("|/-\\ "));
        }
        bar.set_message(label.into());

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => bar.tick(),
                }
            }
            bar.finish_and_clear();
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the animation and wait for the bar to be cleared.
    pub async fn finish(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run `fut` with a spinner shown for exactly its duration.
pub async fn with_spinner<F, T>(enabled: bool, label: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = enabled.then(|| Spinner::start(label));
    let out = fut.await;
    if let Some(spinner) = spinner {
        spinner.finish().await;
    }
    out
}
