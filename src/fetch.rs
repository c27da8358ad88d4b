//! Rendered-page retrieval through a headless Chrome session.
//!
//! The session is created lazily on the first fetch and reused for the whole
//! run; each attempt opens its own short-lived tab so no page state leaks
//! between attempts. Navigation failures and non-200 statuses are retried
//! with exponential backoff and jitter, and a politeness delay precedes the
//! first attempt of every URL.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::Rng;
use tracing::{debug, warn};

use crate::record::PageSnapshot;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Fixed pause after load so deferred script-rendered content settles.
const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Chrome kills itself after this long without CDP traffic; politeness and
/// backoff delays between fetches must fit underneath it.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The seam between the orchestrator and the network. `fetch` never errors:
/// an unreachable page comes back as a snapshot with status 0.
pub trait Fetcher {
    fn fetch(&mut self, url: &str) -> PageSnapshot;

    /// Release underlying resources. Idempotent; default no-op for fetchers
    /// that hold none.
    fn close(&mut self) {}
}

enum SessionState {
    Uninitialized,
    Ready(Browser),
    Closed,
}

/// Exclusively-owned browser lifecycle: `Uninitialized → Ready` on first use,
/// `→ Closed` on explicit shutdown. A failed launch lands back in
/// `Uninitialized` so the next fetch rebuilds from scratch instead of reusing
/// a half-initialized process.
pub struct BrowserSession {
    state: SessionState,
}

impl BrowserSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
        }
    }

    /// Idempotent: a no-op when the browser is already up.
    fn ensure_ready(&mut self) -> Result<&Browser> {
        if matches!(self.state, SessionState::Closed) {
            return Err(anyhow!("browser session already closed"));
        }
        if matches!(self.state, SessionState::Uninitialized) {
            match launch_browser() {
                Ok(browser) => {
                    debug!("browser session ready");
                    self.state = SessionState::Ready(browser);
                }
                Err(e) => {
                    // Whatever was partially constructed is dropped with the
                    // error; the session stays reusable.
                    self.state = SessionState::Uninitialized;
                    return Err(e);
                }
            }
        }
        match &self.state {
            SessionState::Ready(browser) => Ok(browser),
            _ => unreachable!("session transitioned to Ready above"),
        }
    }

    /// Terminal for the run. Dropping the `Browser` kills the Chrome process
    /// and every tab it owns.
    pub fn close(&mut self) {
        if matches!(self.state, SessionState::Ready(_)) {
            debug!("closing browser session");
        }
        self.state = SessionState::Closed;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }
}

impl Default for BrowserSession {
    fn default() -> Self {
        Self::new()
    }
}

fn launch_browser() -> Result<Browser> {
    let is_container = std::env::var("YANZHAO_CHECKER_CONTAINER").is_ok()
        || Path::new("/.dockerenv").exists();

    let mut builder = LaunchOptions::default_builder();
    builder
        .headless(true)
        .window_size(Some((1920, 1080)))
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .args(vec![OsStr::new("--disable-blink-features=AutomationControlled")]);
    if is_container {
        builder.sandbox(false);
    }

    let options = builder
        .build()
        .map_err(|e| anyhow!("Failed to build Chrome launch options: {}", e))?;
    Browser::new(options).map_err(|e| anyhow!("Failed to launch headless Chrome: {}", e))
}

/// Browser-backed [`Fetcher`] with retry and backoff.
pub struct BrowserFetcher {
    session: BrowserSession,
    max_retries: u32,
}

impl BrowserFetcher {
    pub fn new(max_retries: u32) -> Self {
        Self {
            session: BrowserSession::new(),
            max_retries,
        }
    }

    /// One attempt: open a tab, navigate, capture, and always close the tab
    /// again, whether the attempt succeeded, errored or timed out.
    fn navigate_once(&mut self, url: &str) -> Result<PageSnapshot> {
        let browser = self.session.ensure_ready()?;
        let tab = browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create tab: {}", e))?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);

        let result = navigate_and_capture(&tab, url);

        if let Err(e) = tab.close(true) {
            debug!("failed to close tab for {}: {}", url, e);
        }
        result
    }
}

impl Fetcher for BrowserFetcher {
    fn fetch(&mut self, url: &str) -> PageSnapshot {
        fetch_with_retries(url, self.max_retries, |u| self.navigate_once(u), thread::sleep)
    }

    fn close(&mut self) {
        self.session.close();
    }
}

fn navigate_and_capture(tab: &Arc<Tab>, url: &str) -> Result<PageSnapshot> {
    tab.set_user_agent(USER_AGENT, None, None)
        .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

    // Capture the status of the main document response. The document loads
    // before any frame or XHR, so the first HTML response is the page
    // itself; redirects only surface their final response here.
    let status: Arc<Mutex<Option<u16>>> = Arc::new(Mutex::new(None));
    let status_slot = status.clone();
    tab.register_response_handling(
        "document-status",
        Box::new(move |event_params, _fetch_body| {
            let response = &event_params.response;
            if response.mime_type.contains("html") {
                if let Ok(mut slot) = status_slot.lock() {
                    if slot.is_none() {
                        *slot = Some(response.status as u16);
                    }
                }
            }
        }),
    )
    .map_err(|e| anyhow!("Failed to register response handler: {}", e))?;

    let navigation = (|| -> Result<()> {
        tab.navigate_to(url)
            .map_err(|e| anyhow!("Navigation failed: {}", e))?;
        tab.wait_until_navigated()
            .map_err(|e| anyhow!("Page load failed: {}", e))?;
        thread::sleep(SETTLE_DELAY);
        Ok(())
    })();

    let _ = tab.deregister_response_handling("document-status");
    navigation?;

    let final_url = tab.get_url();
    let html = tab
        .get_content()
        .map_err(|e| anyhow!("Failed to get page content: {}", e))?;
    // No intercepted response means the navigation was served from an
    // in-page route or cache; trust the rendered content.
    let status_code = status.lock().ok().and_then(|mut s| s.take()).unwrap_or(200);

    Ok(PageSnapshot {
        html,
        status_code,
        final_url,
    })
}

/// The retry loop, generic over the navigation and sleep effects so the
/// schedule is testable without a browser. Returns on the first 200 snapshot;
/// exhaustion yields status 0 with the last URL observed.
fn fetch_with_retries<N, S>(url: &str, max_retries: u32, mut navigate: N, mut sleep: S) -> PageSnapshot
where
    N: FnMut(&str) -> Result<PageSnapshot>,
    S: FnMut(Duration),
{
    let mut last_url = url.to_string();

    for attempt in 0..max_retries {
        let delay = attempt_delay(attempt);
        if attempt > 0 {
            debug!(
                "retry {}/{} for {}, waiting {:.1}s",
                attempt + 1,
                max_retries,
                url,
                delay.as_secs_f64()
            );
        }
        sleep(delay);

        match navigate(url) {
            Ok(snapshot) if snapshot.status_code == 200 => return snapshot,
            Ok(snapshot) => {
                warn!(
                    "HTTP {} for {} (attempt {}/{})",
                    snapshot.status_code,
                    url,
                    attempt + 1,
                    max_retries
                );
                last_url = snapshot.final_url;
            }
            Err(e) => {
                warn!("fetch attempt {}/{} failed for {}: {}", attempt + 1, max_retries, url, e);
            }
        }
    }

    PageSnapshot {
        html: String::new(),
        status_code: 0,
        final_url: last_url,
    }
}

/// Politeness delay drawn from [2, 5] seconds before the first attempt,
/// `2^i` plus up to two seconds of jitter before retry `i`.
fn attempt_delay(attempt: u32) -> Duration {
    let mut rng = rand::thread_rng();
    let secs = if attempt == 0 {
        rng.gen_range(2.0..=5.0)
    } else {
        f64::from(2u32.pow(attempt)) + rng.gen_range(0.0..2.0)
    };
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn snapshot(status_code: u16, url: &str) -> PageSnapshot {
        PageSnapshot {
            html: if status_code == 200 {
                "<html></html>".to_string()
            } else {
                String::new()
            },
            status_code,
            final_url: url.to_string(),
        }
    }

    fn run_scripted(
        url: &str,
        max_retries: u32,
        script: Vec<Result<PageSnapshot>>,
    ) -> (PageSnapshot, usize, Vec<Duration>) {
        let mut script: VecDeque<Result<PageSnapshot>> = script.into();
        let mut attempts = 0usize;
        let mut delays: Vec<Duration> = Vec::new();
        let result = fetch_with_retries(
            url,
            max_retries,
            |_| {
                attempts += 1;
                script.pop_front().unwrap_or_else(|| Err(anyhow!("script exhausted")))
            },
            |d| delays.push(d),
        );
        (result, attempts, delays)
    }

    #[test]
    fn test_first_attempt_success_returns_immediately() {
        let url = "https://yzb.pku.edu.cn";
        let (result, attempts, delays) =
            run_scripted(url, 3, vec![Ok(snapshot(200, url))]);
        assert_eq!(result.status_code, 200);
        assert_eq!(attempts, 1);
        // Only the politeness delay ran.
        assert_eq!(delays.len(), 1);
        assert!(delays[0] >= Duration::from_secs(2) && delays[0] <= Duration::from_secs(5));
    }

    #[test]
    fn test_two_failures_then_success() {
        let url = "https://yz.example.edu.cn";
        let (result, attempts, delays) = run_scripted(
            url,
            3,
            vec![
                Err(anyhow!("timeout")),
                Ok(snapshot(503, url)),
                Ok(snapshot(200, url)),
            ],
        );
        assert_eq!(result.status_code, 200);
        assert_eq!(result.final_url, url);
        assert_eq!(attempts, 3);
        // One politeness delay plus exactly two backoff delays.
        assert_eq!(delays.len(), 3);
        assert!(delays[1] >= Duration::from_secs(2) && delays[1] < Duration::from_secs(4));
        assert!(delays[2] >= Duration::from_secs(4) && delays[2] < Duration::from_secs(6));
    }

    #[test]
    fn test_exhaustion_yields_status_zero_with_last_url() {
        let url = "https://yz.example.edu.cn";
        let redirected = "https://moved.example.edu.cn/404";
        let (result, attempts, _) = run_scripted(
            url,
            3,
            vec![
                Err(anyhow!("dns failure")),
                Ok(snapshot(404, redirected)),
                Err(anyhow!("timeout")),
            ],
        );
        assert_eq!(result.status_code, 0);
        assert!(result.html.is_empty());
        // The 404 attempt observed a URL; later errors do not overwrite it.
        assert_eq!(result.final_url, redirected);
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_exhaustion_without_navigation_keeps_original_url() {
        let url = "https://yz.example.edu.cn";
        let (result, attempts, _) = run_scripted(
            url,
            2,
            vec![Err(anyhow!("refused")), Err(anyhow!("refused"))],
        );
        assert_eq!(result.status_code, 0);
        assert_eq!(result.final_url, url);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_attempt_delay_schedule_bounds() {
        for _ in 0..50 {
            let politeness = attempt_delay(0);
            assert!(politeness >= Duration::from_secs(2) && politeness <= Duration::from_secs(5));

            let first_backoff = attempt_delay(1);
            assert!(first_backoff >= Duration::from_secs(2) && first_backoff < Duration::from_secs(4));

            let second_backoff = attempt_delay(2);
            assert!(second_backoff >= Duration::from_secs(4) && second_backoff < Duration::from_secs(6));
        }
    }

    #[test]
    fn test_closed_session_refuses_to_reinitialize() {
        let mut session = BrowserSession::new();
        assert!(!session.is_ready());
        assert!(!session.is_closed());

        session.close();
        assert!(session.is_closed());
        let err = match session.ensure_ready() {
            Ok(_) => panic!("expected ensure_ready to fail on a closed session"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("already closed"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = BrowserSession::new();
        session.close();
        session.close();
        assert!(session.is_closed());
    }
}
