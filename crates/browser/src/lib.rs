use headless_chrome::Browser as ChromeBrowser;
use headless_chrome::{LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),
    #[error("Navigation error: {0}")]
    NavigationError(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("Browser error: {0}")]
    BrowserError(#[from] anyhow::Error),
}

/// The DOM-level capabilities the crawler needs from a live page.
pub trait PageSession {
    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Blocks until `selector` matches an element or `timeout` elapses.
    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    fn scroll_by(&self, pixels: u32) -> Result<(), BrowserError>;

    fn page_content(&self) -> Result<String, BrowserError>;
}

#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub headless: bool,
    pub user_agent: String,
    pub window_size: (u32, u32),
}

impl LaunchSettings {
    pub fn new(user_agent: impl Into<String>, headless: bool) -> Self {
        Self {
            headless,
            user_agent: user_agent.into(),
            window_size: (1920, 1080),
        }
    }

    fn extra_args(&self) -> Vec<String> {
        vec![
            format!("--user-agent={}", self.user_agent),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ]
    }
}

/// One browser process with a single tab, reused for the whole run.
///
/// The process is released exactly once: by [`BrowserSession::close`] or,
/// failing that, when the session is dropped.
pub struct BrowserSession {
    browser: Option<ChromeBrowser>,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(settings: &LaunchSettings) -> Result<Self, BrowserError> {
        let extra_args = settings.extra_args();
        let launch_options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .sandbox(false)
            .window_size(Some(settings.window_size))
            .idle_browser_timeout(Duration::from_secs(300))
            .args(extra_args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let browser = ChromeBrowser::new(launch_options)
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        tab.set_user_agent(&settings.user_agent, None, None)?;
        tab.enable_stealth_mode()?;

        if settings.headless {
            info!("Headless browser launched successfully");
        } else {
            info!("Browser launched successfully");
        }

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(true) {
                warn!("Failed to close browser tab: {}", e);
            }
            drop(browser);
            info!("Browser closed");
        }
    }
}

impl PageSession for BrowserSession {
    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let url = Url::parse(url).map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        debug!("Navigating to: {}", url);

        self.tab
            .navigate_to(url.as_str())
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;

        Ok(())
    }

    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| {
                BrowserError::Timeout(format!(
                    "{} not found within {}s: {}",
                    selector,
                    timeout.as_secs(),
                    e
                ))
            })?;
        Ok(())
    }

    fn scroll_by(&self, pixels: u32) -> Result<(), BrowserError> {
        let script = format!("window.scrollBy(0, {});", pixels);
        self.tab.evaluate(&script, false)?;
        Ok(())
    }

    fn page_content(&self) -> Result<String, BrowserError> {
        let content = self.tab.get_content()?;
        Ok(content)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_settings_defaults() {
        let settings = LaunchSettings::new("agent/1.0", true);
        assert!(settings.headless);
        assert_eq!(settings.window_size, (1920, 1080));
    }

    #[test]
    fn test_extra_args_hide_automation() {
        let args = LaunchSettings::new("agent/1.0", false).extra_args();
        assert!(args.contains(&"--user-agent=agent/1.0".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
    }
}
