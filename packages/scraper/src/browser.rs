//! Browser automation behind a small async trait.
//!
//! [`WebDriverBrowser`] drives a real Chrome through a running chromedriver;
//! tests substitute a scripted fake.

use std::time::Duration;

use dengue_map_config::RefreshConfig;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use crate::RefreshError;

/// The handful of browser operations a dataset refresh needs.
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    /// Navigates the current tab to `url`.
    async fn open(&self, url: &str) -> Result<(), RefreshError>;

    /// Waits up to `timeout` for an element whose `title` attribute equals
    /// `title`, scrolls it into view and clicks it.
    ///
    /// Returns `Ok(false)` when the element did not show up or could not be
    /// clicked.
    async fn find_and_click_title(
        &self,
        title: &str,
        timeout: Duration,
    ) -> Result<bool, RefreshError>;

    /// Scrolls the page vertically by `pixels`.
    async fn scroll_by(&self, pixels: i64) -> Result<(), RefreshError>;

    /// Waits up to `timeout` for a link with exactly `text` and clicks it.
    async fn click_link_text(&self, text: &str, timeout: Duration) -> Result<(), RefreshError>;

    /// Focuses the most recently opened window or tab.
    async fn switch_to_newest_window(&self) -> Result<(), RefreshError>;

    async fn current_url(&self) -> Result<String, RefreshError>;

    /// Ends the browser session.
    async fn quit(&self) -> Result<(), RefreshError>;
}

fn command(e: CmdError) -> RefreshError {
    RefreshError::Command {
        message: e.to_string(),
    }
}

/// CSS selector matching elements by their `title` attribute.
fn title_selector(title: &str) -> String {
    format!(
        "[title=\"{}\"]",
        title.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

/// Chrome driven over the `WebDriver` protocol.
pub struct WebDriverBrowser {
    client: Client,
    scroll_delay: Duration,
}

impl WebDriverBrowser {
    /// Starts a new Chrome session on the chromedriver at
    /// `config.webdriver_url`.
    ///
    /// # Errors
    ///
    /// * If chromedriver is unreachable or refuses the session
    pub async fn connect(config: &RefreshConfig) -> Result<Self, RefreshError> {
        let mut args = vec!["--disable-gpu", "--window-size=1280,1024"];
        if config.headless {
            args.push("--headless=new");
        }
        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        log::info!("Connecting to chromedriver at {}", config.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| RefreshError::WebDriver {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            scroll_delay: Duration::from_millis(config.scroll_delay_ms),
        })
    }
}

#[async_trait::async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self, url: &str) -> Result<(), RefreshError> {
        log::debug!("Opening {url}");
        self.client.goto(url).await.map_err(command)
    }

    async fn find_and_click_title(
        &self,
        title: &str,
        timeout: Duration,
    ) -> Result<bool, RefreshError> {
        let selector = title_selector(title);
        let element = match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(&selector))
            .await
        {
            Ok(element) => element,
            Err(CmdError::WaitTimeout) => return Ok(false),
            Err(e) => {
                log::debug!("Lookup of {selector} failed: {e}");
                return Ok(false);
            }
        };

        let target = serde_json::to_value(&element).map_err(|e| RefreshError::Command {
            message: e.to_string(),
        })?;
        if let Err(e) = self
            .client
            .execute(
                "arguments[0].scrollIntoView({behavior: 'smooth', block: 'center'});",
                vec![target],
            )
            .await
        {
            log::debug!("scrollIntoView failed for {selector}: {e}");
        }
        tokio::time::sleep(self.scroll_delay).await;

        match element.click().await {
            Ok(()) => Ok(true),
            Err(e) => {
                log::debug!("Click on {selector} failed: {e}");
                Ok(false)
            }
        }
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), RefreshError> {
        self.client
            .execute(&format!("window.scrollBy(0, {pixels});"), vec![])
            .await
            .map_err(command)?;
        Ok(())
    }

    async fn click_link_text(&self, text: &str, timeout: Duration) -> Result<(), RefreshError> {
        let link = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::LinkText(text))
            .await
            .map_err(command)?;
        link.click().await.map_err(command)
    }

    async fn switch_to_newest_window(&self) -> Result<(), RefreshError> {
        let windows = self.client.windows().await.map_err(command)?;
        let newest = windows
            .last()
            .cloned()
            .ok_or_else(|| RefreshError::Command {
                message: "browser has no open windows".to_string(),
            })?;
        self.client.switch_to_window(newest).await.map_err(command)
    }

    async fn current_url(&self) -> Result<String, RefreshError> {
        let url = self.client.current_url().await.map_err(command)?;
        Ok(url.to_string())
    }

    async fn quit(&self) -> Result<(), RefreshError> {
        self.client.clone().close().await.map_err(command)
    }
}
