#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Refreshes the dengue datasets published on the Tainan open-data portal.
//!
//! The portal only exposes the JSON export behind a dataset page, so the
//! refresher drives a browser: it finds the dataset entry by title, opens the
//! `JSON` export in a new tab and downloads whatever URL that tab lands on.
//! [`refresh_direct`] skips the browser for endpoints that are known up
//! front.

pub mod browser;
pub mod progress;

use std::path::{Path, PathBuf};
use std::time::Duration;

use dengue_map_config::{Config, DatasetConfig, RefreshConfig, ensure_parent_dir};

pub use browser::{Browser, WebDriverBrowser};
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Link text of the portal's JSON export.
pub const JSON_EXPORT_LINK: &str = "JSON";

/// Errors that can occur while refreshing datasets.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// A browser session could not be started.
    #[error("WebDriver session error: {message}")]
    WebDriver { message: String },

    /// A browser command failed.
    #[error("WebDriver command failed: {message}")]
    Command { message: String },

    /// Downloading the export failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing a local file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The dataset entry was not found on the portal page.
    #[error("dataset \"{title}\" not found after {attempts} attempts")]
    DatasetNotFound { title: String, attempts: u32 },
}

impl RefreshError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How hard to look for a dataset entry before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// How long each lookup waits for the entry to appear.
    pub wait_timeout: Duration,
    /// Pause after each scroll.
    pub scroll_delay: Duration,
    pub scroll_step_px: i64,
}

impl From<&RefreshConfig> for RetryPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
            scroll_delay: Duration::from_millis(config.scroll_delay_ms),
            scroll_step_px: config.scroll_step_px,
        }
    }
}

/// Result of [`locate_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    /// The entry was clicked on attempt number `attempts`.
    Found { attempts: u32 },
    RetriesExhausted { attempts: u32 },
}

/// Looks for the dataset entry titled `title` and clicks it, scrolling down
/// the page between attempts.
///
/// # Errors
///
/// * If a browser command other than the lookup itself fails
pub async fn locate_dataset(
    browser: &dyn Browser,
    title: &str,
    policy: &RetryPolicy,
) -> Result<LocateOutcome, RefreshError> {
    for attempt in 1..=policy.max_retries {
        if browser
            .find_and_click_title(title, policy.wait_timeout)
            .await?
        {
            log::debug!("Clicked \"{title}\" on attempt {attempt}");
            return Ok(LocateOutcome::Found { attempts: attempt });
        }

        log::warn!(
            "\"{title}\" not found, scrolling (retry {attempt}/{})",
            policy.max_retries
        );
        browser.scroll_by(policy.scroll_step_px).await?;
        tokio::time::sleep(policy.scroll_delay).await;
    }

    Ok(LocateOutcome::RetriesExhausted {
        attempts: policy.max_retries,
    })
}

/// Downloads `url` and overwrites `path` with the raw response body.
async fn download(http: &reqwest::Client, url: &str, path: &Path) -> Result<u64, RefreshError> {
    log::info!("Downloading {url}");
    let body = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    ensure_parent_dir(path).map_err(|e| RefreshError::io(path, e))?;
    tokio::fs::write(path, &body)
        .await
        .map_err(|e| RefreshError::io(path, e))?;

    log::info!("Saved {} bytes to {}", body.len(), path.display());
    Ok(body.len() as u64)
}

/// Refreshes one dataset through the portal page and returns the path it
/// was written to.
///
/// # Errors
///
/// * If the entry cannot be found and `refresh.proceed_on_exhausted` is off
/// * If a browser command fails
/// * If the export download or the file write fails
pub async fn refresh_dataset(
    browser: &dyn Browser,
    http: &reqwest::Client,
    dataset: &DatasetConfig,
    config: &Config,
) -> Result<PathBuf, RefreshError> {
    let refresh = &config.refresh;
    let policy = RetryPolicy::from(refresh);

    browser.open(&refresh.portal_url).await?;

    match locate_dataset(browser, &dataset.title, &policy).await? {
        LocateOutcome::Found { attempts } => {
            log::info!("Found \"{}\" after {attempts} attempt(s)", dataset.title);
        }
        LocateOutcome::RetriesExhausted { attempts } => {
            if !refresh.proceed_on_exhausted {
                return Err(RefreshError::DatasetNotFound {
                    title: dataset.title.clone(),
                    attempts,
                });
            }
            log::warn!(
                "\"{}\" not found after {attempts} attempts, trying the export link anyway",
                dataset.title
            );
        }
    }

    browser
        .click_link_text(JSON_EXPORT_LINK, policy.wait_timeout)
        .await?;
    browser.switch_to_newest_window().await?;
    let url = browser.current_url().await?;

    let path = config.paths.data_file(&dataset.file);
    download(http, &url, &path).await?;
    Ok(path)
}

/// Refreshes every configured dataset in order, then ends the browser
/// session whether or not the refresh succeeded.
///
/// # Errors
///
/// * If any dataset refresh fails; later datasets are skipped
pub async fn refresh_all(
    browser: &dyn Browser,
    http: &reqwest::Client,
    config: &Config,
    progress: &dyn ProgressCallback,
) -> Result<Vec<PathBuf>, RefreshError> {
    let datasets = &config.refresh.datasets;
    progress.set_total(datasets.len() as u64);

    let mut written = Vec::with_capacity(datasets.len());
    let mut result = Ok(());
    for dataset in datasets {
        progress.set_message(dataset.title.clone());
        match refresh_dataset(browser, http, dataset, config).await {
            Ok(path) => {
                written.push(path);
                progress.inc(1);
            }
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    if let Err(e) = browser.quit().await {
        log::warn!("Failed to close the browser session: {e}");
    }

    match result {
        Ok(()) => {
            progress.finish(format!("Refreshed {} dataset(s)", written.len()));
            Ok(written)
        }
        Err(e) => {
            progress.finish(format!("Refresh failed: {e}"));
            Err(e)
        }
    }
}

/// Downloads `url` straight into `path` without a browser.
///
/// # Errors
///
/// * If the request fails or returns an error status
/// * If the file cannot be written
pub async fn refresh_direct(
    http: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<u64, RefreshError> {
    download(http, url, path).await
}

/// Removes the plain files directly inside `dir`, leaving subdirectories
/// alone. Returns how many files were removed; a missing directory counts
/// as empty.
///
/// # Errors
///
/// * If the directory cannot be listed or a file cannot be removed
pub fn purge_data_dir(dir: &Path) -> Result<usize, RefreshError> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(|e| RefreshError::io(dir, e))? {
        let entry = entry.map_err(|e| RefreshError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            std::fs::remove_file(&path).map_err(|e| RefreshError::io(&path, e))?;
            log::debug!("Removed {}", path.display());
            removed += 1;
        }
    }

    log::info!("Purged {removed} file(s) from {}", dir.display());
    Ok(removed)
}
