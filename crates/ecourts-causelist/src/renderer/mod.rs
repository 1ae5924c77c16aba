//! Renderer abstraction for driving the cause-list form in a browser.
//!
//! Defines the `BrowserLauncher`, `Renderer` and `RenderContext` traits that abstract
//! over the browser engine (Chromium via chromiumoxide in production, scripted
//! pages in tests).

pub mod chromium;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Snapshot of the results page, taken before the browser is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL the page was rendered at; relative links resolve against it.
    pub url: String,
    /// Full document HTML.
    pub html: String,
}

/// How to start the browser for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Explicit browser binary; discovered when `None`.
    pub chromium_path: Option<PathBuf>,
}

/// A condition the driver polls for before acting on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The element exists, is enabled and rendered. For a select, `option`
    /// additionally requires an option with that value to be present.
    Interactive {
        element_id: String,
        option: Option<String>,
    },
    /// At least one element with this tag name is in the document.
    Present { tag: String },
}

impl Probe {
    pub fn interactive(element_id: &str) -> Self {
        Probe::Interactive {
            element_id: element_id.to_string(),
            option: None,
        }
    }

    pub fn option(element_id: &str, value: &str) -> Self {
        Probe::Interactive {
            element_id: element_id.to_string(),
            option: Some(value.to_string()),
        }
    }

    pub fn present(tag: &str) -> Self {
        Probe::Present {
            tag: tag.to_string(),
        }
    }

    /// Human-readable description for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Probe::Interactive {
                element_id,
                option: Some(value),
            } => format!("#{element_id} with option '{value}'"),
            Probe::Interactive {
                element_id,
                option: None,
            } => format!("#{element_id}"),
            Probe::Present { tag } => format!("<{tag}>"),
        }
    }
}

/// Starts a browser engine. One launch per fetch; nothing is reused across runs.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Renderer>>;
}

/// A running browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&mut self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) holding the form.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Evaluate a readiness probe once.
    async fn probe(&self, probe: &Probe) -> Result<bool>;
    /// Choose `value` in the select `element_id` and notify the page of the change.
    async fn select_option(&mut self, element_id: &str, value: &str) -> Result<()>;
    /// Remove any value from the input `element_id`.
    async fn clear(&mut self, element_id: &str) -> Result<()>;
    /// Write `text` into the input `element_id`.
    async fn type_text(&mut self, element_id: &str, text: &str) -> Result<()>;
    /// Click the element `element_id`.
    async fn click(&mut self, element_id: &str) -> Result<()>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
