//! Chromium-based renderer using chromiumoxide.

use super::{BrowserLauncher, LaunchOptions, NavigationResult, Probe, RenderContext, Renderer};
use crate::config::CHROMIUM_PATH_ENV;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. ECOURTS_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches a fresh Chromium process per session.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Renderer>> {
        let renderer = ChromiumRenderer::new(options).await?;
        Ok(Box::new(renderer))
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance, headless unless `options.headless` is false.
    pub async fn new(options: &LaunchOptions) -> Result<Self> {
        let chrome_path = match &options.chromium_path {
            Some(path) => path.clone(),
            None => find_chromium().with_context(|| {
                format!("Chromium not found. Install Chrome or set {CHROMIUM_PATH_ENV}.")
            })?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions");
        builder = if options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::debug!(headless = options.headless, "Chromium launched");

        Ok(Self {
            browser,
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&mut self) -> Result<()> {
        let closed = self.browser.close().await.context("failed to close Chromium");
        let _ = self.browser.wait().await;
        self.handler.abort();
        tracing::debug!("Chromium shut down");
        closed.map(|_| ())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn eval_bool(&self, script: &str) -> Result<bool> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value::<bool>()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn act(&self, script: String, what: &str, element_id: &str) -> Result<()> {
        if self.eval_bool(&script).await? {
            Ok(())
        } else {
            bail!("{what} failed: #{element_id} is missing or rejected the value")
        }
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn probe(&self, probe: &Probe) -> Result<bool> {
        self.eval_bool(&probe_script(probe)).await
    }

    async fn select_option(&mut self, element_id: &str, value: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const el = document.getElementById({id});
                const wanted = {value};
                if (!el || !Array.from(el.options || []).some(o => o.value === wanted)) return false;
                el.value = wanted;
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            id = js_string_literal(element_id),
            value = js_string_literal(value),
        );
        self.act(script, "select", element_id).await
    }

    async fn clear(&mut self, element_id: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const el = document.getElementById({id});
                if (!el) return false;
                el.value = '';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            id = js_string_literal(element_id),
        );
        self.act(script, "clear", element_id).await
    }

    async fn type_text(&mut self, element_id: &str, text: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const el = document.getElementById({id});
                if (!el) return false;
                el.focus();
                el.value = {text};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            id = js_string_literal(element_id),
            text = js_string_literal(text),
        );
        self.act(script, "type", element_id).await
    }

    async fn click(&mut self, element_id: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const el = document.getElementById({id});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            id = js_string_literal(element_id),
        );
        self.act(script, "click", element_id).await
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

/// Build the JS expression that evaluates `probe` to a boolean.
fn probe_script(probe: &Probe) -> String {
    match probe {
        Probe::Interactive { element_id, option } => {
            let wanted = option
                .as_deref()
                .map(js_string_literal)
                .unwrap_or_else(|| "null".to_string());
            format!(
                r#"(() => {{
                    const el = document.getElementById({id});
                    if (!el || el.disabled) return false;
                    const style = window.getComputedStyle(el);
                    if (style.display === 'none' || style.visibility === 'hidden') return false;
                    if (el.getClientRects().length === 0) return false;
                    const wanted = {wanted};
                    if (wanted === null) return true;
                    return Array.from(el.options || []).some(o => o.value === wanted);
                }})()"#,
                id = js_string_literal(element_id),
            )
        }
        Probe::Present { tag } => format!(
            "document.getElementsByTagName({}).length > 0",
            js_string_literal(tag)
        ),
    }
}

/// Quote `s` as a single-quoted JavaScript string literal.
///
/// Quotes, backslashes and line breaks are escaped, `<`/`>` are hex-escaped so a
/// value can never close a surrounding script tag, and NUL bytes are dropped.
fn js_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '<' => out.push_str("\\x3c"),
            '>' => out.push_str("\\x3e"),
            '\0' => {}
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}
