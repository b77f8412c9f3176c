//! Browser control over the Chrome `DevTools` Protocol.
//!
//! [`BrowserConfig`] is always available so it can live in the harness
//! configuration. The [`ChromiumDriver`] itself needs the `browser` feature,
//! which pulls in chromiumoxide.
//!
//! The driver never asks the browser to match anything: every
//! [`PageDriver::snapshot`] serialises `document.body` into a [`DomSnapshot`]
//! and all matching happens in Rust. Interactions are replayed by child-index
//! path and checked against the expected tag first.

use serde::{Deserialize, Serialize};

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to the chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Extra command-line switches
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            sandbox: true,
            args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Add a command-line switch
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Serialises `document.body` into the [`crate::dom::DomSnapshot`] JSON shape
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const SNAPSHOT_JS: &str = r"(() => {
  const FORM = ['INPUT', 'TEXTAREA', 'SELECT'];
  const walk = (el) => {
    const style = getComputedStyle(el);
    const node = {
      tag: el.tagName.toLowerCase(),
      id: el.id || null,
      classes: Array.from(el.classList),
      attrs: {},
      text: Array.from(el.childNodes).filter((n) => n.nodeType === 3).map((n) => n.textContent).join(' '),
      visible: style.display !== 'none' && style.visibility !== 'hidden'
        && (el === document.body || el.getClientRects().length > 0),
      value: FORM.includes(el.tagName) ? el.value : null,
      validity: FORM.includes(el.tagName) && el.willValidate
        ? { valid: el.validity.valid, valueMissing: el.validity.valueMissing, message: el.validationMessage }
        : null,
      children: Array.from(el.children).map(walk),
    };
    for (const a of el.attributes) {
      if (a.name !== 'id' && a.name !== 'class') node.attrs[a.name] = a.value;
    }
    return node;
  };
  return JSON.stringify({ url: location.href, root: walk(document.body) });
})()";

/// Resolves `path` from `document.body` as `n`, or returns `'stale'`
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn path_script(path: &[usize], tag: &str, body: &str) -> String {
    let path = serde_json::to_string(path).unwrap_or_else(|_| "[]".to_string());
    let tag = serde_json::to_string(tag).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ let n = document.body; for (const i of {path}) {{ n = n && n.children[i]; }} \
         if (!n || n.tagName.toLowerCase() !== {tag}) return 'stale'; {body} }})()"
    )
}

/// Dispatched from a timer so a native dialog opened by the click cannot
/// block the evaluation that triggered it
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const CLICK_BODY: &str = "setTimeout(() => n.click(), 0); return 'ok';";

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn fill_body(value: &str) -> String {
    let value = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "const proto = n instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
         const setter = Object.getOwnPropertyDescriptor(proto, 'value'); \
         if (!setter || !(n instanceof HTMLInputElement || n instanceof HTMLTextAreaElement)) return 'unfillable'; \
         n.focus(); setter.set.call(n, {value}); \
         n.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         n.dispatchEvent(new Event('change', {{ bubbles: true }})); return 'ok';"
    )
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn select_body(value: &str) -> String {
    let value = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "if (!(n instanceof HTMLSelectElement)) return 'unfillable'; \
         const o = Array.from(n.options).find((o) => o.value === {value} || o.text.trim() === {value}); \
         if (!o) return 'nooption'; n.value = o.value; \
         n.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         n.dispatchEvent(new Event('change', {{ bubbles: true }})); return 'ok';"
    )
}

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
mod cdp {
    use super::{fill_body, path_script, select_body, BrowserConfig, CLICK_BODY, SNAPSHOT_JS};
    use crate::dialog::{Dialog, DialogType};
    use crate::dom::DomSnapshot;
    use crate::driver::{ElementTarget, PageDriver};
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
    };
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    const DIALOG_POLL: Duration = Duration::from_millis(20);
    const SNAPSHOT_ATTEMPTS: usize = 3;
    const SNAPSHOT_BACKOFF: Duration = Duration::from_millis(50);

    /// A chromium tab driven over CDP
    #[derive(Debug)]
    pub struct ChromiumDriver {
        browser: tokio::sync::Mutex<Browser>,
        page: Page,
        pending_dialog: Arc<Mutex<Option<Dialog>>>,
        navigation_timeout: Duration,
        handler: JoinHandle<()>,
        dialog_listener: JoinHandle<()>,
    }

    fn page_err(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::page(e.to_string())
    }

    impl ChromiumDriver {
        /// Launch chromium and open a blank tab
        pub async fn launch(config: &BrowserConfig, navigation_timeout: Duration) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .viewport(Viewport {
                    width: config.viewport_width,
                    height: config.viewport_height,
                    ..Viewport::default()
                })
                .args(config.args.clone());
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) = Browser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(page_err)?;
            let pending_dialog = Arc::new(Mutex::new(None));
            let mut dialogs = page
                .event_listener::<EventJavascriptDialogOpening>()
                .await
                .map_err(page_err)?;
            let slot = Arc::clone(&pending_dialog);
            let dialog_listener = tokio::spawn(async move {
                while let Some(event) = dialogs.next().await {
                    let dialog =
                        Dialog::new(DialogType::from_cdp(event.r#type.as_ref()), event.message.clone());
                    tracing::debug!(kind = %dialog.dialog_type(), message = dialog.message(), "native dialog opened");
                    if let Ok(mut slot) = slot.lock() {
                        *slot = Some(dialog);
                    }
                }
            });

            tracing::info!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "chromium launched"
            );
            Ok(Self {
                browser: tokio::sync::Mutex::new(browser),
                page,
                pending_dialog,
                navigation_timeout,
                handler,
                dialog_listener,
            })
        }

        /// Close the browser and stop the event tasks
        pub async fn close(self) -> ProbeResult<()> {
            self.dialog_listener.abort();
            let result = self.browser.lock().await.close().await;
            self.handler.abort();
            result.map(|_| ()).map_err(|e| ProbeError::BrowserLaunch {
                message: e.to_string(),
            })
        }

        async fn eval_string(&self, script: String) -> ProbeResult<String> {
            self.page
                .evaluate(script)
                .await
                .map_err(page_err)?
                .into_value::<String>()
                .map_err(page_err)
        }

        async fn on_target(&self, target: &ElementTarget, body: &str) -> ProbeResult<()> {
            let script = path_script(&target.path.0, &target.tag, body);
            match self.eval_string(script).await?.as_str() {
                "ok" => Ok(()),
                "stale" => Err(ProbeError::StaleElement {
                    target: target.to_string(),
                }),
                "nooption" => Err(ProbeError::page(format!("no matching option in {target}"))),
                other => Err(ProbeError::page(format!("{target}: {other}"))),
            }
        }

        fn take_dialog(&self) -> Option<Dialog> {
            self.pending_dialog.lock().ok().and_then(|mut slot| slot.take())
        }

        fn peek_dialog(&self) -> Option<Dialog> {
            self.pending_dialog.lock().ok().and_then(|slot| slot.clone())
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> ProbeResult<()> {
            let nav = |message: String| ProbeError::Navigation {
                url: url.to_string(),
                message,
            };
            tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
                .await
                .map_err(|_| nav(format!("timed out after {:?}", self.navigation_timeout)))?
                .map_err(|e| nav(e.to_string()))?;
            Ok(())
        }

        async fn current_url(&self) -> ProbeResult<String> {
            Ok(self.page.url().await.map_err(page_err)?.unwrap_or_default())
        }

        async fn reload(&self) -> ProbeResult<()> {
            tokio::time::timeout(self.navigation_timeout, self.page.reload())
                .await
                .map_err(|_| ProbeError::Timeout {
                    ms: self.navigation_timeout.as_millis() as u64,
                })?
                .map_err(page_err)?;
            Ok(())
        }

        async fn snapshot(&self) -> ProbeResult<DomSnapshot> {
            let mut last = None;
            for _ in 0..SNAPSHOT_ATTEMPTS {
                // A navigation in flight destroys the execution context.
                match self.eval_string(SNAPSHOT_JS.to_string()).await {
                    Ok(json) => return Ok(serde_json::from_str(&json)?),
                    Err(e) => last = Some(e),
                }
                tokio::time::sleep(SNAPSHOT_BACKOFF).await;
            }
            Err(last.unwrap_or_else(|| ProbeError::page("snapshot failed")))
        }

        async fn click(&self, target: &ElementTarget) -> ProbeResult<()> {
            self.on_target(target, CLICK_BODY).await
        }

        async fn fill(&self, target: &ElementTarget, value: &str) -> ProbeResult<()> {
            self.on_target(target, &fill_body(value)).await
        }

        async fn clear(&self, target: &ElementTarget) -> ProbeResult<()> {
            self.on_target(target, &fill_body("")).await
        }

        async fn select_option(&self, target: &ElementTarget, value: &str) -> ProbeResult<()> {
            self.on_target(target, &select_body(value)).await
        }

        async fn wait_for_dialog(&self, timeout: Duration) -> ProbeResult<Option<Dialog>> {
            let deadline = Instant::now() + timeout;
            loop {
                if let Some(dialog) = self.peek_dialog() {
                    return Ok(Some(dialog));
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                tokio::time::sleep(DIALOG_POLL.min(deadline - now)).await;
            }
        }

        async fn handle_dialog(&self, accept: bool) -> ProbeResult<()> {
            let dialog = self
                .take_dialog()
                .ok_or_else(|| ProbeError::invalid_state("no dialog is open"))?;
            self.page
                .execute(HandleJavaScriptDialogParams::new(accept))
                .await
                .map_err(page_err)?;
            tracing::debug!(accept, message = dialog.message(), "native dialog handled");
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert_eq!((config.viewport_width, config.viewport_height), (1920, 1080));
            assert!(config.chromium_path.is_none());
        }

        #[test]
        fn test_builders() {
            let config = BrowserConfig::default()
                .with_viewport(1280, 720)
                .with_headless(false)
                .with_chromium_path("/usr/bin/chromium")
                .with_no_sandbox()
                .with_arg("--disable-gpu");
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.viewport_width, 1280);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.args, vec!["--disable-gpu"]);
        }

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config: BrowserConfig = serde_yaml_ng::from_str("headless: false\n").unwrap();
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 1920);
        }
    }

    mod script_tests {
        use super::*;

        #[test]
        fn test_path_script_embeds_path_and_tag() {
            let script = path_script(&[1, 0, 4], "button", CLICK_BODY);
            assert!(script.contains("[1,0,4]"));
            assert!(script.contains("\"button\""));
            assert!(script.contains("setTimeout"));
        }

        #[test]
        fn test_fill_value_is_escaped() {
            let body = fill_body("say \"hi\"\n<script>");
            assert!(body.contains(r#""say \"hi\"\n<script>""#));
        }

        #[test]
        fn test_select_matches_value_or_text() {
            let body = select_body("High");
            assert!(body.contains("o.value === \"High\""));
            assert!(body.contains("o.text.trim() === \"High\""));
        }

        #[test]
        fn test_snapshot_script_uses_dom_field_names() {
            for field in ["tag:", "classes:", "attrs:", "visible:", "valueMissing:", "children:"] {
                assert!(SNAPSHOT_JS.contains(field), "{field}");
            }
        }
    }
}
