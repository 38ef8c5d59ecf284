//! Document export: print markup (or a URL serving it) in, document bytes out.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::error::RenderError;
use crate::impose::LayoutConfig;

const STDERR_LIMIT: usize = 2_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl From<&LayoutConfig> for PageDimensions {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            width_mm: config.page_width_mm,
            height_mm: config.page_height_mm,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RenderSource {
    /// A page the renderer loads itself; its own `@page` rules apply.
    Url(Url),
    Markup(String),
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        source: &RenderSource,
        page: PageDimensions,
    ) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Chromium,
    Weasyprint,
}

impl RendererKind {
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Weasyprint => "weasyprint",
        }
    }
}

/// Runs an external converter once per document.
///
/// Markup is written to a scratch directory that is removed when the call
/// returns or is dropped; the child is killed if the call is dropped first.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    kind: RendererKind,
    program: PathBuf,
}

impl CommandRenderer {
    pub fn new(kind: RendererKind, program: Option<PathBuf>) -> Self {
        let program = program.unwrap_or_else(|| PathBuf::from(kind.default_program()));
        Self { kind, program }
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    fn args(&self, input: &str, output: &std::path::Path) -> Vec<String> {
        match self.kind {
            RendererKind::Chromium => vec![
                "--headless".to_owned(),
                "--no-sandbox".to_owned(),
                "--disable-gpu".to_owned(),
                "--no-pdf-header-footer".to_owned(),
                format!("--print-to-pdf={}", output.display()),
                input.to_owned(),
            ],
            RendererKind::Weasyprint => {
                vec![input.to_owned(), output.display().to_string()]
            }
        }
    }
}

#[async_trait]
impl DocumentRenderer for CommandRenderer {
    async fn render(
        &self,
        source: &RenderSource,
        page: PageDimensions,
    ) -> Result<Vec<u8>, RenderError> {
        let scratch = tempfile::tempdir().map_err(|source| RenderError::Io {
            context: "create render scratch dir",
            source,
        })?;
        let output_path = scratch.path().join("document.pdf");

        let input = match source {
            RenderSource::Url(url) => url.to_string(),
            RenderSource::Markup(markup) => {
                let input_path = scratch.path().join("document.html");
                tokio::fs::write(&input_path, with_page_rule(markup, page))
                    .await
                    .map_err(|source| RenderError::Io {
                        context: "write render input",
                        source,
                    })?;
                match self.kind {
                    RendererKind::Chromium => Url::from_file_path(&input_path)
                        .map(|url| url.to_string())
                        .unwrap_or_else(|()| input_path.display().to_string()),
                    RendererKind::Weasyprint => input_path.display().to_string(),
                }
            }
        };

        tracing::info!(
            program = %self.program.display(),
            kind = ?self.kind,
            width_mm = page.width_mm,
            height_mm = page.height_mm,
            "render document"
        );

        let output = tokio::process::Command::new(&self.program)
            .args(self.args(&input, &output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let stderr = match stderr.char_indices().nth(STDERR_LIMIT) {
                Some((cut, _)) => format!("{}...", &stderr[..cut]),
                None => stderr.to_owned(),
            };
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        match tokio::fs::read(&output_path).await {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            Ok(_) => Err(RenderError::MissingOutput),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::MissingOutput)
            }
            Err(source) => Err(RenderError::Io {
                context: "read rendered document",
                source,
            }),
        }
    }
}

/// Adds an `@page` rule for `page` unless the markup already sizes its pages.
pub fn with_page_rule(markup: &str, page: PageDimensions) -> String {
    if markup.contains("@page") {
        return markup.to_owned();
    }
    let rule = format!(
        "<style>@page {{ size: {}mm {}mm; margin: 0; }}</style>",
        page.width_mm, page.height_mm
    );
    match markup.find("</head>") {
        Some(at) => format!("{}{}{}", &markup[..at], rule, &markup[at..]),
        None => format!("{rule}{markup}"),
    }
}

struct PoolState {
    idle: Mutex<Vec<Arc<dyn DocumentRenderer>>>,
    permits: Arc<Semaphore>,
}

/// Fixed set of renderer sessions, each used by one caller at a time.
pub struct RendererPool {
    state: Arc<PoolState>,
    size: usize,
    timeout: Duration,
}

impl RendererPool {
    pub fn new(sessions: Vec<Arc<dyn DocumentRenderer>>, timeout: Duration) -> anyhow::Result<Self> {
        if sessions.is_empty() {
            anyhow::bail!("renderer pool needs at least one session");
        }
        let size = sessions.len();
        Ok(Self {
            state: Arc::new(PoolState {
                idle: Mutex::new(sessions),
                permits: Arc::new(Semaphore::new(size)),
            }),
            size,
            timeout,
        })
    }

    /// `sessions` identical command renderers.
    pub fn command(
        kind: RendererKind,
        program: Option<PathBuf>,
        sessions: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let sessions = (0..sessions.max(1))
            .map(|_| {
                Arc::new(CommandRenderer::new(kind, program.clone())) as Arc<dyn DocumentRenderer>
            })
            .collect();
        Self::new(sessions, timeout)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.state.permits.available_permits()
    }

    /// Waits for an idle session.
    pub async fn checkout(&self) -> anyhow::Result<RendererLease> {
        let permit = Arc::clone(&self.state.permits)
            .acquire_owned()
            .await
            .context("renderer pool closed")?;
        let session = self
            .state
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .context("renderer pool has a permit but no idle session")?;
        tracing::debug!(available = self.available(), "renderer checked out");
        Ok(RendererLease {
            session,
            state: Arc::clone(&self.state),
            _permit: permit,
        })
    }

    /// Renders on a leased session within the pool's timeout. The session goes
    /// back to the pool however the call ends.
    pub async fn render(
        &self,
        source: &RenderSource,
        page: PageDimensions,
    ) -> anyhow::Result<Vec<u8>> {
        let lease = self.checkout().await?;
        let bytes = tokio::time::timeout(self.timeout, lease.renderer().render(source, page))
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;
        tracing::info!(bytes = bytes.len(), "document rendered");
        Ok(bytes)
    }
}

/// Exclusive use of one session; dropping it returns the session.
pub struct RendererLease {
    session: Arc<dyn DocumentRenderer>,
    state: Arc<PoolState>,
    _permit: OwnedSemaphorePermit,
}

impl RendererLease {
    pub fn renderer(&self) -> &dyn DocumentRenderer {
        self.session.as_ref()
    }
}

impl Drop for RendererLease {
    fn drop(&mut self) {
        self.state
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&self.session));
    }
}
