//! Browser session shared by every page object of one test flow.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::SessionConfig;
use crate::dialog::Alert;
use crate::driver::Driver;
use crate::page_object::Page;
use crate::result::{DriverError, PageError, PageResult};
use crate::transition::{AnyPage, PageLoader, PageName, PageRegistry};
use crate::wait::poll;

struct SessionInner {
    id: Uuid,
    driver: Arc<dyn Driver>,
    pages: Arc<dyn PageLoader>,
    config: SessionConfig,
}

/// Handle to a driver session.
///
/// Cloning is cheap; clones refer to the same session, which is what every
/// page produced by a transition receives.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session with default configuration and no registered pages
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::builder(driver).build()
    }

    /// Start building a session
    #[must_use]
    pub fn builder(driver: Arc<dyn Driver>) -> SessionBuilder {
        SessionBuilder {
            driver,
            pages: None,
            config: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.inner.driver.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same session
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Construct the entry page `P` on this session
    pub fn open<P: Page>(&self) -> PageResult<P> {
        tracing::debug!("Opening {} on session {}", std::any::type_name::<P>(), self.inner.id);
        let page = P::open(self)?;
        page.on_enter()?;
        Ok(page)
    }

    /// Construct the page registered under `name`
    pub fn load_page(&self, name: &PageName) -> PageResult<AnyPage> {
        self.inner.pages.load(name, self)
    }

    pub fn current_url(&self) -> PageResult<String> {
        Ok(self.driver().current_url()?)
    }

    pub fn window_handles(&self) -> PageResult<Vec<String>> {
        Ok(self.driver().window_handles()?)
    }

    /// Activate the window at `index`; negative indexes count from the end
    pub fn switch_to_window(&self, index: isize) -> PageResult<String> {
        let handles = self.window_handles()?;
        let len = handles.len() as isize;
        let position = if index < 0 { len + index } else { index };
        let handle = usize::try_from(position)
            .ok()
            .and_then(|i| handles.get(i))
            .ok_or_else(|| {
                PageError::Driver(DriverError::NoSuchWindow {
                    handle: index.to_string(),
                })
            })?;
        tracing::debug!("Switching to window {} ({})", index, handle);
        self.driver().switch_to_window(handle)?;
        Ok(handle.clone())
    }

    /// Wait for an alert to open
    pub fn alert(&self, timeout: Duration) -> PageResult<Alert> {
        let driver = self.driver();
        let mut text = None;
        let opened = poll(self, timeout, self.config().poll_interval(), || {
            text = driver.alert_text()?;
            Ok(text.is_some())
        })?;
        match text {
            Some(text) if opened => Ok(Alert::new(self.clone(), text)),
            _ => Err(PageError::WaitTimeout {
                waited_for: "alert".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    driver: Arc<dyn Driver>,
    pages: Option<Arc<dyn PageLoader>>,
    config: SessionConfig,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionBuilder {
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Page registry used to resolve transition targets
    #[must_use]
    pub fn pages(mut self, registry: PageRegistry) -> Self {
        self.pages = Some(Arc::new(registry));
        self
    }

    /// Custom page loader
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn PageLoader>) -> Self {
        self.pages = Some(loader);
        self
    }

    #[must_use]
    pub fn build(self) -> Session {
        let id = Uuid::new_v4();
        tracing::debug!("Created session {}", id);
        Session {
            inner: Arc::new(SessionInner {
                id,
                driver: self.driver,
                pages: self.pages.unwrap_or_else(|| Arc::new(PageRegistry::new())),
                config: self.config,
            }),
        }
    }
}
