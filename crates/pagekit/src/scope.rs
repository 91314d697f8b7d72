//! Scope: the coordinate context a descriptor is resolved against.
//!
//! A scope is the session plus an optional root element plus the defaults
//! of the component type that owns it. Searches start at the root when one
//! is set, else at the document.

use std::time::Duration;

use crate::declaration::{Declaration, ElementDescriptor};
use crate::driver::ElementHandle;
use crate::element::WebElement;
use crate::locator::{By, Locator};
use crate::result::{PageError, PageResult};
use crate::session::Session;
use crate::wait::poll;

/// Resolution context of one component instance
#[derive(Debug, Clone)]
pub struct Scope {
    session: Session,
    root: Option<ElementHandle>,
    default_by: By,
    timeout: Duration,
    poll_interval: Duration,
}

impl Scope {
    /// Scope for an instance of the type described by `declaration`.
    ///
    /// Type defaults win over session defaults; nothing is taken from an
    /// enclosing scope.
    #[must_use]
    pub fn new(session: &Session, root: Option<ElementHandle>, declaration: &Declaration) -> Self {
        let config = session.config();
        Self {
            session: session.clone(),
            root,
            default_by: declaration.default_by().unwrap_or(config.default_by),
            timeout: declaration
                .default_timeout()
                .unwrap_or_else(|| config.default_timeout()),
            poll_interval: config.poll_interval(),
        }
    }

    /// Same defaults, rooted at `root`
    #[must_use]
    pub fn within(&self, root: ElementHandle) -> Self {
        Self {
            root: Some(root),
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn root(&self) -> Option<&ElementHandle> {
        self.root.as_ref()
    }

    #[must_use]
    pub const fn default_by(&self) -> By {
        self.default_by
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Concrete locator for a descriptor in this scope
    #[must_use]
    pub fn locator(&self, descriptor: &ElementDescriptor) -> Locator {
        Locator::new(
            descriptor.strategy().unwrap_or(self.default_by),
            descriptor.selector(),
        )
    }

    /// Resolve a descriptor to exactly one element, polling until it appears.
    ///
    /// Zero matches at the deadline is `ElementNotFound`; a match that never
    /// became visible is `ElementNotVisible`; several matches on a strict
    /// descriptor is `AmbiguousElement`.
    pub fn find_one(&self, descriptor: &ElementDescriptor) -> PageResult<WebElement> {
        let locator = self.locator(descriptor);
        let timeout = descriptor.lookup_timeout().unwrap_or(self.timeout);
        let driver = self.session.driver();
        tracing::debug!("Resolving {} under {:?}", locator, self.root);

        let mut found = None;
        let mut hidden = false;
        let resolved = poll(&self.session, timeout, self.poll_interval, || {
            hidden = false;
            let matches = driver.find_elements(&locator, self.root.as_ref())?;
            let Some(first) = matches.first() else {
                return Ok(false);
            };
            if matches.len() > 1 && descriptor.is_strict() {
                return Err(PageError::AmbiguousElement {
                    locator: locator.to_string(),
                    count: matches.len(),
                });
            }
            if descriptor.requires_visible() && !driver.is_displayed(first)? {
                hidden = true;
                return Ok(false);
            }
            found = Some(first.clone());
            Ok(true)
        })?;

        match found {
            Some(handle) if resolved => Ok(WebElement::new(self.session.clone(), handle, locator)),
            _ if hidden => Err(PageError::ElementNotVisible {
                locator: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            _ => Err(PageError::ElementNotFound {
                locator: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Every current match of a descriptor, in document order.
    ///
    /// Polls until at least one element exists; an empty result after the
    /// timeout is returned as-is.
    pub fn find_many(&self, descriptor: &ElementDescriptor) -> PageResult<Vec<WebElement>> {
        let locator = self.locator(descriptor);
        let timeout = descriptor.lookup_timeout().unwrap_or(self.timeout);
        let driver = self.session.driver();
        let mut handles = Vec::new();
        let _ = poll(&self.session, timeout, self.poll_interval, || {
            handles = driver.find_elements(&locator, self.root.as_ref())?;
            Ok(!handles.is_empty())
        })?;
        Ok(handles
            .into_iter()
            .map(|h| WebElement::new(self.session.clone(), h, locator.clone()))
            .collect())
    }

    /// Immediate ordered query, no polling
    pub fn find_all(&self, locator: &Locator) -> PageResult<Vec<ElementHandle>> {
        Ok(self
            .session
            .driver()
            .find_elements(locator, self.root.as_ref())?)
    }
}
