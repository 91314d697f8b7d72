//! Pagekit: declarative page objects for browser UI tests
//!
//! Page and component types declare their elements (selector, strategy,
//! nesting) once; every access resolves lazily against the live document,
//! scoped to the component's root element and bounded by a timeout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PAGEKIT Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page /     │    │ Scope      │    │ Driver     │            │
//! │   │ Component  │───►│ (root +    │───►│ (WebDriver │            │
//! │   │ Declaration│    │  defaults) │    │  or Mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                                                       │
//! │         ├── Table<R>      rows as components, filter queries    │
//! │         ├── Transition    action → page name → AnyPage          │
//! │         └── WaitScope     baseline at entry, condition at exit  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagekit::prelude::*;
//!
//! struct LoginPage(Context);
//!
//! impl Component for LoginPage {
//!     fn declare() -> DeclarationBuilder {
//!         Declaration::of::<Self>()
//!             .field("username", ElementDescriptor::new("#user").value())
//!             .field("submit", ElementDescriptor::new("button[type=submit]"))
//!             .transition("login", Target::page("app.Home"))
//!     }
//!     fn from_context(context: Context) -> Self { Self(context) }
//!     fn context(&self) -> &Context { &self.0 }
//! }
//!
//! impl Page for LoginPage {}
//!
//! let login = session.open::<LoginPage>()?;
//! login.set("username", "ada")?;
//! let home = login.transition("login", |page| page.element("submit")?.click())?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

#[allow(missing_docs)]
mod config;
#[allow(missing_docs)]
mod declaration;
#[allow(missing_docs)]
mod dialog;
mod driver;
#[allow(missing_docs)]
mod element;
#[allow(missing_docs)]
mod locator;
#[allow(missing_docs)]
mod page_object;
#[allow(missing_docs)]
mod result;
#[allow(missing_docs)]
mod scope;
#[allow(missing_docs)]
mod session;
#[allow(missing_docs)]
mod table;
#[allow(missing_docs)]
mod tracing_support;
#[allow(missing_docs)]
mod transition;
#[allow(missing_docs)]
mod value;
#[allow(missing_docs)]
mod wait;

pub use config::{SessionConfig, TypeConfig};
pub use declaration::{
    declaration, Declaration, DeclarationBuilder, ElementDescriptor, FieldKind, NestedType,
};
pub use dialog::{Alert, DialogAction};
pub use driver::{
    ClickEffect, Driver, ElementHandle, MockDom, MockDriver, MockElement, READY_STATE_SCRIPT,
};
pub use element::WebElement;
pub use locator::{By, Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use page_object::{Component, Context, NestedInstance, Page, Resolved, UrlMatcher};
pub use result::{DriverError, DriverResult, PageError, PageResult};
pub use scope::Scope;
pub use session::{Session, SessionBuilder};
pub use table::{Filter, Query, Rows, Table};
pub use tracing_support::{init_tracing, LogFormat, TracingConfig};
pub use transition::{AnyPage, PageLoader, PageName, PageRegistry, Target, Token, TransitionMap};
pub use value::{parse_number, write as write_value, Value, ValueAccessor};
pub use wait::{
    document_ready, AjaxLibrary, Condition, ElementTarget, WaitGuard, WaitKind, WaitOptions,
    WaitResult, WaitScope, Waiter, ASPNET_IDLE_SCRIPT, JQUERY_IDLE_SCRIPT,
};

/// Derive [`Component`] for a struct holding a [`Context`]
#[cfg(feature = "derive")]
pub use pagekit_derive::Component;

/// Prelude for page-object definitions
pub mod prelude {
    pub use super::{
        By, Component, Context, Declaration, DeclarationBuilder, ElementDescriptor, Locator,
        Page, PageError, PageResult, Query, Session, Table, Target, Token, Value, ValueAccessor,
        WaitKind,
    };
}
