//! Page Object Model support.
//!
//! A [`Component`] is a named set of declared fields bound to a [`Scope`].
//! A [`Page`] is a component bound to the document root. Field access goes
//! through the type's cached [`Declaration`] and re-resolves every time.
//!
//! ```ignore
//! struct LoginPage(Context);
//!
//! impl Component for LoginPage {
//!     fn declare() -> DeclarationBuilder {
//!         Declaration::of::<Self>()
//!             .field("username", ElementDescriptor::new("#user").value())
//!             .field("submit", ElementDescriptor::new("button[type=submit]"))
//!             .transition("login", Target::page("app.HomePage"))
//!     }
//!     fn from_context(context: Context) -> Self { Self(context) }
//!     fn context(&self) -> &Context { &self.0 }
//! }
//!
//! impl Page for LoginPage {}
//!
//! impl LoginPage {
//!     pub fn login(&self, user: &str) -> PageResult<AnyPage> {
//!         self.transition("login", |page| {
//!             page.set("username", user)?;
//!             page.element("submit")?.click()
//!         })
//!     }
//! }
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::declaration::{declaration, Declaration, DeclarationBuilder, FieldKind, NestedType};
use crate::dialog::Alert;
use crate::driver::ElementHandle;
use crate::element::WebElement;
use crate::result::{PageError, PageResult};
use crate::scope::Scope;
use crate::session::Session;
use crate::table::Table;
use crate::transition::{AnyPage, PageName, Token};
use crate::value::{Value, ValueAccessor};
use crate::wait::{ElementTarget, WaitKind, WaitResult, WaitScope, Waiter};

// =============================================================================
// CONTEXT
// =============================================================================

/// Per-instance state of a component: its scope and its type's declaration
#[derive(Debug, Clone)]
pub struct Context {
    scope: Scope,
    declaration: Arc<Declaration>,
}

impl Context {
    #[must_use]
    pub fn new(scope: Scope, declaration: Arc<Declaration>) -> Self {
        Self { scope, declaration }
    }

    /// Context for `C` searching from the document root
    pub fn root<C: Component>(session: &Session) -> PageResult<Self> {
        let declaration = declaration::<C>()?;
        Ok(Self::new(Scope::new(session, None, &declaration), declaration))
    }

    /// Context for `C` rooted at `handle`
    pub fn nested<C: Component>(session: &Session, handle: ElementHandle) -> PageResult<Self> {
        let declaration = declaration::<C>()?;
        Ok(Self::new(
            Scope::new(session, Some(handle), &declaration),
            declaration,
        ))
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        self.scope.session()
    }

    fn fail(&self, message: String) -> PageError {
        PageError::declaration(self.declaration.type_name(), message)
    }

    /// The live element behind a field
    pub fn element(&self, name: &str) -> PageResult<WebElement> {
        self.scope.find_one(self.declaration.require_field(name)?)
    }

    /// Every current match of a field's locator
    pub fn elements(&self, name: &str) -> PageResult<Vec<WebElement>> {
        self.scope.find_many(self.declaration.require_field(name)?)
    }

    /// Read a field's value.
    ///
    /// Fields declared as plain elements read through [`ValueAccessor::Auto`].
    pub fn value(&self, name: &str) -> PageResult<Value> {
        let descriptor = self.declaration.require_field(name)?;
        match descriptor.kind() {
            FieldKind::Value(accessor) => self.scope.find_one(descriptor)?.read(accessor),
            FieldKind::Element => self.scope.find_one(descriptor)?.read(&ValueAccessor::Auto),
            FieldKind::Nested(nested) => Err(self.fail(format!(
                "field '{name}' is a {} and has no value",
                nested.type_name()
            ))),
        }
    }

    /// Assign a field's value
    pub fn set(&self, name: &str, value: impl Into<Value>) -> PageResult<()> {
        let descriptor = self.declaration.require_field(name)?;
        if let FieldKind::Nested(nested) = descriptor.kind() {
            return Err(self.fail(format!(
                "field '{name}' is a {} and cannot be assigned",
                nested.type_name()
            )));
        }
        let value = value.into();
        tracing::debug!("Setting {}.{} = {}", self.declaration.type_name(), name, value);
        self.scope.find_one(descriptor)?.write(&value)
    }

    /// Assign values pairwise to every match of a field; extra values or
    /// extra elements are left alone
    pub fn set_all<I, V>(&self, name: &str, values: I) -> PageResult<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for (element, value) in self.elements(name)?.iter().zip(values) {
            element.write(&value.into())?;
        }
        Ok(())
    }

    fn nested_type(&self, name: &str) -> PageResult<&NestedType> {
        match self.declaration.require_field(name)?.kind() {
            FieldKind::Nested(nested) => Ok(nested),
            _ => Err(self.fail(format!("field '{name}' is not a component or table"))),
        }
    }

    fn typed_nested<T: 'static>(&self, name: &str) -> PageResult<&NestedType> {
        let nested = self.nested_type(name)?;
        if !nested.is::<T>() {
            return Err(self.fail(format!(
                "field '{name}' is a {}, not a {}",
                nested.type_name(),
                type_name::<T>()
            )));
        }
        Ok(nested)
    }

    fn bind_as<T: 'static>(
        &self,
        name: &str,
        nested: &NestedType,
        element: &WebElement,
    ) -> PageResult<T> {
        nested
            .bind(&self.scope, element.handle().clone())?
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| self.fail(format!("field '{name}' produced an unexpected type")))
    }

    fn bind_nested<T: 'static>(&self, name: &str) -> PageResult<T> {
        let nested = self.typed_nested::<T>(name)?;
        let element = self.element(name)?;
        self.bind_as(name, nested, &element)
    }

    /// Fresh `C` scoped to the field's element
    pub fn component<C: Component>(&self, name: &str) -> PageResult<C> {
        self.bind_nested::<C>(name)
    }

    /// One fresh `C` per current match of the field's locator
    pub fn components<C: Component>(&self, name: &str) -> PageResult<Vec<C>> {
        let nested = self.typed_nested::<C>(name)?;
        self.elements(name)?
            .iter()
            .map(|element| self.bind_as(name, nested, element))
            .collect()
    }

    /// Fresh table of `R` scoped to the field's element
    pub fn table<R: Component>(&self, name: &str) -> PageResult<Table<R>> {
        self.bind_nested::<Table<R>>(name)
    }

    /// Resolve a field to whatever its declaration says it is
    pub fn resolve(&self, name: &str) -> PageResult<Resolved> {
        let descriptor = self.declaration.require_field(name)?;
        let element = self.scope.find_one(descriptor)?;
        match descriptor.kind() {
            FieldKind::Element => Ok(Resolved::Element(element)),
            FieldKind::Value(accessor) => Ok(Resolved::Value(element.read(accessor)?)),
            FieldKind::Nested(nested) => Ok(Resolved::Nested(NestedInstance {
                type_name: nested.type_name(),
                instance: nested.bind(&self.scope, element.handle().clone())?,
            })),
        }
    }

    /// Where a field would be searched for, for element waits
    pub fn element_target(&self, name: &str) -> PageResult<ElementTarget> {
        let descriptor = self.declaration.require_field(name)?;
        Ok(ElementTarget {
            locator: self.scope.locator(descriptor),
            root: self.scope.root().cloned(),
        })
    }

    /// Run an action body and construct the page registered for it.
    ///
    /// The target is looked up before the body runs; the discriminant the
    /// body returns is resolved before anything is constructed.
    pub fn transition<K, F>(&self, action: &str, body: F) -> PageResult<AnyPage>
    where
        K: Into<Token>,
        F: FnOnce() -> PageResult<K>,
    {
        let target = self.declaration.transitions().get(action).ok_or_else(|| {
            self.fail(format!("action '{action}' has no registered next page"))
        })?;
        let token = body()?.into();
        let name = target.select(action, &token)?;
        tracing::info!(
            "{}.{} -> {} (token {})",
            self.declaration.type_name(),
            action,
            name,
            token
        );
        self.session().load_page(&name)
    }
}

// =============================================================================
// RESOLVED
// =============================================================================

/// A type-erased nested component or table
pub struct NestedInstance {
    type_name: &'static str,
    instance: Box<dyn Any>,
}

impl fmt::Debug for NestedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedInstance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl NestedInstance {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.instance.is::<T>()
    }

    /// Recover the concrete type
    pub fn downcast<T: 'static>(self) -> PageResult<T> {
        let type_name = self.type_name;
        self.instance
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                PageError::declaration(
                    type_name,
                    format!("nested field is not a {}", std::any::type_name::<T>()),
                )
            })
    }
}

/// Outcome of resolving a field
#[derive(Debug)]
pub enum Resolved {
    /// Raw live element
    Element(WebElement),
    /// Coerced value
    Value(Value),
    /// Nested component or table
    Nested(NestedInstance),
}

impl Resolved {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Value(_) => "value",
            Self::Nested(_) => "nested",
        }
    }

    #[must_use]
    pub fn into_element(self) -> Option<WebElement> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_nested(self) -> Option<NestedInstance> {
        match self {
            Self::Nested(nested) => Some(nested),
            _ => None,
        }
    }
}

// =============================================================================
// COMPONENT / PAGE
// =============================================================================

/// A reusable UI fragment with declared fields.
///
/// Implementors provide the declaration and the context plumbing; every
/// accessor is provided.
pub trait Component: Sized + 'static {
    /// Describe this type's fields, actions and transitions
    fn declare() -> DeclarationBuilder;

    /// Wrap a context
    fn from_context(context: Context) -> Self;

    /// The bound context
    fn context(&self) -> &Context;

    fn session(&self) -> &Session {
        self.context().session()
    }

    fn element(&self, name: &str) -> PageResult<WebElement> {
        self.context().element(name)
    }

    fn elements(&self, name: &str) -> PageResult<Vec<WebElement>> {
        self.context().elements(name)
    }

    fn value(&self, name: &str) -> PageResult<Value> {
        self.context().value(name)
    }

    fn set(&self, name: &str, value: impl Into<Value>) -> PageResult<()> {
        self.context().set(name, value)
    }

    fn set_all<I, V>(&self, name: &str, values: I) -> PageResult<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.context().set_all(name, values)
    }

    fn component<C: Component>(&self, name: &str) -> PageResult<C> {
        self.context().component(name)
    }

    fn components<C: Component>(&self, name: &str) -> PageResult<Vec<C>> {
        self.context().components(name)
    }

    fn table<R: Component>(&self, name: &str) -> PageResult<Table<R>> {
        self.context().table(name)
    }

    fn resolve(&self, name: &str) -> PageResult<Resolved> {
        self.context().resolve(name)
    }

    /// Run `body` as the named transition-bearing action
    fn transition<K, F>(&self, action: &str, body: F) -> PageResult<AnyPage>
    where
        K: Into<Token>,
        F: FnOnce(&Self) -> PageResult<K>,
    {
        self.context().transition(action, || body(self))
    }

    /// Wait-after-action scope with this component's timeout
    fn wait(&self, kind: WaitKind) -> WaitScope {
        WaitScope::new(self.session(), kind).timeout(self.context().scope().timeout())
    }

    fn wait_page_loaded(&self) -> WaitScope {
        self.wait(WaitKind::PageLoaded)
    }

    fn wait_displayed(&self, name: &str) -> PageResult<WaitScope> {
        Ok(self.wait(WaitKind::ElementDisplayed(self.context().element_target(name)?)))
    }

    fn wait_disappeared(&self, name: &str) -> PageResult<WaitScope> {
        Ok(self.wait(WaitKind::ElementDisappeared(self.context().element_target(name)?)))
    }

    fn wait_changed(&self, name: &str) -> PageResult<WaitScope> {
        Ok(self.wait(WaitKind::ElementChanged(self.context().element_target(name)?)))
    }

    /// Direct wait with this component's timeout
    fn wait_until<F>(&self, description: &str, condition: F) -> PageResult<WaitResult>
    where
        F: FnMut(&Session) -> PageResult<bool>,
    {
        Waiter::new(self.session())
            .timeout(self.context().scope().timeout())
            .until(description, condition)
    }
}

/// A component bound to the document root
pub trait Page: Component {
    /// URL path pattern (`/users/:id`, `/admin/*`) identifying this page
    fn url_pattern() -> Option<&'static str> {
        None
    }

    /// Hook run after the page is constructed by [`Session::open`] or a
    /// transition
    fn on_enter(&self) -> PageResult<()> {
        Ok(())
    }

    /// Construct on `session` without running [`on_enter`](Self::on_enter)
    fn open(session: &Session) -> PageResult<Self> {
        Ok(Self::from_context(Context::root::<Self>(session)?))
    }

    fn current_url(&self) -> PageResult<String> {
        self.session().current_url()
    }

    /// Whether the current URL matches [`url_pattern`](Self::url_pattern);
    /// always true without a pattern
    fn is_current(&self) -> PageResult<bool> {
        match Self::url_pattern() {
            Some(pattern) => Ok(UrlMatcher::new(pattern).matches(&self.current_url()?)),
            None => Ok(true),
        }
    }

    /// Wait for an alert, by default for this page's timeout
    fn alert(&self, timeout: Option<Duration>) -> PageResult<Alert> {
        self.session()
            .alert(timeout.unwrap_or_else(|| self.context().scope().timeout()))
    }

    /// Activate a window (negative indexes count from the end) and wait for
    /// its document to be ready
    fn window(&self, index: isize) -> PageResult<()> {
        let _ = self.session().switch_to_window(index)?;
        let _ = self.wait_until("document ready", crate::wait::document_ready)?;
        Ok(())
    }

    /// Switch to the page registered under `name`, optionally in another
    /// window
    fn goto(&self, name: &str, window: Option<isize>) -> PageResult<AnyPage> {
        let name = PageName::parse(name)?;
        if let Some(index) = window {
            self.window(index)?;
        }
        self.session().load_page(&name)
    }
}

// =============================================================================
// URL MATCHER
// =============================================================================

/// URL path matcher for page identification and URL waits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

/// Path part of a URL: scheme, host, query and fragment removed
fn url_path(url: &str) -> &str {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => url,
    };
    rest.split(['?', '#']).next().unwrap_or_default()
}

impl UrlMatcher {
    /// Create a matcher from a path pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/login`
    /// - Wildcards: `/users/*`
    /// - Named parameters: `/users/:id`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    fn path_segments(url: &str) -> Vec<&str> {
        url_path(url).split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Whether the path of `url` matches; wildcards and parameters each
    /// consume exactly one segment
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let path = Self::path_segments(url);
        path.len() == self.segments.len()
            && self.segments.iter().zip(&path).all(|(segment, part)| match segment {
                UrlSegment::Literal(lit) => lit == part,
                UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
            })
    }

    /// Named parameters captured from `url`
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(Self::path_segments(url))
            .filter_map(|(segment, part)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), part.to_string())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::declaration::{Declaration, ElementDescriptor};
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::{By, Locator};

    struct Menu(Context);

    impl Component for Menu {
        fn declare() -> DeclarationBuilder {
            Declaration::of::<Self>()
                .default_by(By::LinkText)
                .field("home", ElementDescriptor::new("Home"))
        }

        fn from_context(context: Context) -> Self {
            Self(context)
        }

        fn context(&self) -> &Context {
            &self.0
        }
    }

    struct Profile(Context);

    impl Component for Profile {
        fn declare() -> DeclarationBuilder {
            Declaration::of::<Self>()
                .field("menu", ElementDescriptor::new("nav").component::<Menu>())
                .field("name", ElementDescriptor::new("#name").value())
                .field("plain", ElementDescriptor::new("#plain"))
                .field("tags", ElementDescriptor::new("input.tag"))
                .action("save")
        }

        fn from_context(context: Context) -> Self {
            Self(context)
        }

        fn context(&self) -> &Context {
            &self.0
        }
    }

    impl Page for Profile {
        fn url_pattern() -> Option<&'static str> {
            Some("/users/:id")
        }
    }

    fn setup() -> (Arc<MockDriver>, Session) {
        let driver = Arc::new(MockDriver::new());
        let session = Session::builder(driver.clone())
            .config(SessionConfig::new().with_timeout(20).with_poll_interval(1))
            .build();
        (driver, session)
    }

    mod component_tests {
        use super::*;

        #[test]
        fn test_value_and_set() {
            let (driver, session) = setup();
            let name = driver.add(None, MockElement::new("input").css("#name").attr("value", "Ann"));
            let page = session.open::<Profile>().unwrap();
            assert_eq!(page.value("name").unwrap(), Value::from("Ann"));
            page.set("name", "Bea").unwrap();
            assert_eq!(driver.attribute_of(&name, "value"), Some("Bea".to_string()));
        }

        #[test]
        fn test_plain_field_reads_auto() {
            let (driver, session) = setup();
            let _ = driver.add(None, MockElement::new("span").css("#plain").text(" hi "));
            let page = session.open::<Profile>().unwrap();
            assert_eq!(page.value("plain").unwrap(), Value::from("hi"));
        }

        #[test]
        fn test_unknown_field() {
            let (_driver, session) = setup();
            let page = session.open::<Profile>().unwrap();
            let err = page.element("nope").unwrap_err();
            assert!(matches!(err, PageError::DeclarationError { .. }));
        }

        #[test]
        fn test_nested_component_scoped_to_parent() {
            let (driver, session) = setup();
            let _outside = driver.add(None, MockElement::new("a").text("Home"));
            let nav = driver.add(None, MockElement::new("nav").css("nav"));
            let inside = driver.add(Some(&nav), MockElement::new("a").text("Home"));

            let page = session.open::<Profile>().unwrap();
            let menu: Menu = page.component("menu").unwrap();
            assert_eq!(menu.context().scope().root(), Some(&nav));
            assert_eq!(menu.context().scope().default_by(), By::LinkText);
            assert_eq!(menu.element("home").unwrap().handle(), &inside);
        }

        #[test]
        fn test_component_type_mismatch() {
            let (driver, session) = setup();
            let _ = driver.add(None, MockElement::new("nav").css("nav"));
            let page = session.open::<Profile>().unwrap();
            assert!(page.component::<Profile>("menu").is_err());
            assert!(page.component::<Menu>("name").is_err());
            assert!(page.value("menu").is_err());
            assert!(page.set("menu", "x").is_err());
        }

        #[test]
        fn test_components_wrap_every_match() {
            let (driver, session) = setup();
            let first = driver.add(None, MockElement::new("nav").css("nav"));
            let _ = driver.add(Some(&first), MockElement::new("a").text("Home"));
            let second = driver.add(None, MockElement::new("nav").css("nav"));
            let link = driver.add(Some(&second), MockElement::new("a").text("Home"));

            let page = session.open::<Profile>().unwrap();
            assert!(page.component::<Menu>("menu").is_err());
            let menus = page.components::<Menu>("menu").unwrap();
            assert_eq!(menus.len(), 2);
            assert_eq!(menus[1].context().scope().root(), Some(&second));
            assert_eq!(menus[1].element("home").unwrap().handle(), &link);
            assert!(page.components::<Profile>("menu").is_err());
            assert!(page.components::<Menu>("tags").is_err());
        }

        #[test]
        fn test_resolve_kinds() {
            let (driver, session) = setup();
            let _ = driver.add(None, MockElement::new("nav").css("nav"));
            let _ = driver.add(None, MockElement::new("input").css("#name").attr("value", "Ann"));
            let _ = driver.add(None, MockElement::new("p").css("#plain"));
            let page = session.open::<Profile>().unwrap();

            assert_eq!(page.resolve("plain").unwrap().kind(), "element");
            assert_eq!(
                page.resolve("name").unwrap().into_value(),
                Some(Value::from("Ann"))
            );
            let nested = page.resolve("menu").unwrap().into_nested().unwrap();
            assert!(nested.is::<Menu>());
            assert!(nested.downcast::<Menu>().is_ok());
        }

        #[test]
        fn test_set_all_zips_values() {
            let (driver, session) = setup();
            let a = driver.add(None, MockElement::new("input").css("input.tag"));
            let b = driver.add(None, MockElement::new("input").css("input.tag"));
            let page = session.open::<Profile>().unwrap();
            page.set_all("tags", ["red", "blue", "extra"]).unwrap();
            assert_eq!(driver.attribute_of(&a, "value"), Some("red".to_string()));
            assert_eq!(driver.attribute_of(&b, "value"), Some("blue".to_string()));
            assert_eq!(page.elements("tags").unwrap().len(), 2);
        }

        #[test]
        fn test_transition_without_target_is_declaration_error() {
            let (_driver, session) = setup();
            let page = session.open::<Profile>().unwrap();
            let mut ran = false;
            let err = page
                .transition("save", |_| {
                    ran = true;
                    Ok(())
                })
                .unwrap_err();
            assert!(matches!(err, PageError::DeclarationError { .. }));
            assert!(!ran);
        }

        #[test]
        fn test_element_target() {
            let (_driver, session) = setup();
            let page = session.open::<Profile>().unwrap();
            let target = page.context().element_target("name").unwrap();
            assert_eq!(target.locator, Locator::css("#name"));
            assert!(target.root.is_none());
        }
    }

    mod page_tests {
        use super::*;
        use crate::driver::MockDom;

        #[test]
        fn test_is_current() {
            let (driver, session) = setup();
            let page = session.open::<Profile>().unwrap();
            assert!(!page.is_current().unwrap());
            driver.navigate("https://app.test/users/42?tab=info");
            assert!(page.is_current().unwrap());
        }

        #[test]
        fn test_window_switches_and_waits() {
            let (driver, session) = setup();
            let popup = driver.with_dom(MockDom::open_window);
            let page = session.open::<Profile>().unwrap();
            page.window(-1).unwrap();
            assert!(driver.was_called(&format!("switch_to_window:{popup}")));
            assert!(driver.was_called("script:"));
        }

        #[test]
        fn test_alert_uses_page_timeout() {
            let (_driver, session) = setup();
            let page = session.open::<Profile>().unwrap();
            let err = page.alert(None).unwrap_err();
            assert!(matches!(err, PageError::WaitTimeout { timeout_ms: 20, .. }));
        }

        #[test]
        fn test_goto_rejects_bad_name() {
            let (_driver, session) = setup();
            let page = session.open::<Profile>().unwrap();
            assert!(page.goto("", None).is_err());
            let err = page.goto("app.Nowhere", None).unwrap_err();
            assert!(matches!(err, PageError::TransitionResolutionError { .. }));
        }
    }

    mod url_matcher_tests {
        use super::*;

        #[test]
        fn test_literal_match() {
            let matcher = UrlMatcher::new("/login");
            assert!(matcher.matches("/login"));
            assert!(matcher.matches("https://app.test/login?next=/home"));
            assert!(!matcher.matches("/register"));
            assert!(!matcher.matches("/login/extra"));
        }

        #[test]
        fn test_wildcard_and_parameter() {
            let matcher = UrlMatcher::new("/users/*");
            assert!(matcher.matches("http://localhost:8080/users/abc"));
            assert!(!matcher.matches("/users"));

            let matcher = UrlMatcher::new("/users/:id/posts/:post_id");
            let params = matcher.extract_params("https://app.test/users/42/posts/100#top");
            assert_eq!(params.get("id"), Some(&"42".to_string()));
            assert_eq!(params.get("post_id"), Some(&"100".to_string()));
        }

        #[test]
        fn test_root_path() {
            let matcher = UrlMatcher::new("/");
            assert!(matcher.matches("https://app.test"));
            assert!(matcher.matches("https://app.test/"));
            assert_eq!(matcher.pattern(), "/");
        }
    }
}
