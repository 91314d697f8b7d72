//! Page transitions: which page follows an action, and how a logical page
//! name becomes a page instance.
//!
//! Targets name pages by dotted logical names (`"app.bookings.ListPage"`),
//! never by type, so page types that lead to each other do not have to know
//! each other. Names are resolved through the session's [`PageLoader`] only
//! when a transition actually happens.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::page_object::Page;
use crate::result::{PageError, PageResult};
use crate::session::Session;

// =============================================================================
// PAGE NAME
// =============================================================================

/// Dotted logical page name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageName(String);

impl PageName {
    /// Wrap a name without validating it; declarations validate at build
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Validated name
    pub fn parse(name: &str) -> PageResult<Self> {
        let name = Self::new(name);
        name.validate().map_err(|message| PageError::TransitionResolutionError {
            name: name.0.clone(),
            message,
        })?;
        Ok(name)
    }

    /// Every dot-separated segment must be a non-empty identifier
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("page name is empty".to_string());
        }
        for segment in self.0.split('.') {
            let mut chars = segment.chars();
            let valid = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(format!("invalid page name '{}'", self.0));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment, conventionally the page type name
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// =============================================================================
// TOKEN / TARGET
// =============================================================================

/// Discriminant produced by an action body to choose among keyed targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Token {
    /// The body chose nothing
    #[default]
    None,
    /// A routing key such as a menu entry
    Key(String),
}

impl Token {
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Key(key) => Some(key),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("<none>"),
            Self::Key(key) => write!(f, "'{key}'"),
        }
    }
}

impl From<()> for Token {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<&str> for Token {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Token {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl<T: Into<String>> From<Option<T>> for Token {
    fn from(key: Option<T>) -> Self {
        key.map_or(Self::None, |k| Self::Key(k.into()))
    }
}

/// The page(s) that can follow an action
#[derive(Clone)]
pub enum Target {
    /// Always this page
    Page(PageName),
    /// Chosen by the token; `default` covers keys with no route
    Keyed {
        routes: BTreeMap<String, PageName>,
        default: Option<PageName>,
    },
    /// Chosen by a function of the token
    Computed(fn(&Token) -> Option<PageName>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(name) => f.debug_tuple("Page").field(name).finish(),
            Self::Keyed { routes, default } => f
                .debug_struct("Keyed")
                .field("routes", routes)
                .field("default", default)
                .finish(),
            Self::Computed(_) => f.write_str("Computed"),
        }
    }
}

impl Target {
    #[must_use]
    pub fn page(name: impl Into<String>) -> Self {
        Self::Page(PageName::new(name))
    }

    /// Keyed routes, no default
    #[must_use]
    pub fn keyed<K, N>(routes: impl IntoIterator<Item = (K, N)>) -> Self
    where
        K: Into<String>,
        N: Into<String>,
    {
        Self::Keyed {
            routes: routes
                .into_iter()
                .map(|(k, n)| (k.into(), PageName::new(n)))
                .collect(),
            default: None,
        }
    }

    /// Fallback page for a keyed target; other targets are unchanged
    #[must_use]
    pub fn or_default(self, name: impl Into<String>) -> Self {
        match self {
            Self::Keyed { routes, .. } => Self::Keyed {
                routes,
                default: Some(PageName::new(name)),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn computed(select: fn(&Token) -> Option<PageName>) -> Self {
        Self::Computed(select)
    }

    /// Statically known page names
    #[must_use]
    pub fn page_names(&self) -> Vec<&PageName> {
        match self {
            Self::Page(name) => vec![name],
            Self::Keyed { routes, default } => routes.values().chain(default.iter()).collect(),
            Self::Computed(_) => Vec::new(),
        }
    }

    /// Check every statically known page name
    pub fn validate(&self) -> Result<(), String> {
        self.page_names().iter().try_for_each(|name| name.validate())
    }

    /// Page name for the token an action returned
    pub fn select(&self, action: &str, token: &Token) -> PageResult<PageName> {
        let chosen = match self {
            Self::Page(name) => Some(name.clone()),
            Self::Keyed { routes, default } => token
                .key()
                .and_then(|key| routes.get(key))
                .or(default.as_ref())
                .cloned(),
            Self::Computed(select) => select(token),
        };
        chosen.ok_or_else(|| PageError::UnknownTransitionTarget {
            action: action.to_string(),
            token: token.to_string(),
        })
    }
}

/// Action name → target, for one component type
#[derive(Debug, Clone, Default)]
pub struct TransitionMap {
    targets: BTreeMap<String, Target>,
}

impl TransitionMap {
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&Target> {
        self.targets.get(action)
    }

    pub fn insert(&mut self, action: impl Into<String>, target: Target) {
        let _ = self.targets.insert(action.into(), target);
    }

    /// Copy entries from `other`, replacing existing ones
    pub fn extend(&mut self, other: &Self) {
        for (action, target) in &other.targets {
            let _ = self.targets.insert(action.clone(), target.clone());
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = &String> {
        self.targets.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

// =============================================================================
// PAGE LOADING
// =============================================================================

/// A page constructed from a logical name, type-erased
pub struct AnyPage {
    name: PageName,
    type_name: &'static str,
    session: Session,
    page: Box<dyn Any>,
}

impl fmt::Debug for AnyPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyPage")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl AnyPage {
    /// Wrap a constructed page
    pub fn new<P: Page>(name: PageName, page: P) -> Self {
        Self {
            name,
            type_name: type_name::<P>(),
            session: page.session().clone(),
            page: Box::new(page),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &PageName {
        &self.name
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Session the page is bound to
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn is<P: Page>(&self) -> bool {
        self.page.is::<P>()
    }

    #[must_use]
    pub fn downcast_ref<P: Page>(&self) -> Option<&P> {
        self.page.downcast_ref::<P>()
    }

    /// Recover the concrete page type
    pub fn downcast<P: Page>(self) -> PageResult<P> {
        let actual = self.type_name;
        self.page
            .downcast::<P>()
            .map(|page| *page)
            .map_err(|_| PageError::UnexpectedPage {
                expected: type_name::<P>(),
                actual,
            })
    }
}

/// Resolves logical page names to constructed pages
pub trait PageLoader: Send + Sync {
    /// Construct the page named `name` on `session`, running its
    /// [`on_enter`](Page::on_enter) hook
    fn load(&self, name: &PageName, session: &Session) -> PageResult<AnyPage>;
}

type PageFactory = fn(&PageName, &Session) -> PageResult<AnyPage>;

fn build_page<P: Page>(name: &PageName, session: &Session) -> PageResult<AnyPage> {
    Ok(AnyPage::new(name.clone(), session.open::<P>()?))
}

/// Name → page type table
#[derive(Default)]
pub struct PageRegistry {
    factories: HashMap<PageName, (&'static str, PageFactory)>,
}

impl fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRegistry")
            .field("pages", &self.list())
            .finish()
    }
}

impl PageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `P` under `name`
    pub fn register<P: Page>(&mut self, name: &str) -> PageResult<&mut Self> {
        let name = PageName::parse(name)?;
        let _ = self.factories.insert(name, (type_name::<P>(), build_page::<P>));
        Ok(self)
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<P: Page>(mut self, name: &str) -> PageResult<Self> {
        let _ = self.register::<P>(name)?;
        Ok(self)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&PageName::new(name))
    }

    /// Registered names, sorted
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(PageName::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.factories.len()
    }
}

impl PageLoader for PageRegistry {
    fn load(&self, name: &PageName, session: &Session) -> PageResult<AnyPage> {
        let (type_name, factory) =
            self.factories
                .get(name)
                .ok_or_else(|| PageError::TransitionResolutionError {
                    name: name.to_string(),
                    message: "no page registered under this name".to_string(),
                })?;
        tracing::debug!("Loading page {} as {}", name, type_name);
        factory(name, session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod page_name_tests {
        use super::*;

        #[test]
        fn test_valid_names() {
            assert!(PageName::parse("app.pages.HomePage").is_ok());
            assert!(PageName::parse("HomePage").is_ok());
            assert!(PageName::parse("_private.Page2").is_ok());
        }

        #[test]
        fn test_invalid_names() {
            for bad in ["", "app..Home", ".Home", "app.", "app.2fa", "app.home-page"] {
                let err = PageName::parse(bad).unwrap_err();
                assert!(matches!(err, PageError::TransitionResolutionError { .. }), "{bad}");
            }
        }

        #[test]
        fn test_short_name() {
            assert_eq!(PageName::new("app.pages.HomePage").short_name(), "HomePage");
            assert_eq!(PageName::new("Home").short_name(), "Home");
        }
    }

    mod token_tests {
        use super::*;

        #[test]
        fn test_conversions() {
            assert_eq!(Token::from(()), Token::None);
            assert_eq!(Token::from("bookings"), Token::Key("bookings".into()));
            assert_eq!(Token::from(Some("x")), Token::Key("x".into()));
            assert_eq!(Token::from(None::<String>), Token::None);
            assert_eq!(Token::from("k").to_string(), "'k'");
        }
    }

    mod target_tests {
        use super::*;

        fn by_prefix(token: &Token) -> Option<PageName> {
            token
                .key()
                .filter(|k| k.starts_with("report"))
                .map(|_| PageName::new("app.ReportPage"))
        }

        #[test]
        fn test_single_target_ignores_token() {
            let target = Target::page("app.HomePage");
            assert_eq!(target.select("login", &Token::None).unwrap().as_str(), "app.HomePage");
            assert_eq!(target.select("login", &"x".into()).unwrap().as_str(), "app.HomePage");
        }

        #[test]
        fn test_keyed_target() {
            let target = Target::keyed([("bookings", "app.Bookings"), ("profile", "app.Profile")]);
            assert_eq!(
                target.select("menu", &"profile".into()).unwrap().as_str(),
                "app.Profile"
            );
            let err = target.select("menu", &"billing".into()).unwrap_err();
            assert!(matches!(
                err,
                PageError::UnknownTransitionTarget { ref action, ref token } if action == "menu" && token == "'billing'"
            ));
            assert!(target.select("menu", &Token::None).is_err());
        }

        #[test]
        fn test_keyed_default() {
            let target = Target::keyed([("a", "app.A")]).or_default("app.Fallback");
            assert_eq!(target.select("go", &"zzz".into()).unwrap().as_str(), "app.Fallback");
            assert_eq!(target.select("go", &Token::None).unwrap().as_str(), "app.Fallback");
            assert_eq!(target.page_names().len(), 2);
        }

        #[test]
        fn test_computed_target() {
            let target = Target::computed(by_prefix);
            assert_eq!(
                target.select("open", &"report-2024".into()).unwrap().as_str(),
                "app.ReportPage"
            );
            assert!(target.select("open", &"other".into()).is_err());
            assert!(target.page_names().is_empty());
        }

        #[test]
        fn test_validate() {
            assert!(Target::page("app.Home").validate().is_ok());
            assert!(Target::keyed([("a", "bad name")]).validate().is_err());
            assert!(Target::keyed([("a", "app.A")]).or_default("").validate().is_err());
        }
    }

    mod transition_map_tests {
        use super::*;

        #[test]
        fn test_extend_replaces() {
            let mut base = TransitionMap::default();
            base.insert("login", Target::page("app.A"));
            base.insert("logout", Target::page("app.Login"));
            let mut child = TransitionMap::default();
            child.insert("login", Target::page("app.B"));
            base.extend(&child);
            assert_eq!(base.len(), 2);
            assert_eq!(
                base.get("login").unwrap().page_names(),
                vec![&PageName::new("app.B")]
            );
            assert_eq!(base.actions().count(), 2);
        }
    }
}
