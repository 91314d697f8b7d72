//! Declarative field descriptions and per-type declarations.
//!
//! A component type describes its fields once, in [`Component::declare`].
//! The result is validated, cached process-wide and shared by every
//! instance of the type. Descriptors never hold resolved handles.
//!
//! ```ignore
//! fn declare() -> DeclarationBuilder {
//!     Declaration::of::<LoginPage>()
//!         .default_by(By::Id)
//!         .field("username", ElementDescriptor::new("user").value())
//!         .field("submit", ElementDescriptor::new("button[type=submit]").by(By::Css))
//!         .transition("login", Target::page("app.HomePage"))
//! }
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use crate::config::TypeConfig;
use crate::driver::ElementHandle;
use crate::locator::{By, Locator};
use crate::page_object::{Component, Context};
use crate::result::{PageError, PageResult};
use crate::scope::Scope;
use crate::table::Table;
use crate::transition::{Target, TransitionMap};
use crate::value::ValueAccessor;

type BindFn = fn(&Scope, ElementHandle, Option<&Locator>) -> PageResult<Box<dyn Any>>;

/// Type information for a field that wraps its element in a component or table
#[derive(Clone)]
pub struct NestedType {
    type_id: TypeId,
    type_name: &'static str,
    table: bool,
    rows: Option<Locator>,
    bind: BindFn,
}

impl fmt::Debug for NestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedType")
            .field("type_name", &self.type_name)
            .field("table", &self.table)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl NestedType {
    fn component<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            table: false,
            rows: None,
            bind: bind_component::<C>,
        }
    }

    fn table<R: Component>(rows: Option<Locator>) -> Self {
        Self {
            type_id: TypeId::of::<Table<R>>(),
            type_name: type_name::<Table<R>>(),
            table: true,
            rows,
            bind: bind_table::<R>,
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub const fn is_table(&self) -> bool {
        self.table
    }

    /// Row locator declared on the field, if any
    #[must_use]
    pub const fn rows(&self) -> Option<&Locator> {
        self.rows.as_ref()
    }

    pub(crate) fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn bind(&self, parent: &Scope, handle: ElementHandle) -> PageResult<Box<dyn Any>> {
        (self.bind)(parent, handle, self.rows.as_ref())
    }
}

fn bind_component<C: Component>(
    parent: &Scope,
    handle: ElementHandle,
    _rows: Option<&Locator>,
) -> PageResult<Box<dyn Any>> {
    let context = Context::nested::<C>(parent.session(), handle)?;
    Ok(Box::new(C::from_context(context)))
}

fn bind_table<R: Component>(
    parent: &Scope,
    handle: ElementHandle,
    rows: Option<&Locator>,
) -> PageResult<Box<dyn Any>> {
    let rows = match rows {
        Some(rows) => rows.clone(),
        None => declaration::<R>()?.row_locator().cloned().ok_or_else(|| {
            PageError::declaration(
                type_name::<R>(),
                "table rows need a row locator on the field or the row type",
            )
        })?,
    };
    Ok(Box::new(Table::<R>::new(parent.within(handle), rows)))
}

/// What a resolved field turns into
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// The live element itself
    Element,
    /// A coerced semantic value
    Value(ValueAccessor),
    /// A nested component or table scoped to the element
    Nested(NestedType),
}

/// A declared, unresolved reference to one UI location
#[derive(Debug, Clone)]
pub struct ElementDescriptor {
    selector: String,
    by: Option<By>,
    timeout: Option<Duration>,
    strict: bool,
    visible: bool,
    kind: FieldKind,
}

impl ElementDescriptor {
    /// Field resolving to a raw element
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            by: None,
            timeout: None,
            strict: true,
            visible: true,
            kind: FieldKind::Element,
        }
    }

    /// Explicit location strategy
    #[must_use]
    pub const fn by(mut self, by: By) -> Self {
        self.by = Some(by);
        self
    }

    /// Explicit lookup timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Take the first match instead of failing on several
    #[must_use]
    pub const fn first_match(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Accept elements that are present but not displayed
    #[must_use]
    pub const fn allow_hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Resolve to a value using the element-kind mapping
    #[must_use]
    pub fn value(self) -> Self {
        self.value_with(ValueAccessor::Auto)
    }

    /// Resolve to a value using a specific accessor
    #[must_use]
    pub fn value_with(mut self, accessor: ValueAccessor) -> Self {
        self.kind = FieldKind::Value(accessor);
        self
    }

    /// Resolve to a `C` scoped to the element
    #[must_use]
    pub fn component<C: Component>(mut self) -> Self {
        self.kind = FieldKind::Nested(NestedType::component::<C>());
        self
    }

    /// Resolve to a [`Table`] of `R`, rows located by `R`'s declared row locator
    #[must_use]
    pub fn table<R: Component>(mut self) -> Self {
        self.kind = FieldKind::Nested(NestedType::table::<R>(None));
        self
    }

    /// Resolve to a [`Table`] of `R` with rows matching `rows`
    #[must_use]
    pub fn table_rows<R: Component>(mut self, rows: Locator) -> Self {
        self.kind = FieldKind::Nested(NestedType::table::<R>(Some(rows)));
        self
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Declared strategy, filled from the type default at build time
    #[must_use]
    pub const fn strategy(&self) -> Option<By> {
        self.by
    }

    #[must_use]
    pub const fn lookup_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub const fn requires_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Validated, immutable description of one component type
#[derive(Debug)]
pub struct Declaration {
    type_name: &'static str,
    default_by: Option<By>,
    default_timeout: Option<Duration>,
    row_locator: Option<Locator>,
    fields: BTreeMap<String, ElementDescriptor>,
    actions: BTreeSet<String>,
    transitions: TransitionMap,
}

impl Declaration {
    /// Start declaring `T`
    #[must_use]
    pub fn of<T: 'static>() -> DeclarationBuilder {
        DeclarationBuilder::new(type_name::<T>())
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub const fn default_by(&self) -> Option<By> {
        self.default_by
    }

    #[must_use]
    pub const fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Locator of the repeating container when this type is a table row
    #[must_use]
    pub const fn row_locator(&self) -> Option<&Locator> {
        self.row_locator.as_ref()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ElementDescriptor> {
        self.fields.get(name)
    }

    /// Declared field names, sorted
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains(name) || self.transitions.get(name).is_some()
    }

    #[must_use]
    pub const fn transitions(&self) -> &TransitionMap {
        &self.transitions
    }

    /// Field descriptor or a declaration error naming the type
    pub fn require_field(&self, name: &str) -> PageResult<&ElementDescriptor> {
        self.field(name).ok_or_else(|| {
            PageError::declaration(self.type_name, format!("no field named '{name}'"))
        })
    }
}

type DeclarationFn = fn() -> PageResult<Arc<Declaration>>;

/// Builder returned by [`Declaration::of`]
pub struct DeclarationBuilder {
    type_name: &'static str,
    default_by: Option<By>,
    default_timeout: Option<Duration>,
    row_locator: Option<Locator>,
    bases: Vec<DeclarationFn>,
    fields: Vec<(String, ElementDescriptor)>,
    actions: Vec<String>,
    transitions: Vec<(String, Target)>,
}

impl fmt::Debug for DeclarationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarationBuilder")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.len())
            .field("bases", &self.bases.len())
            .finish_non_exhaustive()
    }
}

impl DeclarationBuilder {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            default_by: None,
            default_timeout: None,
            row_locator: None,
            bases: Vec::new(),
            fields: Vec::new(),
            actions: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Strategy for this type's own fields that declare none
    #[must_use]
    pub const fn default_by(mut self, by: By) -> Self {
        self.default_by = Some(by);
        self
    }

    /// Lookup timeout for scopes of this type
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Apply loaded per-type settings
    #[must_use]
    pub fn configure(mut self, config: &TypeConfig) -> Self {
        if let Some(by) = config.default_by {
            self.default_by = Some(by);
        }
        if let Some(ms) = config.default_timeout_ms {
            self.default_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(rows) = &config.row_locator {
            self.row_locator = Some(rows.clone());
        }
        self
    }

    /// Locator of the repeating container when this type is used as a table row
    #[must_use]
    pub fn row_locator(mut self, rows: Locator) -> Self {
        self.row_locator = Some(rows);
        self
    }

    /// Merge the fields and transitions of `B`; this type's own entries win
    #[must_use]
    pub fn inherit<B: Component>(mut self) -> Self {
        self.bases.push(declaration::<B>);
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, descriptor: ElementDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    /// Record a plain (non-transition) action name
    #[must_use]
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.actions.push(name.into());
        self
    }

    /// Record the page(s) that follow an action
    #[must_use]
    pub fn transition(mut self, action: impl Into<String>, target: Target) -> Self {
        self.transitions.push((action.into(), target));
        self
    }

    /// Validate and freeze
    pub fn build(self) -> PageResult<Declaration> {
        let type_name = self.type_name;
        let fail = |message: String| PageError::declaration(type_name, message);

        let mut fields = BTreeMap::new();
        let mut transitions = TransitionMap::default();
        let mut default_timeout = self.default_timeout;
        let mut row_locator = self.row_locator;
        let mut actions = BTreeSet::new();
        for base in &self.bases {
            let base = base()?;
            for (name, descriptor) in &base.fields {
                let _ = fields.insert(name.clone(), descriptor.clone());
            }
            transitions.extend(base.transitions());
            actions.extend(base.actions.iter().cloned());
            default_timeout = default_timeout.or(base.default_timeout);
            row_locator = row_locator.or_else(|| base.row_locator.clone());
        }

        let mut own = BTreeSet::new();
        for (name, mut descriptor) in self.fields {
            if name.is_empty() {
                return Err(fail("field names cannot be empty".to_string()));
            }
            if !own.insert(name.clone()) {
                return Err(fail(format!("duplicate field '{name}'")));
            }
            if descriptor.selector.trim().is_empty() {
                return Err(fail(format!("field '{name}' has an empty selector")));
            }
            if descriptor.by.is_none() {
                descriptor.by = self.default_by;
            }
            let _ = fields.insert(name, descriptor);
        }

        actions.extend(self.actions);
        let mut own_transitions = BTreeSet::new();
        for (action, target) in self.transitions {
            if !own_transitions.insert(action.clone()) {
                return Err(fail(format!("duplicate transition for action '{action}'")));
            }
            target.validate().map_err(fail)?;
            transitions.insert(action, target);
        }

        for name in actions.iter().chain(transitions.actions()) {
            if fields.contains_key(name.as_str()) {
                return Err(fail(format!("'{name}' is declared as both a field and an action")));
            }
        }

        Ok(Declaration {
            type_name,
            default_by: self.default_by,
            default_timeout,
            row_locator,
            fields,
            actions,
            transitions,
        })
    }
}

fn registry() -> &'static RwLock<HashMap<TypeId, Arc<Declaration>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<TypeId, Arc<Declaration>>>> = OnceLock::new();
    REGISTRY.get_or_init(RwLock::default)
}

/// The cached declaration of `T`, built on first use
pub fn declaration<T: Component>() -> PageResult<Arc<Declaration>> {
    let id = TypeId::of::<T>();
    let cached = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned();
    if let Some(declaration) = cached {
        return Ok(declaration);
    }

    let built = Arc::new(T::declare().build()?);
    tracing::debug!(
        "Declared {} ({} fields)",
        built.type_name(),
        built.fields.len()
    );
    let mut cache = registry().write().unwrap_or_else(PoisonError::into_inner);
    Ok(cache.entry(id).or_insert(built).clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::transition::PageName;

    struct Base(Context);

    impl Component for Base {
        fn declare() -> DeclarationBuilder {
            Declaration::of::<Self>()
                .default_by(By::Id)
                .default_timeout(Duration::from_millis(250))
                .field("header", ElementDescriptor::new("top"))
                .field("logout", ElementDescriptor::new("Sign out").by(By::LinkText))
                .action("refresh")
                .transition("sign_out", Target::page("app.LoginPage"))
        }

        fn from_context(context: Context) -> Self {
            Self(context)
        }

        fn context(&self) -> &Context {
            &self.0
        }
    }

    struct Child(Context);

    impl Component for Child {
        fn declare() -> DeclarationBuilder {
            Declaration::of::<Self>()
                .inherit::<Base>()
                .field("header", ElementDescriptor::new("header.main"))
                .field("name", ElementDescriptor::new("#name").value())
        }

        fn from_context(context: Context) -> Self {
            Self(context)
        }

        fn context(&self) -> &Context {
            &self.0
        }
    }

    mod descriptor_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let d = ElementDescriptor::new("#total");
            assert_eq!(d.selector(), "#total");
            assert_eq!(d.strategy(), None);
            assert!(d.is_strict());
            assert!(d.requires_visible());
            assert!(matches!(d.kind(), FieldKind::Element));
        }

        #[test]
        fn test_builder_flags() {
            let d = ElementDescriptor::new("li")
                .by(By::TagName)
                .timeout(Duration::from_millis(5))
                .first_match()
                .allow_hidden()
                .value_with(ValueAccessor::Number);
            assert_eq!(d.strategy(), Some(By::TagName));
            assert_eq!(d.lookup_timeout(), Some(Duration::from_millis(5)));
            assert!(!d.is_strict());
            assert!(!d.requires_visible());
            assert!(matches!(d.kind(), FieldKind::Value(ValueAccessor::Number)));
        }

        #[test]
        fn test_nested_kinds() {
            let d = ElementDescriptor::new("nav").component::<Base>();
            let FieldKind::Nested(nested) = d.kind() else {
                panic!("expected nested kind");
            };
            assert!(nested.is::<Base>());
            assert!(!nested.is_table());

            let d = ElementDescriptor::new("table").table_rows::<Base>(Locator::css("tr"));
            let FieldKind::Nested(nested) = d.kind() else {
                panic!("expected nested kind");
            };
            assert!(nested.is::<Table<Base>>());
            assert_eq!(nested.rows(), Some(&Locator::css("tr")));
        }
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_default_by_fills_own_fields_only() {
            let decl = Base::declare().build().unwrap();
            assert_eq!(decl.field("header").unwrap().strategy(), Some(By::Id));
            assert_eq!(decl.field("logout").unwrap().strategy(), Some(By::LinkText));
        }

        #[test]
        fn test_inherit_merges_and_overrides() {
            let decl = Child::declare().build().unwrap();
            assert_eq!(decl.field("header").unwrap().selector(), "header.main");
            assert_eq!(decl.field("header").unwrap().strategy(), None);
            assert_eq!(decl.field("logout").unwrap().strategy(), Some(By::LinkText));
            assert!(decl.has_action("sign_out"));
            assert!(decl.has_action("refresh"));
            assert_eq!(decl.default_timeout(), Some(Duration::from_millis(250)));
            assert_eq!(decl.default_by(), None);
            let names: Vec<&str> = decl.field_names().collect();
            assert_eq!(names, vec!["header", "logout", "name"]);
        }

        #[test]
        fn test_duplicate_field_rejected() {
            let err = Declaration::of::<Base>()
                .field("a", ElementDescriptor::new("#a"))
                .field("a", ElementDescriptor::new("#b"))
                .build()
                .unwrap_err();
            assert!(matches!(err, PageError::DeclarationError { .. }));
        }

        #[test]
        fn test_field_action_overlap_rejected() {
            let err = Declaration::of::<Base>()
                .field("submit", ElementDescriptor::new("#submit"))
                .action("submit")
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("both a field and an action"));

            let err = Declaration::of::<Base>()
                .field("login", ElementDescriptor::new("#login"))
                .transition("login", Target::page("app.Home"))
                .build()
                .unwrap_err();
            assert!(matches!(err, PageError::DeclarationError { .. }));
        }

        #[test]
        fn test_field_overlapping_inherited_action_rejected() {
            let err = Declaration::of::<Child>()
                .inherit::<Base>()
                .field("refresh", ElementDescriptor::new("button.refresh"))
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("'refresh' is declared as both"));

            let err = Declaration::of::<Child>()
                .inherit::<Base>()
                .field("sign_out", ElementDescriptor::new("#sign-out"))
                .build()
                .unwrap_err();
            assert!(matches!(err, PageError::DeclarationError { .. }));
        }

        #[test]
        fn test_empty_selector_rejected() {
            assert!(Declaration::of::<Base>()
                .field("blank", ElementDescriptor::new("  "))
                .build()
                .is_err());
        }

        #[test]
        fn test_invalid_page_name_rejected() {
            assert!(Declaration::of::<Base>()
                .transition("go", Target::page("app..Broken"))
                .build()
                .is_err());
        }

        #[test]
        fn test_configure_applies_type_config() {
            let config = TypeConfig {
                default_by: Some(By::Name),
                default_timeout_ms: Some(40),
                row_locator: Some(Locator::css("li")),
            };
            let decl = Declaration::of::<Base>()
                .configure(&config)
                .field("q", ElementDescriptor::new("q"))
                .build()
                .unwrap();
            assert_eq!(decl.field("q").unwrap().strategy(), Some(By::Name));
            assert_eq!(decl.default_timeout(), Some(Duration::from_millis(40)));
            assert_eq!(decl.row_locator(), Some(&Locator::css("li")));
        }

        #[test]
        fn test_require_field_names_type() {
            let decl = Base::declare().build().unwrap();
            let err = decl.require_field("missing").unwrap_err();
            assert!(err.to_string().contains("missing"));
        }
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn test_declaration_is_cached() {
            let a = declaration::<Child>().unwrap();
            let b = declaration::<Child>().unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert!(a
                .transitions()
                .get("sign_out")
                .is_some_and(|t| t.page_names().contains(&&PageName::new("app.LoginPage"))));
        }
    }
}
