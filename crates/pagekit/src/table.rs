//! Repeating-row structures.
//!
//! A [`Table`] never materializes its rows. Length, indexing, iteration and
//! queries each re-query the DOM and wrap the current row containers as
//! fresh row components.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::declaration::{declaration, Declaration, FieldKind};
use crate::driver::ElementHandle;
use crate::locator::Locator;
use crate::page_object::{Component, Context};
use crate::result::{PageError, PageResult};
use crate::scope::Scope;
use crate::session::Session;
use crate::value::Value;

/// Rows of `R` inside a container element
pub struct Table<R> {
    scope: Scope,
    rows: Locator,
    _row: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for Table<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("row_type", &type_name::<R>())
            .field("rows", &self.rows)
            .field("root", &self.scope.root())
            .finish()
    }
}

impl<R: Component> Table<R> {
    /// Table whose rows match `rows` within `scope`
    #[must_use]
    pub fn new(scope: Scope, rows: Locator) -> Self {
        Self {
            scope,
            rows,
            _row: PhantomData,
        }
    }

    #[must_use]
    pub const fn row_locator(&self) -> &Locator {
        &self.rows
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    fn handles(&self) -> PageResult<Vec<ElementHandle>> {
        self.scope.find_all(&self.rows)
    }

    /// Live row count
    pub fn len(&self) -> PageResult<usize> {
        Ok(self.handles()?.len())
    }

    pub fn is_empty(&self) -> PageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Fresh component for the row at `index` in document order
    pub fn get(&self, index: usize) -> PageResult<R> {
        let mut handles = self.handles()?;
        let count = handles.len();
        if index >= count {
            return Err(PageError::IndexOutOfRange { index, count });
        }
        let handle = handles.swap_remove(index);
        Ok(R::from_context(Context::nested::<R>(self.scope.session(), handle)?))
    }

    /// Lazy iterator over the rows present now; call again to re-query
    pub fn rows(&self) -> PageResult<Rows<R>> {
        Ok(Rows {
            session: self.scope.session().clone(),
            declaration: declaration::<R>()?,
            handles: self.handles()?.into_iter(),
            _row: PhantomData,
        })
    }

    /// Rows passing every filter, in document order
    pub fn query(&self, query: &Query<R>) -> PageResult<Vec<R>> {
        let mut matched = Vec::new();
        for row in self.rows()? {
            if query.accepts(&row)? {
                matched.push(row);
            }
        }
        tracing::debug!(
            "Query on {} matched {} rows",
            type_name::<R>(),
            matched.len()
        );
        Ok(matched)
    }

    /// First row passing every filter; later rows are not read
    pub fn query_first(&self, query: &Query<R>) -> PageResult<Option<R>> {
        for row in self.rows()? {
            if query.accepts(&row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

/// Iterator returned by [`Table::rows`]
pub struct Rows<R> {
    session: Session,
    declaration: Arc<Declaration>,
    handles: std::vec::IntoIter<ElementHandle>,
    _row: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for Rows<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("row_type", &type_name::<R>())
            .field("remaining", &self.handles.len())
            .finish()
    }
}

impl<R: Component> Iterator for Rows<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        let handle = self.handles.next()?;
        let scope = Scope::new(&self.session, Some(handle), &self.declaration);
        Some(R::from_context(Context::new(scope, self.declaration.clone())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

impl<R: Component> ExactSizeIterator for Rows<R> {}

// =============================================================================
// QUERY
// =============================================================================

/// One row filter
pub enum Filter {
    /// The row's value equals this literal, after coercion to its kind
    Equals(Value),
    /// The predicate accepts the row's value
    Matches(Box<dyn Fn(&Value) -> bool>),
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::Matches(_) => f.write_str("Matches(..)"),
        }
    }
}

impl Filter {
    #[must_use]
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Self::Equals(literal) => value.matches_literal(literal),
            Self::Matches(predicate) => predicate(value),
        }
    }
}

/// Field filters over rows of `R`, combined with AND
pub struct Query<R> {
    filters: Vec<(String, Filter)>,
    _row: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("row_type", &type_name::<R>())
            .field("filters", &self.filters)
            .finish()
    }
}

impl<R: Component> Default for Query<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Component> Query<R> {
    /// Query with no filters: every row matches
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            _row: PhantomData,
        }
    }

    /// Add a filter; `field` must be a declared, non-nested field of `R`
    pub fn filter(mut self, field: &str, filter: Filter) -> PageResult<Self> {
        let declaration = declaration::<R>()?;
        let descriptor = declaration.require_field(field)?;
        if let FieldKind::Nested(nested) = descriptor.kind() {
            return Err(PageError::declaration(
                declaration.type_name(),
                format!("cannot filter on '{field}', a {}", nested.type_name()),
            ));
        }
        self.filters.push((field.to_string(), filter));
        Ok(self)
    }

    /// Row value at `field` equals `value`
    pub fn equals(self, field: &str, value: impl Into<Value>) -> PageResult<Self> {
        self.filter(field, Filter::Equals(value.into()))
    }

    /// `predicate` accepts the row value at `field`
    pub fn matching(
        self,
        field: &str,
        predicate: impl Fn(&Value) -> bool + 'static,
    ) -> PageResult<Self> {
        self.filter(field, Filter::Matches(Box::new(predicate)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluate filters in order, stopping at the first failure
    pub fn accepts(&self, row: &R) -> PageResult<bool> {
        for (field, filter) in &self.filters {
            if !filter.test(&row.value(field)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::declaration::{DeclarationBuilder, ElementDescriptor};
    use crate::driver::{Driver, MockDriver, MockElement};
    use crate::value::ValueAccessor;
    use proptest::prelude::*;

    #[derive(Debug)]
    struct Invoice(Context);

    impl Component for Invoice {
        fn declare() -> DeclarationBuilder {
            Declaration::of::<Self>()
                .row_locator(Locator::css("tbody tr"))
                .field("paid", ElementDescriptor::new("td.paid").value())
                .field("total", ElementDescriptor::new("td.total").value_with(ValueAccessor::Number))
                .field("pay", ElementDescriptor::new("input.pay"))
                .field("details", ElementDescriptor::new("td.more").component::<Invoice>())
        }

        fn from_context(context: Context) -> Self {
            Self(context)
        }

        fn context(&self) -> &Context {
            &self.0
        }
    }

    fn fixture(rows: &[(bool, u32)]) -> (Arc<MockDriver>, Table<Invoice>) {
        let driver = Arc::new(MockDriver::new());
        let session = Session::builder(driver.clone())
            .config(SessionConfig::new().with_timeout(20).with_poll_interval(1))
            .build();
        let table = driver.add(None, MockElement::new("table").css("table"));
        let body = driver.add(Some(&table), MockElement::new("tbody"));
        for (paid, total) in rows {
            let tr = driver.add(Some(&body), MockElement::new("tr").css("tbody tr"));
            let paid = if *paid { "Yes" } else { "No" };
            let _ = driver.add(Some(&tr), MockElement::new("td").css("td.paid").text(paid));
            let _ = driver.add(
                Some(&tr),
                MockElement::new("td").css("td.total").text(total.to_string()),
            );
        }
        let declaration = declaration::<Invoice>().unwrap();
        let scope = Scope::new(&session, Some(table), &declaration);
        (driver, Table::new(scope, Locator::css("tbody tr")))
    }

    mod index_tests {
        use super::*;

        #[test]
        fn test_len_and_get() {
            let (_driver, table) = fixture(&[(false, 150), (true, 200)]);
            assert_eq!(table.len().unwrap(), 2);
            assert!(!table.is_empty().unwrap());
            assert_eq!(table.get(1).unwrap().value("total").unwrap(), Value::Number(200.0));
        }

        #[test]
        fn test_get_out_of_range() {
            let (_driver, table) = fixture(&[(false, 1)]);
            let err = table.get(1).unwrap_err();
            assert!(matches!(err, PageError::IndexOutOfRange { index: 1, count: 1 }));
        }

        #[test]
        fn test_rows_are_scoped_to_their_container() {
            let (_driver, table) = fixture(&[(false, 10), (false, 20), (true, 30)]);
            let totals: Vec<Value> = table
                .rows()
                .unwrap()
                .map(|row| row.value("total").unwrap())
                .collect();
            assert_eq!(totals, vec![Value::Number(10.0), Value::Number(20.0), Value::Number(30.0)]);
            assert_eq!(table.rows().unwrap().len(), 3);
        }

        #[test]
        fn test_rows_reflect_live_dom() {
            let (driver, table) = fixture(&[(false, 10)]);
            let rows = driver.find_elements(&Locator::css("tbody tr"), None).unwrap();
            assert_eq!(table.rows().unwrap().len(), 1);
            driver.with_dom(|dom| dom.remove(&rows[0]));
            assert_eq!(table.rows().unwrap().len(), 0);
            assert!(table.is_empty().unwrap());
        }

        proptest! {
            #[test]
            fn prop_index_bounds(n in 0usize..6, i in 0usize..10) {
                let rows: Vec<(bool, u32)> = (0..n).map(|k| (false, k as u32)).collect();
                let (_driver, table) = fixture(&rows);
                let result = table.get(i);
                if i < n {
                    prop_assert!(result.is_ok());
                } else {
                    let is_out_of_range = matches!(result, Err(PageError::IndexOutOfRange { .. }));
                    prop_assert!(is_out_of_range);
                }
            }
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_empty_query_returns_all_rows() {
            let (_driver, table) = fixture(&[(false, 1), (true, 2), (false, 3)]);
            assert_eq!(table.query(&Query::new()).unwrap().len(), 3);
        }

        #[test]
        fn test_literal_and_predicate_intersection() {
            let (_driver, table) = fixture(&[(false, 150), (true, 200), (false, 50)]);
            let query = Query::new()
                .equals("paid", false)
                .unwrap()
                .matching("total", |v| v.as_f64().is_some_and(|t| t > 100.0))
                .unwrap();
            let rows = table.query(&query).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].value("total").unwrap(), Value::Number(150.0));
        }

        #[test]
        fn test_literal_only() {
            let (_driver, table) = fixture(&[(false, 150), (true, 200), (false, 50)]);
            let query = Query::new().equals("paid", false).unwrap();
            let totals: Vec<Value> = table
                .query(&query)
                .unwrap()
                .iter()
                .map(|row| row.value("total").unwrap())
                .collect();
            assert_eq!(totals, vec![Value::Number(150.0), Value::Number(50.0)]);
        }

        #[test]
        fn test_query_first() {
            let (_driver, table) = fixture(&[(true, 5), (false, 6), (false, 7)]);
            let query = Query::new().equals("paid", false).unwrap();
            let row = table.query_first(&query).unwrap().unwrap();
            assert_eq!(row.value("total").unwrap(), Value::Number(6.0));
            let none = Query::new().equals("total", 99).unwrap();
            assert!(table.query_first(&none).unwrap().is_none());
        }

        #[test]
        fn test_undeclared_field_rejected_immediately() {
            let err = Query::<Invoice>::new().equals("amount", 1).unwrap_err();
            assert!(matches!(err, PageError::DeclarationError { .. }));
        }

        #[test]
        fn test_nested_field_rejected() {
            assert!(Query::<Invoice>::new().equals("details", 1).is_err());
        }

        #[test]
        fn test_filter_debug() {
            let query = Query::<Invoice>::new()
                .equals("paid", true)
                .unwrap()
                .matching("total", |_| true)
                .unwrap();
            assert_eq!(query.len(), 2);
            assert!(format!("{query:?}").contains("Matches(..)"));
        }
    }
}
