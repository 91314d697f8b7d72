//! Live element handles bound to a session.

use std::fmt;

use crate::driver::ElementHandle;
use crate::locator::Locator;
use crate::result::{PageError, PageResult};
use crate::session::Session;
use crate::value::{self, Value, ValueAccessor};

/// A resolved element: driver handle, the locator it was found by and the
/// session it lives in.
///
/// Handles are never cached by page objects. Every field access produces a
/// new `WebElement`.
#[derive(Clone)]
pub struct WebElement {
    session: Session,
    handle: ElementHandle,
    locator: Locator,
}

impl fmt::Debug for WebElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebElement")
            .field("handle", &self.handle)
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

impl WebElement {
    /// Wrap a driver handle
    #[must_use]
    pub fn new(session: Session, handle: ElementHandle, locator: Locator) -> Self {
        Self {
            session,
            handle,
            locator,
        }
    }

    /// Driver handle
    #[must_use]
    pub const fn handle(&self) -> &ElementHandle {
        &self.handle
    }

    /// Locator this element was resolved from
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Owning session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub fn click(&self) -> PageResult<()> {
        Ok(self.session.driver().click(&self.handle)?)
    }

    pub fn send_keys(&self, text: &str) -> PageResult<()> {
        Ok(self.session.driver().send_keys(&self.handle, text)?)
    }

    pub fn clear(&self) -> PageResult<()> {
        Ok(self.session.driver().clear(&self.handle)?)
    }

    pub fn text(&self) -> PageResult<String> {
        Ok(self.session.driver().text(&self.handle)?)
    }

    pub fn attribute(&self, name: &str) -> PageResult<Option<String>> {
        Ok(self.session.driver().attribute(&self.handle, name)?)
    }

    pub fn tag_name(&self) -> PageResult<String> {
        Ok(self.session.driver().tag_name(&self.handle)?.to_ascii_lowercase())
    }

    pub fn is_selected(&self) -> PageResult<bool> {
        Ok(self.session.driver().is_selected(&self.handle)?)
    }

    pub fn is_displayed(&self) -> PageResult<bool> {
        Ok(self.session.driver().is_displayed(&self.handle)?)
    }

    /// Lower-case `type` attribute, if any
    pub fn input_type(&self) -> PageResult<Option<String>> {
        Ok(self.attribute("type")?.map(|t| t.to_ascii_lowercase()))
    }

    /// Descendants matching `locator`, in document order
    pub fn find_all(&self, locator: &Locator) -> PageResult<Vec<Self>> {
        let handles = self
            .session
            .driver()
            .find_elements(locator, Some(&self.handle))?;
        Ok(handles
            .into_iter()
            .map(|h| Self::new(self.session.clone(), h, locator.clone()))
            .collect())
    }

    fn options(&self) -> PageResult<Vec<Self>> {
        self.find_all(&Locator::tag_name("option"))
    }

    /// Choose the `<option>` whose trimmed text equals `text`
    pub fn select_by_visible_text(&self, text: &str) -> PageResult<()> {
        for option in self.options()? {
            if option.text()?.trim() == text.trim() {
                tracing::debug!("Selecting option '{}' in {}", text, self.locator);
                return option.click();
            }
        }
        Err(PageError::ElementNotFound {
            locator: format!("{} option[text='{}']", self.locator, text),
            timeout_ms: 0,
        })
    }

    /// Trimmed text of the first selected `<option>`
    pub fn selected_option_text(&self) -> PageResult<Option<String>> {
        for option in self.options()? {
            if option.is_selected()? {
                return Ok(Some(option.text()?.trim().to_string()));
            }
        }
        Ok(None)
    }

    /// Read a semantic value
    pub fn read(&self, accessor: &ValueAccessor) -> PageResult<Value> {
        accessor.read(self)
    }

    /// Assign a semantic value
    pub fn write(&self, value: &Value) -> PageResult<()> {
        value::write(self, value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use std::sync::Arc;

    fn setup() -> (Arc<MockDriver>, Session) {
        let driver = Arc::new(MockDriver::new());
        let session = Session::new(driver.clone());
        (driver, session)
    }

    fn wrap(session: &Session, handle: ElementHandle) -> WebElement {
        WebElement::new(session.clone(), handle, Locator::css("test"))
    }

    mod read_tests {
        use super::*;

        #[test]
        fn test_auto_reads_input_value() {
            let (driver, session) = setup();
            let h = driver.add(None, MockElement::new("input").attr("value", "alice"));
            let value = wrap(&session, h).read(&ValueAccessor::Auto).unwrap();
            assert_eq!(value, Value::from("alice"));
        }

        #[test]
        fn test_auto_reads_checkbox_state() {
            let (driver, session) = setup();
            let h = driver.add(
                None,
                MockElement::new("input").attr("type", "checkbox").selected(true),
            );
            assert_eq!(wrap(&session, h).read(&ValueAccessor::Auto).unwrap(), Value::Bool(true));
        }

        #[test]
        fn test_auto_reads_selected_option() {
            let (driver, session) = setup();
            let select = driver.add(None, MockElement::new("select"));
            let _ = driver.add(Some(&select), MockElement::new("option").text("Economy"));
            let _ = driver.add(Some(&select), MockElement::new("option").text(" Business ").selected(true));
            assert_eq!(
                wrap(&session, select).read(&ValueAccessor::Auto).unwrap(),
                Value::from("Business")
            );
        }

        #[test]
        fn test_auto_reads_trimmed_text() {
            let (driver, session) = setup();
            let h = driver.add(None, MockElement::new("td").text("  Smith \n"));
            assert_eq!(wrap(&session, h).read(&ValueAccessor::Auto).unwrap(), Value::from("Smith"));
        }

        #[test]
        fn test_number_and_attribute_accessors() {
            let (driver, session) = setup();
            let h = driver.add(None, MockElement::new("td").text("$1,200").attr("data-id", "7"));
            let el = wrap(&session, h);
            assert_eq!(el.read(&ValueAccessor::Number).unwrap(), Value::Number(1200.0));
            assert_eq!(
                el.read(&ValueAccessor::Attribute("data-id".into())).unwrap(),
                Value::from("7")
            );
            assert_eq!(
                el.read(&ValueAccessor::Attribute("missing".into())).unwrap(),
                Value::from("")
            );
        }
    }

    mod write_tests {
        use super::*;

        #[test]
        fn test_text_write_clears_then_types() {
            let (driver, session) = setup();
            let h = driver.add(None, MockElement::new("input").attr("value", "old"));
            wrap(&session, h.clone()).write(&Value::from("new")).unwrap();
            assert_eq!(driver.attribute_of(&h, "value"), Some("new".to_string()));
            let history = driver.history();
            let clear = history.iter().position(|c| c.starts_with("clear:")).unwrap();
            let keys = history.iter().position(|c| c.starts_with("send_keys:")).unwrap();
            assert!(clear < keys);
        }

        #[test]
        fn test_checkbox_write_is_idempotent() {
            let (driver, session) = setup();
            let h = driver.add(None, MockElement::new("input").attr("type", "checkbox"));
            let el = wrap(&session, h.clone());
            el.write(&Value::Bool(true)).unwrap();
            assert_eq!(driver.count("click:"), 1);
            el.write(&Value::Bool(true)).unwrap();
            assert_eq!(driver.count("click:"), 1);
            assert!(driver.selected_of(&h));
        }

        #[test]
        fn test_radio_false_does_nothing() {
            let (driver, session) = setup();
            let h = driver.add(None, MockElement::new("input").attr("type", "radio"));
            wrap(&session, h).write(&Value::Bool(false)).unwrap();
            assert!(!driver.was_called("click:"));
        }

        #[test]
        fn test_select_by_visible_text() {
            let (driver, session) = setup();
            let select = driver.add(None, MockElement::new("select"));
            let a = driver.add(Some(&select), MockElement::new("option").text("A").selected(true));
            let b = driver.add(Some(&select), MockElement::new("option").text("B"));
            let el = wrap(&session, select);
            el.write(&Value::from("B")).unwrap();
            assert!(driver.selected_of(&b));
            assert!(!driver.selected_of(&a));

            let err = el.write(&Value::from("C")).unwrap_err();
            assert!(matches!(err, PageError::ElementNotFound { .. }));
        }
    }
}
