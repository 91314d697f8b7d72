//! Semantic values read from and written to elements.
//!
//! Reads go through a [`ValueAccessor`]; writes always dispatch on the
//! element's kind (select, checkbox, radio, anything else).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::element::WebElement;
use crate::result::{PageError, PageResult};

/// A value coerced from element content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Checked/selected state or a boolean literal
    Bool(bool),
    /// Numeric content
    Number(f64),
    /// Textual content
    Text(String),
}

impl Value {
    /// Name of the variant, for messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }

    /// Borrow the text if this is a `Text` value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean if this is a `Bool` value
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number if this is a `Number` value
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form, as typed into inputs
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Coerce to a boolean.
    ///
    /// Text maps `true/yes/on/1/checked` and `false/no/off/0/""`
    /// (case-insensitive); numbers are true when non-zero.
    pub fn to_bool(&self) -> PageResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Number(n) => Ok(*n != 0.0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" | "checked" => Ok(true),
                "false" | "no" | "off" | "0" | "" => Ok(false),
                _ => Err(PageError::ValueCoercion {
                    value: s.clone(),
                    expected: "bool",
                }),
            },
        }
    }

    /// Coerce to a number (see [`parse_number`])
    pub fn to_number(&self) -> PageResult<f64> {
        match self {
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Ok(*n),
            Self::Text(s) => parse_number(s),
        }
    }

    /// Compare against a literal after coercing `self` into the literal's kind.
    ///
    /// A value that cannot be coerced never matches.
    #[must_use]
    pub fn matches_literal(&self, literal: &Self) -> bool {
        match literal {
            Self::Bool(expected) => self.to_bool().is_ok_and(|b| b == *expected),
            Self::Number(expected) => self.to_number().is_ok_and(|n| n == *expected),
            Self::Text(expected) => self.to_text().trim() == expected.trim(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("number pattern is valid"))
}

/// Extract the first number in `text`.
///
/// Thousands separators are dropped, so `"$1,250.50 due"` reads as `1250.5`.
pub fn parse_number(text: &str) -> PageResult<f64> {
    number_pattern()
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .ok_or_else(|| PageError::ValueCoercion {
            value: text.to_string(),
            expected: "number",
        })
}

/// How a value field reads its element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueAccessor {
    /// Pick by element kind: select → selected option text, checkbox/radio →
    /// checked state, input/textarea → `value`, otherwise trimmed text
    #[default]
    Auto,
    /// Trimmed text content
    Text,
    /// An attribute, empty text when absent
    Attribute(String),
    /// Selected/checked state
    Checked,
    /// [`Auto`](Self::Auto) coerced to a number
    Number,
}

impl ValueAccessor {
    /// Read `element` through this accessor
    pub fn read(&self, element: &WebElement) -> PageResult<Value> {
        match self {
            Self::Auto => read_auto(element),
            Self::Text => Ok(Value::Text(element.text()?.trim().to_string())),
            Self::Attribute(name) => Ok(Value::Text(element.attribute(name)?.unwrap_or_default())),
            Self::Checked => Ok(Value::Bool(element.is_selected()?)),
            Self::Number => read_auto(element)?.to_number().map(Value::Number),
        }
    }
}

fn read_auto(element: &WebElement) -> PageResult<Value> {
    let tag = element.tag_name()?;
    if tag == "select" {
        return Ok(Value::Text(element.selected_option_text()?.unwrap_or_default()));
    }
    match (tag.as_str(), element.input_type()?.as_deref()) {
        ("input", Some("checkbox" | "radio")) => Ok(Value::Bool(element.is_selected()?)),
        ("input" | "textarea", _) => Ok(Value::Text(
            element.attribute("value")?.unwrap_or_default(),
        )),
        _ => Ok(Value::Text(element.text()?.trim().to_string())),
    }
}

/// Assign `value` to `element`.
///
/// - `<select>`: choose the option with that visible text
/// - checkbox: click only when the current state differs
/// - radio: click only when set to true
/// - anything else: clear, then type the text form
pub fn write(element: &WebElement, value: &Value) -> PageResult<()> {
    let tag = element.tag_name()?;
    if tag == "select" {
        return element.select_by_visible_text(&value.to_text());
    }
    match (tag.as_str(), element.input_type()?.as_deref()) {
        ("input", Some("checkbox")) => {
            let desired = value.to_bool()?;
            if element.is_selected()? != desired {
                tracing::debug!("Clicking checkbox {}", element.locator());
                element.click()?;
            }
            Ok(())
        }
        ("input", Some("radio")) => {
            if value.to_bool()? {
                element.click()?;
            }
            Ok(())
        }
        _ => {
            tracing::debug!("Entering '{}' into {}", value, element.locator());
            element.clear()?;
            element.send_keys(&value.to_text())
        }
    }
}
