//! Locator abstraction for element selection.
//!
//! A [`Locator`] pairs a location strategy ([`By`]) with a selector string.
//! It carries no handle; resolution always happens fresh against a
//! [`Scope`](crate::Scope).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::result::PageError;

/// Default timeout for element lookup and waits (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval for bounded polls (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Location strategy for finding elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum By {
    /// CSS selector (e.g., "button.primary")
    #[default]
    Css,
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
    /// Exact link text
    #[serde(alias = "link_text")]
    LinkText,
    /// Substring of link text
    #[serde(alias = "partial_link_text")]
    PartialLinkText,
    /// Tag name
    #[serde(alias = "tag_name")]
    TagName,
    /// `id` attribute
    Id,
    /// `name` attribute
    Name,
    /// Single class name
    #[serde(alias = "class_name")]
    ClassName,
}

impl By {
    /// W3C WebDriver strategy name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
            Self::LinkText => "link text",
            Self::PartialLinkText => "partial link text",
            Self::TagName => "tag name",
            Self::Id => "id",
            Self::Name => "name",
            Self::ClassName => "class name",
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for By {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "css" | "css selector" => Ok(Self::Css),
            "xpath" => Ok(Self::XPath),
            "link text" => Ok(Self::LinkText),
            "partial link text" => Ok(Self::PartialLinkText),
            "tag" | "tag name" => Ok(Self::TagName),
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "class" | "class name" => Ok(Self::ClassName),
            other => Err(PageError::ConfigError {
                message: format!("unknown location strategy '{other}'"),
            }),
        }
    }
}

/// A strategy plus selector identifying one or more elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Location strategy
    pub by: By,
    /// Selector interpreted according to `by`
    pub selector: String,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(by: By, selector: impl Into<String>) -> Self {
        Self {
            by,
            selector: selector.into(),
        }
    }

    /// CSS selector locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(By::Css, selector)
    }

    /// XPath locator
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(By::XPath, selector)
    }

    /// Link text locator
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::new(By::LinkText, text)
    }

    /// Tag name locator
    #[must_use]
    pub fn tag_name(tag: impl Into<String>) -> Self {
        Self::new(By::TagName, tag)
    }

    /// `id` attribute locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::new(By::Id, id)
    }

    /// `name` attribute locator
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::new(By::Name, name)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.by, self.selector)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod by_tests {
        use super::*;

        #[test]
        fn test_w3c_names() {
            assert_eq!(By::Css.as_str(), "css selector");
            assert_eq!(By::LinkText.as_str(), "link text");
            assert_eq!(By::TagName.to_string(), "tag name");
        }

        #[test]
        fn test_parse_aliases() {
            assert_eq!("css".parse::<By>().unwrap(), By::Css);
            assert_eq!("link_text".parse::<By>().unwrap(), By::LinkText);
            assert_eq!("Tag-Name".parse::<By>().unwrap(), By::TagName);
            assert_eq!("xpath".parse::<By>().unwrap(), By::XPath);
            assert!("shadow".parse::<By>().is_err());
        }

        #[test]
        fn test_serde_kebab_case() {
            let json = serde_json::to_string(&By::PartialLinkText).unwrap();
            assert_eq!(json, "\"partial-link-text\"");
            let back: By = serde_json::from_str("\"class-name\"").unwrap();
            assert_eq!(back, By::ClassName);
        }

        #[test]
        fn test_yaml_names_match_parse() {
            let all = [
                By::Css,
                By::XPath,
                By::LinkText,
                By::PartialLinkText,
                By::TagName,
                By::Id,
                By::Name,
                By::ClassName,
            ];
            for by in all {
                let yaml = serde_yaml_ng::to_string(&by).unwrap();
                let back: By = serde_yaml_ng::from_str(&yaml).unwrap();
                assert_eq!(back, by);
                assert_eq!(yaml.trim().parse::<By>().unwrap(), by);
            }
            assert_eq!(serde_yaml_ng::to_string(&By::XPath).unwrap().trim(), "xpath");
            let snake: By = serde_yaml_ng::from_str("link_text").unwrap();
            assert_eq!(snake, By::LinkText);
        }

        #[test]
        fn test_default_is_css() {
            assert_eq!(By::default(), By::Css);
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_constructors() {
            assert_eq!(Locator::css("tbody tr").by, By::Css);
            assert_eq!(Locator::link_text("Bookings").by, By::LinkText);
            assert_eq!(Locator::id("email").selector, "email");
            assert_eq!(Locator::tag_name("aside").by, By::TagName);
        }

        #[test]
        fn test_display() {
            assert_eq!(Locator::css("td:nth-child(2)").to_string(), "css selector=td:nth-child(2)");
        }
    }
}
