//! Typed Playwright locators
//!
//! A `Locator` describes how to find an element and renders itself into the
//! Playwright JavaScript expression the driver evaluates against `page`.
//! String arguments go through JSON encoding so quotes and backslashes in
//! labels can never break out of the expression.

use std::fmt;

/// How text in a role name, text or filter is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// Playwright string matching: case-insensitive substring unless `exact`
    Text(String),
    /// Case-insensitive regular expression source
    Pattern(String),
}

impl TextMatch {
    pub fn text(s: impl Into<String>) -> Self {
        TextMatch::Text(s.into())
    }

    pub fn pattern(s: impl Into<String>) -> Self {
        TextMatch::Pattern(s.into())
    }

    /// Pattern matching `s` literally
    pub fn literal_pattern(s: &str) -> Self {
        TextMatch::Pattern(regex::escape(s))
    }

    fn to_js(&self) -> String {
        match self {
            TextMatch::Text(s) => js_string(s),
            TextMatch::Pattern(p) => format!("new RegExp({}, 'i')", js_string(p)),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(s: &str) -> Self {
        TextMatch::Text(s.to_string())
    }
}

/// Which element to take from a multi-element match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
    Nth(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `page.getByRole(role, { name, exact })`
    Role {
        role: String,
        name: TextMatch,
        exact: bool,
    },
    /// `page.getByText(text)`
    Text(TextMatch),
    /// `page.getByLabel(text)`
    Label(TextMatch),
    /// `page.locator(selector)`
    Css(String),
    /// `parent.locator(selector)`, e.g. `xpath=..`
    Within {
        parent: Box<Locator>,
        selector: String,
    },
    /// `inner.filter({ hasText, has })`
    Filter {
        inner: Box<Locator>,
        has_text: Option<TextMatch>,
        has: Option<Box<Locator>>,
    },
    /// `inner.first()` / `.last()` / `.nth(i)`
    Pick { inner: Box<Locator>, pick: Pick },
}

impl Locator {
    pub fn role(role: &str, name: impl Into<TextMatch>) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: name.into(),
            exact: false,
        }
    }

    /// Role with a case-sensitive, whole-string name match
    pub fn role_exact(role: &str, name: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: TextMatch::text(name),
            exact: true,
        }
    }

    pub fn text(text: impl Into<TextMatch>) -> Self {
        Locator::Text(text.into())
    }

    pub fn label(text: impl Into<TextMatch>) -> Self {
        Locator::Label(text.into())
    }

    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn locator(self, selector: &str) -> Self {
        Locator::Within {
            parent: Box::new(self),
            selector: selector.to_string(),
        }
    }

    pub fn filter_text(self, text: impl Into<TextMatch>) -> Self {
        Locator::Filter {
            inner: Box::new(self),
            has_text: Some(text.into()),
            has: None,
        }
    }

    pub fn filter_has(self, child: Locator) -> Self {
        Locator::Filter {
            inner: Box::new(self),
            has_text: None,
            has: Some(Box::new(child)),
        }
    }

    pub fn first(self) -> Self {
        self.pick(Pick::First)
    }

    pub fn last(self) -> Self {
        self.pick(Pick::Last)
    }

    pub fn nth(self, index: usize) -> Self {
        self.pick(Pick::Nth(index))
    }

    fn pick(self, pick: Pick) -> Self {
        Locator::Pick {
            inner: Box::new(self),
            pick,
        }
    }

    /// Playwright expression rooted at a variable named `page`
    pub fn to_js(&self) -> String {
        match self {
            Locator::Role { role, name, exact } => {
                let exact = if *exact { ", exact: true" } else { "" };
                format!(
                    "page.getByRole({}, {{ name: {}{} }})",
                    js_string(role),
                    name.to_js(),
                    exact
                )
            }
            Locator::Text(text) => format!("page.getByText({})", text.to_js()),
            Locator::Label(text) => format!("page.getByLabel({})", text.to_js()),
            Locator::Css(selector) => format!("page.locator({})", js_string(selector)),
            Locator::Within { parent, selector } => {
                format!("{}.locator({})", parent.to_js(), js_string(selector))
            }
            Locator::Filter {
                inner,
                has_text,
                has,
            } => {
                let mut options = Vec::new();
                if let Some(text) = has_text {
                    options.push(format!("hasText: {}", text.to_js()));
                }
                if let Some(child) = has {
                    options.push(format!("has: {}", child.to_js()));
                }
                format!("{}.filter({{ {} }})", inner.to_js(), options.join(", "))
            }
            Locator::Pick { inner, pick } => match pick {
                Pick::First => format!("{}.first()", inner.to_js()),
                Pick::Last => format!("{}.last()", inner.to_js()),
                Pick::Nth(i) => format!("{}.nth({})", inner.to_js(), i),
            },
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js())
    }
}

fn js_string(s: &str) -> String {
    // A JSON string literal is a valid JS string literal.
    serde_json::Value::String(s.to_string()).to_string()
}
