//! Ordered locator fallbacks
//!
//! The app's markup is not ours and shifts between releases, so most
//! elements are found by trying several locators in priority order.

use tracing::debug;

use crate::locator::Locator;
use crate::page::Page;

/// One named candidate in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finder {
    pub label: String,
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderChain {
    name: String,
    finders: Vec<Finder>,
}

impl FinderChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            finders: Vec::new(),
        }
    }

    pub fn with(mut self, label: impl Into<String>, locator: Locator) -> Self {
        self.finders.push(Finder {
            label: label.into(),
            locator,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn finders(&self) -> &[Finder] {
        &self.finders
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    /// First candidate that is visible right now. A check that errors (for
    /// example a strict-mode violation) counts as not visible.
    pub async fn first_visible<P>(&self, page: &P) -> Option<&Finder>
    where
        P: Page + ?Sized,
    {
        for finder in &self.finders {
            match page.is_visible(&finder.locator).await {
                Ok(true) => {
                    debug!("{}: using '{}'", self.name, finder.label);
                    return Some(finder);
                }
                Ok(false) => {
                    debug!("{}: '{}' not visible", self.name, finder.label);
                }
                Err(e) => {
                    debug!("{}: probing '{}' failed: {}", self.name, finder.label, e);
                }
            }
        }
        None
    }
}
