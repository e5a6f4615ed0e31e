//! Subscription: topic plus tag filter expression.

use std::collections::BTreeSet;
use std::fmt;

/// Tag filter in the broker's subscription syntax.
///
/// - `*` or an empty expression: every tag
/// - `a || b || c`: exactly those tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    All,
    Tags(BTreeSet<String>),
}

impl TagFilter {
    pub fn parse(expression: &str) -> Self {
        let expression = expression.trim();
        if expression.is_empty() || expression == "*" {
            return TagFilter::All;
        }
        let tags: BTreeSet<String> = expression
            .split("||")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() {
            TagFilter::All
        } else {
            TagFilter::Tags(tags)
        }
    }

    pub fn matches(&self, tag: &str) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::Tags(tags) => tags.contains(tag),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagFilter::All => f.write_str("*"),
            TagFilter::Tags(tags) => {
                let joined: Vec<&str> = tags.iter().map(String::as_str).collect();
                f.write_str(&joined.join(" || "))
            }
        }
    }
}

/// What a consumer registers a handler for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    topic: String,
    filter: TagFilter,
}

impl Subscription {
    /// `Subscription::new("TEST_TOPIC", "*")`
    pub fn new(topic: impl Into<String>, expression: &str) -> Self {
        Self {
            topic: topic.into(),
            filter: TagFilter::parse(expression),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn filter(&self) -> &TagFilter {
        &self.filter
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, self.filter)
    }
}
