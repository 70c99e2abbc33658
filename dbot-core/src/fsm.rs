//! Named conversation states.

use std::fmt;

/// A state label, optionally namespaced by a group: full label is `"group:name"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    group: Option<String>,
    name: String,
}

impl State {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            name: name.into(),
        }
    }

    pub fn ungrouped(name: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Label as stored in the conversation store.
    pub fn full_state(&self) -> String {
        match &self.group {
            Some(group) => format!("{}:{}", group, self.name),
            None => self.name.clone(),
        }
    }

    /// True if `label` (as returned by a store) is this state.
    pub fn matches(&self, label: &str) -> bool {
        match &self.group {
            Some(group) => label
                .split_once(':')
                .map(|(g, n)| g == group && n == self.name)
                .unwrap_or(false),
            None => label == self.name,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_state())
    }
}

impl From<&State> for String {
    fn from(state: &State) -> Self {
        state.full_state()
    }
}
