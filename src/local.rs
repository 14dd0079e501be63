//! In-memory store for the locally-owned filter fields.
//!
//! `language` and `labels` never travel to the remote API as data: they are
//! read and written synchronously here, and observers can subscribe to
//! changes. The store must be registered once (see [`crate::context`])
//! before use.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::filter::FilterState;

/// A locally-owned field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalField {
    Language,
    Labels,
}

impl LocalField {
    pub const ALL: [LocalField; 2] = [LocalField::Language, LocalField::Labels];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Labels => "labels",
        }
    }
}

impl fmt::Display for LocalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value held by a [`LocalField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalValue {
    Language(String),
    Labels(Vec<String>),
}

impl LocalValue {
    pub fn field(&self) -> LocalField {
        match self {
            Self::Language(_) => LocalField::Language,
            Self::Labels(_) => LocalField::Labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalStoreError {
    #[error("local field \"{0}\" read or written before resolver registration")]
    Unregistered(LocalField),
}

type Subscriber = Box<dyn FnMut(&LocalValue)>;

/// Key-value cells for [`LocalField`]s, backed by a [`FilterState`].
pub struct LocalStore {
    state: FilterState,
    registered: bool,
    subscribers: HashMap<LocalField, Vec<Subscriber>>,
}

impl LocalStore {
    pub fn new(initial: FilterState) -> Self {
        Self {
            state: initial,
            registered: false,
            subscribers: HashMap::new(),
        }
    }

    /// Register the local resolvers. Returns `false` if they already were,
    /// in which case nothing changes.
    pub fn register(&mut self) -> bool {
        if self.registered {
            tracing::debug!("local resolvers already registered");
            return false;
        }
        self.registered = true;
        tracing::debug!(
            "local resolvers registered: language={:?} labels={:?}",
            self.state.language,
            self.state.labels
        );
        true
    }

    /// Drop the registration and every subscriber.
    pub fn unregister(&mut self) {
        self.registered = false;
        self.subscribers.clear();
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    fn ensure_registered(&self, field: LocalField) -> Result<(), LocalStoreError> {
        if self.registered {
            Ok(())
        } else {
            Err(LocalStoreError::Unregistered(field))
        }
    }

    // -----------------------------------------------------------------------
    // Generic interface
    // -----------------------------------------------------------------------

    pub fn get(&self, field: LocalField) -> Result<LocalValue, LocalStoreError> {
        self.ensure_registered(field)?;
        Ok(match field {
            LocalField::Language => LocalValue::Language(self.state.language.clone()),
            LocalField::Labels => LocalValue::Labels(self.state.labels.clone()),
        })
    }

    /// Replace a field's value and notify its subscribers.
    ///
    /// Labels written this way are normalised like appended ones: trimmed,
    /// split on commas, blanks dropped.
    pub fn set(&mut self, value: LocalValue) -> Result<(), LocalStoreError> {
        let field = value.field();
        self.ensure_registered(field)?;
        match value {
            LocalValue::Language(language) => self.state.set_language(language),
            LocalValue::Labels(labels) => {
                self.state.labels.clear();
                for label in &labels {
                    self.state.add_label(label);
                }
            }
        }
        self.notify(field);
        Ok(())
    }

    /// Call `callback` with the new value after every change to `field`.
    pub fn subscribe(&mut self, field: LocalField, callback: impl FnMut(&LocalValue) + 'static) {
        self.subscribers
            .entry(field)
            .or_default()
            .push(Box::new(callback));
    }

    fn notify(&mut self, field: LocalField) {
        let value = match field {
            LocalField::Language => LocalValue::Language(self.state.language.clone()),
            LocalField::Labels => LocalValue::Labels(self.state.labels.clone()),
        };
        if let Some(subs) = self.subscribers.get_mut(&field) {
            for cb in subs.iter_mut() {
                cb(&value);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Typed mutators
    // -----------------------------------------------------------------------

    pub fn language(&self) -> Result<&str, LocalStoreError> {
        self.ensure_registered(LocalField::Language)?;
        Ok(&self.state.language)
    }

    pub fn set_language(&mut self, language: &str) -> Result<(), LocalStoreError> {
        self.set(LocalValue::Language(language.to_owned()))
    }

    pub fn labels(&self) -> Result<&[String], LocalStoreError> {
        self.ensure_registered(LocalField::Labels)?;
        Ok(&self.state.labels)
    }

    /// Append a label. Blank input is a silent no-op and notifies nobody.
    pub fn add_label(&mut self, label: &str) -> Result<bool, LocalStoreError> {
        self.ensure_registered(LocalField::Labels)?;
        let added = self.state.add_label(label);
        if added {
            self.notify(LocalField::Labels);
        }
        Ok(added)
    }

    /// Snapshot of both fields.
    pub fn filters(&self) -> Result<&FilterState, LocalStoreError> {
        self.ensure_registered(LocalField::Language)?;
        Ok(&self.state)
    }
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("state", &self.state)
            .field("registered", &self.registered)
            .field(
                "subscribers",
                &self.subscribers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}
