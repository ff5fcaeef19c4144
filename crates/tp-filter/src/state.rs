use crate::error::{FilterError, Result};

/// A configuration slot that can be filled exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOnce<T> {
    Unset,
    Set(T),
}

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        WriteOnce::Unset
    }
}

impl<T> WriteOnce<T> {
    /// Fails with `AlreadySet(field)` if the slot is filled. Call before
    /// doing any validation work for a new value.
    pub fn ensure_unset(&self, field: &'static str) -> Result<()> {
        match self {
            WriteOnce::Unset => Ok(()),
            WriteOnce::Set(_) => Err(FilterError::AlreadySet(field)),
        }
    }

    /// Fill the slot. The first value is kept if it was already filled.
    pub fn set(&mut self, field: &'static str, value: T) -> Result<()> {
        self.ensure_unset(field)?;
        *self = WriteOnce::Set(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            WriteOnce::Unset => None,
            WriteOnce::Set(v) => Some(v),
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, WriteOnce::Set(_))
    }
}

/// Lifecycle of a filter element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterState {
    /// Still waiting for framework, model or a direction.
    Configuring,
    /// The back-end is open; buffers may flow.
    Ready,
    /// Negotiation or back-end open failed. Terminal.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once_keeps_first_value() {
        let mut slot = WriteOnce::default();
        assert!(!slot.is_set());
        slot.set("model", 1).unwrap();
        assert!(matches!(slot.set("model", 2), Err(FilterError::AlreadySet("model"))));
        assert_eq!(slot.get(), Some(&1));
    }
}
