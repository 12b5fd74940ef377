use std::fmt::Display;

/// Load state of one data source.
///
/// `Unloaded -> Loading -> Ready | Failed`, with `Failed -> Loading` for a
/// retry. A `Ready` slot is never reloaded unless it is reset.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DataSlot<T> {
    #[default]
    Unloaded,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> DataSlot<T> {
    /// Enter `Loading`. Returns `false` (and changes nothing) unless the
    /// slot is `Unloaded` or `Failed`.
    pub fn begin_loading(&mut self) -> bool {
        match self {
            DataSlot::Unloaded | DataSlot::Failed(_) => {
                *self = DataSlot::Loading;
                true
            }
            DataSlot::Loading | DataSlot::Ready(_) => false,
        }
    }

    /// Record the result of a load. Ignored unless the slot is `Loading`.
    pub fn finish<E: Display>(&mut self, result: Result<T, E>) -> bool {
        if !matches!(self, DataSlot::Loading) {
            return false;
        }
        *self = match result {
            Ok(value) => DataSlot::Ready(value),
            Err(err) => DataSlot::Failed(err.to_string()),
        };
        true
    }

    pub fn reset(&mut self) {
        *self = DataSlot::Unloaded;
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            DataSlot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            DataSlot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DataSlot::Ready(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DataSlot::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}
