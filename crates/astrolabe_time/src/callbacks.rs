use astrolabe_core::errors::{AstrolabeError, Result};

/// Handle returned when registering a callback; used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(pub u64);

pub type TimeCallback = Box<dyn FnMut(f64)>;

/// Callbacks kept in registration order.
///
/// Handles are issued by the owner (one counter shared by all registries of a
/// time manager), so a handle from one list is never valid in another.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Vec<(CallbackHandle, TimeCallback)>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: CallbackHandle, callback: TimeCallback) {
        self.entries.push((handle, callback));
    }

    pub fn remove(&mut self, handle: CallbackHandle) -> Result<()> {
        let index = self
            .entries
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or(AstrolabeError::UnknownCallbackHandle(handle.0))?;
        self.entries.remove(index);
        Ok(())
    }

    /// Invokes every callback with `value`, in registration order.
    pub fn fire(&mut self, value: f64) {
        for (_, callback) in &mut self.entries {
            callback(value);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(h, _)| h))
            .finish()
    }
}
