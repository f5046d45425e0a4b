//! Ordered listener chains.
//!
//! Components that intercept a firmware notification handle it first and
//! then forward it to every listener registered before them. A `HookChain`
//! holds those earlier listeners and calls them in registration order.

/// Boxed listener for events of type `E`.
pub type Hook<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of listeners for one notification.
pub struct HookChain<E> {
    hooks: Vec<Hook<E>>,
}

impl<E> HookChain<E> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Append a listener.
    pub fn register(&mut self, hook: impl FnMut(&E) + Send + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Call every listener in registration order.
    pub fn notify(&mut self, event: &E) {
        for hook in &mut self.hooks {
            hook(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// True when no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<E> Default for HookChain<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for HookChain<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
