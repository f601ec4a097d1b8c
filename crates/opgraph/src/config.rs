//! Graph-wide configuration.
//!
//! Defaults live on each [`Graph`](crate::Graph) instead of in process-wide
//! state, so two graphs in one process can use different settings.

use crate::context::ExecutionContext;
use crate::location::MemoryLocation;

/// Defaults applied to nodes when they are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphConfig {
    default_location: MemoryLocation,
    default_context: ExecutionContext,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location for leaves built from a shape rather than a tensor.
    pub fn with_default_location(mut self, location: MemoryLocation) -> Self {
        self.default_location = location;
        self
    }

    /// Context every new node starts with.
    pub fn with_default_context(mut self, context: ExecutionContext) -> Self {
        self.default_context = context;
        self
    }

    pub fn default_location(&self) -> MemoryLocation {
        self.default_location
    }

    pub fn default_context(&self) -> ExecutionContext {
        self.default_context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DnnHandle;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.default_location(), MemoryLocation::Host);
        assert_eq!(config.default_context(), ExecutionContext::new());
    }

    #[test]
    fn test_builder() {
        let ctx = ExecutionContext::new().with_dnn_handle(DnnHandle::from_raw(9));
        let config = GraphConfig::new()
            .with_default_location(MemoryLocation::Managed)
            .with_default_context(ctx);
        assert_eq!(config.default_location(), MemoryLocation::Managed);
        assert_eq!(config.default_context().dnn_handle().as_raw(), 9);
    }
}
