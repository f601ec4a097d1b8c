//! Memory locations a tensor or node can live in.

use std::fmt;

/// Where a tensor's buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryLocation {
    /// Ordinary host memory.
    #[default]
    Host,
    /// Accelerator memory, not addressable from the host.
    Device,
    /// Memory migrated between host and device by a memory manager.
    Managed,
    /// Unified memory allocated through the accelerator driver.
    CudaManaged,
}

impl MemoryLocation {
    /// Whether the host can read and write the buffer directly.
    pub fn is_host_accessible(self) -> bool {
        !matches!(self, MemoryLocation::Device)
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryLocation::Host => "host",
            MemoryLocation::Device => "device",
            MemoryLocation::Managed => "managed",
            MemoryLocation::CudaManaged => "cuda-managed",
        };
        f.write_str(name)
    }
}
