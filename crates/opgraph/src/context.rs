//! Execution context carried by nodes and tensors.
//!
//! An [`ExecutionContext`] bundles the dispatch queue and the vendor library
//! handles a device kernel needs. The graph never interprets these values;
//! it only keeps every node of a subgraph on the same context.

use tracing::trace;

use crate::error::GraphError;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(usize);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Wrap a raw handle value.
            pub const fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            /// The raw handle value.
            pub const fn as_raw(self) -> usize {
                self.0
            }

            /// Whether this is the null handle.
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

opaque_handle!(
    /// Asynchronous dispatch queue. The null handle is the default stream.
    StreamHandle
);

opaque_handle!(
    /// Handle to a dense linear algebra library instance.
    BlasHandle
);

opaque_handle!(
    /// Handle to a neural-network primitives library instance.
    DnnHandle
);

/// Stream and library handles used to dispatch device kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExecutionContext {
    stream: StreamHandle,
    blas_handle: BlasHandle,
    dnn_handle: DnnHandle,
    asynchronous: bool,
}

impl ExecutionContext {
    /// Context on the default stream with null library handles.
    pub const fn new() -> Self {
        Self {
            stream: StreamHandle::NULL,
            blas_handle: BlasHandle::NULL,
            dnn_handle: DnnHandle::NULL,
            asynchronous: false,
        }
    }

    pub fn with_stream(mut self, stream: StreamHandle) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_blas_handle(mut self, handle: BlasHandle) -> Self {
        self.blas_handle = handle;
        self
    }

    pub fn with_dnn_handle(mut self, handle: DnnHandle) -> Self {
        self.dnn_handle = handle;
        self
    }

    /// Dispatch kernels without waiting for them to finish.
    pub fn with_async(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn stream(&self) -> StreamHandle {
        self.stream
    }

    pub fn blas_handle(&self) -> BlasHandle {
        self.blas_handle
    }

    pub fn dnn_handle(&self) -> DnnHandle {
        self.dnn_handle
    }

    pub fn is_async(&self) -> bool {
        self.asynchronous
    }

    pub(crate) fn set_stream(&mut self, stream: StreamHandle) {
        self.stream = stream;
    }

    pub(crate) fn set_blas_handle(&mut self, handle: BlasHandle) {
        self.blas_handle = handle;
    }

    pub(crate) fn set_dnn_handle(&mut self, handle: DnnHandle) {
        self.dnn_handle = handle;
    }

    pub(crate) fn set_async(&mut self, asynchronous: bool) {
        self.asynchronous = asynchronous;
    }
}

/// Queue barrier exposed to client code.
///
/// Evaluation never waits on a queue. A caller that reads a tensor produced
/// by an asynchronous evaluation on another stream must synchronize first.
pub trait StreamSynchronizer {
    /// Block until all work submitted to `stream` has completed.
    fn synchronize(&self, stream: StreamHandle) -> Result<(), GraphError>;

    /// Synchronize the stream of `ctx`.
    fn synchronize_context(&self, ctx: &ExecutionContext) -> Result<(), GraphError> {
        self.synchronize(ctx.stream())
    }
}

/// Synchronizer for host execution, where every kernel runs to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostQueue;

impl StreamSynchronizer for HostQueue {
    fn synchronize(&self, stream: StreamHandle) -> Result<(), GraphError> {
        trace!(stream = stream.as_raw(), "host queue synchronize");
        Ok(())
    }
}
