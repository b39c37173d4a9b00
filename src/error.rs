//! Crate-wide error type.

use thiserror::Error;

/// Result alias used by every fallible API in this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported by containers, storage, and streams.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The table allocator could not supply the requested memory.
    #[error("failed to allocate {bytes} bytes of table memory")]
    AllocationFailed {
        /// Size of the failed request in bytes.
        bytes: usize,
    },

    /// A bulk operation was handed ranges of different lengths.
    #[error("input range holds {inputs} elements but output/stencil range holds {outputs}")]
    LengthMismatch {
        /// Number of input elements.
        inputs: usize,
        /// Number of output or stencil elements.
        outputs: usize,
    },

    /// The output range passed to `retrieve_all` is shorter than the table size.
    #[error("output range holds {provided} slots but the table holds {required} entries")]
    OutputTooSmall {
        /// Current number of entries in the table.
        required: usize,
        /// Length of the caller-supplied output range.
        provided: usize,
    },

    /// The stream worker has shut down, e.g. after a panicking predicate.
    #[error("stream worker has shut down")]
    StreamClosed,
}
