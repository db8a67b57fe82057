//! Watch relay errors

use thiserror::Error;

/// Boxed cause of a failed subscription open.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that terminate a relay run
///
/// A subscription that closes after opening is never an error; the relay
/// absorbs it and re-subscribes. Only the conditions below end a run.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The subscription factory could not open a watch
    #[error("Couldn't open the {resource} watch channel: {source}")]
    Open {
        /// Label of the relay that failed
        resource: String,
        /// Underlying factory error
        #[source]
        source: BoxError,
    },

    /// The consumer dropped the receiving end of the sink
    #[error("{resource} event sink closed by consumer")]
    SinkClosed {
        /// Label of the relay whose sink closed
        resource: String,
    },
}
