use amdpack_core::ResourceIoError;
use thiserror::Error;

/// Failure of one bundle request. Other requests are unaffected.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle {bundle} requests unknown module `{name}`")]
    UnresolvedDependency { bundle: String, name: String },

    #[error("bundle {bundle} could not load its content")]
    ResourceIo {
        bundle: String,
        #[source]
        source: ResourceIoError,
    },
}
