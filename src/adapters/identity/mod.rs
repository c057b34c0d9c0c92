//! Identity collaborator adapters.
//!
//! Token validation is delegated to the external user service; this
//! process never inspects credentials itself. [`HttpIdentityValidator`]
//! is the production adapter, [`StaticIdentityValidator`] the test
//! double.

mod http;
mod mock;

pub use http::HttpIdentityValidator;
pub use mock::StaticIdentityValidator;
