//! Client side of Still the Want: the HTTP client, device identity, the
//! delay session state machine and the heatmap derivations a UI renders.

pub mod api;
pub mod bootstrap;
pub mod countdown;
pub mod device;
pub mod emotion;
pub mod error;
pub mod heatmap;
pub mod session;

pub use api::ApiClient;
pub use error::ClientError;
