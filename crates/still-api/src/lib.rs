pub mod emotion_map;
pub mod error;
pub mod extract;
pub mod health;
pub mod moods;
pub mod routes;
pub mod state;
pub mod urges;
pub mod users;

mod convert;

pub use routes::router;
pub use state::{AppState, AppStateInner, Environment};
