mod actor;
mod relay;
pub mod store;

pub use actor::{RelayActor, RelayCommand, RelayHandle};
pub use relay::{Accepted, RelayOutcome, SignalingRelay};
pub use store::SessionStore;
