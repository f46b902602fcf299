mod link;
mod session;

pub use link::{Link, LinkId, Outbound};
pub use session::Session;
