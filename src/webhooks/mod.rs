pub mod controller;
pub mod events;
pub mod handlers;
pub mod reactions;

pub use controller::{DispatchReport, EventHandler, ReactionController};
pub use events::{EventKind, PullRequestEvent};
pub use reactions::{ReactionOutcome, Reactions};
