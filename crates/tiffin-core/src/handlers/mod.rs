//! Intent handlers.
//!
//! One handler per intent. Handlers that touch a session hold its lock from
//! the first read to the final write, so concurrent turns of the same
//! conversation are applied one after another.

pub mod add;
pub mod complete;
pub mod params;
pub mod remove;
pub mod replies;
pub mod track;

pub use add::AddHandler;
pub use complete::CompleteHandler;
pub use remove::RemoveHandler;
pub use track::TrackHandler;
