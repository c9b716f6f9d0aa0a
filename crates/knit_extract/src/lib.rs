//! Connection extraction over a wired module hierarchy.
//!
//! Given a set of modules, an [`Extractor`] re-derives the point-to-point
//! connections among their ports by tracing the signal graph backward, and
//! recognizes pairs of bundles connected logical port for logical port as
//! single [`InterfaceConnection`]s. Nothing outside the given set is traced
//! through.
//!
//! ```ignore
//! let found = Extractor::new(&hier, [a, b], ExtractOptions::default())?.extract()?;
//! for c in found.iter() {
//!     println!("{}", c.describe(&hier));
//! }
//! ```

#![warn(missing_docs)]

mod coalesce;
pub mod connection;
pub mod error;
pub mod extractor;
mod trace;
pub mod unit;

pub use connection::{AdHocConnection, Connection, Connections, InterfaceConnection};
pub use error::ExtractError;
pub use extractor::{ExtractOptions, Extractor};
pub use unit::TrackingUnit;
