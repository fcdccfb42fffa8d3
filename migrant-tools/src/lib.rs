#[cfg(test)]
mod test_helpers;

mod error;
mod helpers;
mod quoting;
mod models;
mod dialect;
mod connection;
mod codec;
mod split;
mod parallel_runner;
mod catalog;
mod dump;
mod load;
mod generator;
mod schema_reader;

pub use error::*;
pub use helpers::RunningFlag;
pub use quoting::*;
pub use models::*;
pub use dialect::*;
pub use connection::*;
pub use codec::*;
pub use split::*;
pub use parallel_runner::*;
pub use catalog::*;
pub use dump::*;
pub use load::*;
pub use generator::*;
pub use schema_reader::SchemaReader;

pub(crate) fn default<T: Default>() -> T {
    T::default()
}
