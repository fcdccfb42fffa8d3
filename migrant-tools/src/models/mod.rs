mod identifier;
mod type_descriptor;
mod column;
mod primary_key;
mod index;
mod foreign_key;
mod sequence;
mod trigger;
mod table;
mod schema;
mod database;

pub use identifier::*;
pub use type_descriptor::*;
pub use column::*;
pub use primary_key::*;
pub use index::*;
pub use foreign_key::*;
pub use sequence::*;
pub use trigger::*;
pub use table::*;
pub use schema::*;
pub use database::*;
