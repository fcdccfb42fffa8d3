mod row_count;
mod splitter;
#[cfg(test)]
mod tests;

pub use row_count::*;
pub use splitter::*;
