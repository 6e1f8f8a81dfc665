pub mod model;

pub use model::{Transaction, canonical_list};
