pub mod links;
pub mod sync;
