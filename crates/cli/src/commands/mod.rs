//! Command implementations.

mod cart;

pub use cart::{CommandError, add, clear, decrement, flush, increment, open_store, remove, show};
