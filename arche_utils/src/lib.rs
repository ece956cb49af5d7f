//! General utilities.

#[macro_use]
mod macros;

pub mod io;
mod key_index_mapper;

pub use key_index_mapper::KeyIndexMapper;
pub use log;
