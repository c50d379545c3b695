mod assume;

pub mod parsers;

pub use assume::*;
