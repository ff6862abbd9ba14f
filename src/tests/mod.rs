//! Integration-style tests exercising the public API end to end, mirroring
//! the per-module `#[cfg(test)]` unit tests but at the scale of a whole
//! expression rather than a single combinator or analyzer call.

mod fuzz;
mod properties;
