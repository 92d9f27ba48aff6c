pub mod checkpoint;
pub mod event;

#[cfg(test)]
mod tests;

pub use checkpoint::*;
pub use event::*;
