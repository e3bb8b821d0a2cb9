//! Poetry camera: press the shutter, get a poem printed about what the
//! camera saw.
//!
//! See [`app`] for how the pieces fit together.

pub mod app;
pub mod camera;
pub mod config;
pub mod connectivity;
pub mod generate;
pub mod indicator;
pub mod network;
pub mod pipeline;
pub mod printer;
pub mod shutter;

#[cfg(test)]
mod testing;
