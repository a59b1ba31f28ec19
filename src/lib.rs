pub mod broker;
pub mod dc;
pub mod error;
pub mod resource;
pub mod setup;
pub mod sim;

pub use error::{CloudError, Result};

#[cfg(test)]
mod test;
