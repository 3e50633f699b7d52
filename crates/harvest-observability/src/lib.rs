mod client;
mod harvest;
mod store;

pub use client::*;
pub use harvest::*;
pub use store::*;
