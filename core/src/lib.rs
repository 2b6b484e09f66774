#![warn(clippy::panic)]
#![warn(clippy::expect_used)]

#[macro_use]
extern crate serde_derive;

pub mod errors;
pub mod types;
pub mod util;
