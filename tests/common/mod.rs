#[cfg(test)]
#[allow(dead_code)]
pub mod chain;
pub use chain::*;

#[cfg(test)]
#[allow(dead_code)]
pub mod executors;
pub use executors::*;

#[cfg(test)]
#[allow(dead_code)]
pub mod test_data;
pub use test_data::*;
