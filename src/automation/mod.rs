pub mod context;
pub mod detection;

#[cfg(test)]
pub mod fakes;
