pub mod classifier;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
