pub mod bootstrap;
pub mod integration;
pub mod store;
