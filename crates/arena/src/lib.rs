pub mod dispatcher;
pub mod errors;
pub mod identity;
pub mod models;
pub mod providers;
pub mod store;
