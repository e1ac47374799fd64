pub mod app;
pub mod query;
pub mod util;
