mod delete;
mod fetch;
mod generate;
mod query;
mod report;
mod upload;

pub use delete::delete;
pub use fetch::{count, fetch};
pub use generate::generate;
pub use query::query;
pub use upload::upload;
