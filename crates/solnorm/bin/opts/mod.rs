mod filter;
mod project;

pub use filter::FilterOpts;
pub use project::ProjectOpts;
