pub mod builder;
pub mod prompt;

pub use builder::build_jobs;
pub use prompt::render_user_prompt;
