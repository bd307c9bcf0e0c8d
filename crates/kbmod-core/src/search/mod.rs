pub mod spec;
pub mod trajectory;

pub use spec::SearchSpec;
pub use trajectory::Trajectory;
