pub mod submission;
pub mod user;

mod lenient;
