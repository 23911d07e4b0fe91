pub mod orders;
pub mod ratings;
pub mod transitions;
