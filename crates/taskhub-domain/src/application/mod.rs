//! Application services for the Taskhub domain.

pub mod replay;
