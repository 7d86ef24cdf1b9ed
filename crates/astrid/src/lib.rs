//! Astrid - interactive AI command shell.
//!
//! Routing core and interactive loop; the building blocks live in
//! `astrid_common`.

pub mod ask_user;
pub mod repl;
pub mod router;

pub use router::{AnswerOrigin, Outcome, Router};
