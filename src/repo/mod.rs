//! Resource repositories.
//!
//! All store access lives here: plain CRUD per collection plus the few
//! multi-document consistency operations (slug derivation, category set
//! checks, comment limits, counters, cascades). Functions borrow the pool;
//! nothing here holds global state.

pub mod blogs;
pub mod services;
pub mod shows;
pub mod users;
