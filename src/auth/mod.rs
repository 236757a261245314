//! Admin authentication: password hashing, tokens, and the request extractor.

pub mod extractor;
pub mod jwt;
pub mod password;
