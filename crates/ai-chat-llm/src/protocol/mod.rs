//! Wire formats spoken by completion endpoints.

pub mod openai;
