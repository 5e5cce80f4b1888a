//! Registration, log in and the bearer token extractor that protects the API.

mod endpoints;
mod token;

pub use endpoints::{log_in, register_user};
pub use token::{Claims, JwtKeys, encode_jwt};

#[cfg(test)]
pub use token::decode_jwt;
