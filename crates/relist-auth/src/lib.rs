// Relist Auth - credential hashing for the relist marketplace

pub mod password;

pub use password::{hash_password, verify_password, HashError};
