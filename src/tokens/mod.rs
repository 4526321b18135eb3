pub mod generator;
pub mod password;

pub use generator::generate_token;
pub use password::{DefaultPasswordHasher, PasswordHasher};
