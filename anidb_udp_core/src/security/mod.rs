//! Credential protection
//!
//! Passwords are held in [`SecureString`] from the moment they leave the
//! settings provider until they are written into an AUTH command.

pub mod secure_string;

pub use secure_string::SecureString;
