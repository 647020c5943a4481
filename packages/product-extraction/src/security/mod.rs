//! SSRF protection and credential handling.

pub mod credentials;
pub mod validator;

pub use credentials::SecretString;
pub use validator::UrlValidator;
