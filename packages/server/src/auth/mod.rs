// JWT authentication and the admin identity resolver
pub mod jwt;
pub mod resolver;

pub use jwt::*;
pub use resolver::*;
