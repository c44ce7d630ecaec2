//! Auth-domain identifiers, bearer credentials, and user models.

pub mod id;
pub mod token;
pub mod user;

pub use id::*;
pub use token::*;
pub use user::*;
