pub mod auth;

pub use auth::{optional_auth_middleware, require_staff, require_user, user_scope, Claims, MaybeClaims};
