pub mod memory;
pub mod model;
pub mod pg;
pub mod store;

pub use model::{AccountStatus, PublicUser, Role, User};
pub use store::{NewUser, StoreError, UserFilter, UserStore};
