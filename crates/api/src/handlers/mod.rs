pub mod audit;
pub mod auth;
pub mod cells;
pub mod health;
pub mod permissions;
pub mod rotation;
pub mod secrets;

pub use audit::list_audit;
pub use auth::login;
pub use cells::{create_cell, delete_cell, get_cell, list_cells, update_cell};
pub use health::health;
pub use permissions::{grant_permission, revoke_permission};
pub use rotation::{rotate_cell_key, schedule_rotation};
pub use secrets::{create_secret, delete_secret, read_secret, update_secret};
