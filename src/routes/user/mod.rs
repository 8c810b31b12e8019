mod handler;
mod model;

pub use handler::{delete_account, get_profile, login, logout, register, update_profile};
