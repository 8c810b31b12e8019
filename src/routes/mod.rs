pub mod favorite;
pub mod group;
pub mod group_movie;
pub mod group_request;
pub mod health;
pub mod user;
