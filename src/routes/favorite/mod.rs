mod handler;
mod model;

pub use handler::{
    add_favorite,
    create_share_link,
    delete_favorite,
    get_shared_favorites,
    list_favorites,
};
