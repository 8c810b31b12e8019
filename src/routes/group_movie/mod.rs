mod handler;
mod model;

pub use handler::{
    add_comment,
    add_movie_to_group,
    list_comments,
    list_group_movies,
    remove_movie_from_group,
};
