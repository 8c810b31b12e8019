mod handler;
mod model;

pub(crate) use model::{Group, MemberRole, insert_membership};

pub use handler::{
    create_group,
    delete_group,
    get_group,
    kick_member,
    leave_group,
    list_groups,
    list_members,
};
