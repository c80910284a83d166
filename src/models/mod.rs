pub mod follow;
pub mod post;
pub mod user;

pub use follow::Entity as Follow;
pub use post::{Entity as Post, Model as PostModel};
pub use user::{Entity as User, Model as UserModel};
