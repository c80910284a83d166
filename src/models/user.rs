use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub about_me: Option<String>,
    pub last_seen: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Gravatar identicon URL for this user's email.
    pub fn avatar(&self, size: u32) -> String {
        crate::utils::avatar::gravatar_url(&self.email, size)
    }

    pub fn check_password(&self, password: &str) -> anyhow::Result<bool> {
        crate::utils::password::verify(password, &self.password_hash)
    }
}

impl ActiveModel {
    pub fn set_password(&mut self, password: &str) -> anyhow::Result<()> {
        self.password_hash = sea_orm::ActiveValue::Set(crate::utils::password::hash(password)?);
        Ok(())
    }
}
