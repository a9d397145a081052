use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One WeChat Open Platform (third-party platform) registration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "open_platforms")]
pub struct Model {
    /// Routing key used in URLs, unique
    #[sea_orm(primary_key, auto_increment = false)]
    pub slug: String,
    #[sea_orm(unique)]
    pub app_id: String,
    pub app_secret: String,
    /// Message verification token configured on the WeChat console
    pub verify_token: String,
    pub aes_key: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
