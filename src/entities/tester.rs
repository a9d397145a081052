use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Local mirror of a mini-program experience-tester binding.
///
/// The remote list endpoint is the source of truth; these rows only carry
/// the wechat id that was used when the binding was created, keyed by the
/// opaque `user_str` the remote API reports.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "testers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub app_id: String,
    pub wechat_id: Option<String>,
    pub user_str: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
