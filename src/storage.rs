use crate::entities;
use crate::errors::StewardError;
use crate::settings::Database as DbCfg;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use migration::MigratorTrait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOpenPlatform {
    pub slug: String,
    pub app_id: String,
    pub app_secret: String,
    pub verify_token: String,
    pub aes_key: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenPlatformUpdate {
    pub app_secret: Option<String>,
    pub verify_token: Option<String>,
    pub aes_key: Option<String>,
    pub name: Option<String>,
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, StewardError> {
    let db = Database::connect(&cfg.url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn list_open_platforms(
    db: &DatabaseConnection,
) -> Result<Vec<entities::open_platform::Model>, StewardError> {
    use entities::open_platform::{Column, Entity};

    let platforms = Entity::find()
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?;
    Ok(platforms)
}

pub async fn create_open_platform(
    db: &DatabaseConnection,
    input: NewOpenPlatform,
) -> Result<entities::open_platform::Model, StewardError> {
    let now = Utc::now().timestamp();

    let platform = entities::open_platform::ActiveModel {
        slug: Set(input.slug),
        app_id: Set(input.app_id),
        app_secret: Set(input.app_secret),
        verify_token: Set(input.verify_token),
        aes_key: Set(input.aes_key),
        name: Set(input.name),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = platform.insert(db).await?;
    Ok(model)
}

pub async fn get_open_platform(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<entities::open_platform::Model>, StewardError> {
    use entities::open_platform::{Column, Entity};

    let platform = Entity::find().filter(Column::Slug.eq(slug)).one(db).await?;
    Ok(platform)
}

pub async fn update_open_platform(
    db: &DatabaseConnection,
    slug: &str,
    update: OpenPlatformUpdate,
) -> Result<Option<entities::open_platform::Model>, StewardError> {
    let Some(model) = get_open_platform(db, slug).await? else {
        return Ok(None);
    };

    let mut active: entities::open_platform::ActiveModel = model.into();
    if let Some(app_secret) = update.app_secret {
        active.app_secret = Set(app_secret);
    }
    if let Some(verify_token) = update.verify_token {
        active.verify_token = Set(verify_token);
    }
    if let Some(aes_key) = update.aes_key {
        active.aes_key = Set(aes_key);
    }
    if let Some(name) = update.name {
        active.name = Set(name);
    }
    active.updated_at = Set(Utc::now().timestamp());

    let model = active.update(db).await?;
    Ok(Some(model))
}

pub async fn delete_open_platform(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<bool, StewardError> {
    use entities::open_platform::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::Slug.eq(slug))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn testers_for_app(
    db: &DatabaseConnection,
    app_id: &str,
) -> Result<Vec<entities::tester::Model>, StewardError> {
    use entities::tester::{Column, Entity};

    let testers = Entity::find()
        .filter(Column::AppId.eq(app_id))
        .all(db)
        .await?;
    Ok(testers)
}

/// Record a successful remote bind. If a row already exists for
/// (app_id, wechat_id) its user_str is replaced, otherwise a new row is
/// inserted.
pub async fn record_tester_bound(
    db: &DatabaseConnection,
    app_id: &str,
    wechat_id: &str,
    user_str: &str,
) -> Result<entities::tester::Model, StewardError> {
    use entities::tester::{Column, Entity};

    let now = Utc::now().timestamp();
    let existing = Entity::find()
        .filter(Column::AppId.eq(app_id))
        .filter(Column::WechatId.eq(wechat_id))
        .one(db)
        .await?;

    let model = match existing {
        Some(model) => {
            let mut active: entities::tester::ActiveModel = model.into();
            active.user_str = Set(user_str.to_string());
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            let active = entities::tester::ActiveModel {
                app_id: Set(app_id.to_string()),
                wechat_id: Set(Some(wechat_id.to_string())),
                user_str: Set(user_str.to_string()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            active.insert(db).await?
        }
    };
    Ok(model)
}

/// Remove the local mirror row after a successful remote unbind, located by
/// wechat id. Returns whether a row was removed.
pub async fn remove_tester_by_wechat_id(
    db: &DatabaseConnection,
    app_id: &str,
    wechat_id: &str,
) -> Result<bool, StewardError> {
    use entities::tester::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::AppId.eq(app_id))
        .filter(Column::WechatId.eq(wechat_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Remove the local mirror row after a successful remote unbind, located by
/// the opaque remote identifier. Returns whether a row was removed.
pub async fn remove_tester_by_user_str(
    db: &DatabaseConnection,
    app_id: &str,
    user_str: &str,
) -> Result<bool, StewardError> {
    use entities::tester::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::AppId.eq(app_id))
        .filter(Column::UserStr.eq(user_str))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
