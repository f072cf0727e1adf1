//! PostgreSQL post store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, Select,
    Set,
};
use uuid::Uuid;

use quill_core::domain::{NewPost, Post, PostPatch};
use quill_core::error::StoreError;
use quill_core::ports::{
    ChangeEvent, ChangeKind, ChangePublisher, OrderBy, POSTS_TABLE, PostStore, RowFilter,
};

use super::entity::post::{self, Entity as PostEntity};

/// Post store over a SeaORM connection.
pub struct PostgresPostStore {
    pub(crate) db: DbConn,
    publisher: Option<Arc<dyn ChangePublisher>>,
}

impl PostgresPostStore {
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            publisher: None,
        }
    }

    /// Announce every successful write on `publisher`.
    pub fn with_publisher(mut self, publisher: Arc<dyn ChangePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    async fn announce(&self, kind: ChangeKind, row_id: Uuid) {
        if let Some(publisher) = &self.publisher {
            let event = ChangeEvent::new(POSTS_TABLE, kind, Some(row_id));
            if let Err(e) = publisher.publish(&event).await {
                tracing::warn!(error = %e, post_id = %row_id, "Failed to publish post change");
            }
        }
    }

    fn guarded(filter: &RowFilter) -> sea_orm::Condition {
        let mut condition = sea_orm::Condition::all().add(post::Column::Id.eq(filter.id));
        if let Some(owner) = filter.owner {
            condition = condition.add(post::Column::UserId.eq(owner));
        }
        condition
    }
}

fn ordered(order: OrderBy) -> Select<PostEntity> {
    if order.descending {
        PostEntity::find().order_by_desc(post::Column::CreatedAt)
    } else {
        PostEntity::find().order_by_asc(post::Column::CreatedAt)
    }
}

fn map_write_err(e: DbErr) -> StoreError {
    let err_str = e.to_string();
    if err_str.contains("violates") || err_str.contains("permission denied") {
        StoreError::Rejected(err_str)
    } else {
        StoreError::Query(err_str)
    }
}

#[async_trait]
impl PostStore for PostgresPostStore {
    async fn select_all(&self, order: OrderBy) -> Result<Vec<Post>, StoreError> {
        let result = ordered(order)
            .all(&self.db)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn select_one(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let result = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn insert(&self, row: NewPost) -> Result<(), StoreError> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let active_model = post::ActiveModel {
            id: Set(id),
            title: Set(row.title),
            content: Set(row.content),
            author: Set(row.author),
            user_id: Set(Some(row.user_id)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active_model.insert(&self.db).await.map_err(map_write_err)?;

        tracing::debug!(post_id = %id, "Post inserted");
        self.announce(ChangeKind::Insert, id).await;
        Ok(())
    }

    async fn update(&self, patch: PostPatch, filter: RowFilter) -> Result<u64, StoreError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let result = PostEntity::update_many()
            .col_expr(post::Column::Title, Expr::value(patch.title))
            .col_expr(post::Column::Content, Expr::value(patch.content))
            .col_expr(post::Column::UpdatedAt, Expr::value(now))
            .filter(Self::guarded(&filter))
            .exec(&self.db)
            .await
            .map_err(map_write_err)?;

        if result.rows_affected > 0 {
            self.announce(ChangeKind::Update, filter.id).await;
        }
        Ok(result.rows_affected)
    }

    async fn delete(&self, filter: RowFilter) -> Result<u64, StoreError> {
        let result = PostEntity::delete_many()
            .filter(Self::guarded(&filter))
            .exec(&self.db)
            .await
            .map_err(map_write_err)?;

        if result.rows_affected > 0 {
            self.announce(ChangeKind::Delete, filter.id).await;
        }
        Ok(result.rows_affected)
    }
}
