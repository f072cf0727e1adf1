use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use quill_core::domain::{PostDraft, PostPatch};
use quill_core::ports::{OrderBy, PostStore, RowFilter};

use crate::database::PostgresPostStore;
use crate::database::entity::post;

fn model(title: &str, user_id: Option<Uuid>) -> post::Model {
    let now = Utc::now();
    post::Model {
        id: Uuid::new_v4(),
        title: title.to_owned(),
        content: "Content".to_owned(),
        author: "Alice".to_owned(),
        user_id,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_select_all_converts_rows() {
    let owner = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model("Newer", Some(owner)), model("Legacy", None)]])
        .into_connection();
    let store = PostgresPostStore::new(db);

    let posts = store.select_all(OrderBy::newest_first()).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "Newer");
    assert!(posts[0].is_owned_by(owner));
    assert_eq!(posts[1].user_id, None);

    let log = format!("{:?}", store.db.into_transaction_log());
    assert!(log.contains("ORDER BY"));
    assert!(log.contains("DESC"));
}

#[tokio::test]
async fn test_find_post_by_id() {
    let row = model("Test Post", None);
    let post_id = row.id;
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row]])
        .into_connection();
    let store = PostgresPostStore::new(db);

    let post = store.select_one(post_id).await.unwrap().unwrap();

    assert_eq!(post.id, post_id);
    assert_eq!(post.title, "Test Post");
}

#[tokio::test]
async fn test_insert_records_owner() {
    let owner = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model("Hello", Some(owner))]])
        .into_connection();
    let store = PostgresPostStore::new(db);
    let row = PostDraft::new("Hello", "Content", "Alice")
        .unwrap()
        .owned_by(owner);

    store.insert(row).await.unwrap();

    let log = format!("{:?}", store.db.into_transaction_log());
    assert!(log.contains("INSERT INTO"));
    assert!(log.contains(&owner.to_string()));
}

#[tokio::test]
async fn test_guarded_update_filters_on_owner() {
    let id = Uuid::new_v4();
    let owner = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let store = PostgresPostStore::new(db);
    let patch = PostPatch::new("Changed", "Body").unwrap();

    let affected = store
        .update(patch, RowFilter::id(id).owned_by(owner))
        .await
        .unwrap();

    assert_eq!(affected, 1);
    let log = format!("{:?}", store.db.into_transaction_log());
    assert!(log.contains("UPDATE"));
    assert!(log.contains("user_id"));
}

#[tokio::test]
async fn test_guarded_delete_reports_zero_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let store = PostgresPostStore::new(db);

    let affected = store
        .delete(RowFilter::id(Uuid::new_v4()).owned_by(Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(affected, 0);
    let log = format!("{:?}", store.db.into_transaction_log());
    assert!(log.contains("DELETE FROM"));
    assert!(log.contains("user_id"));
}
