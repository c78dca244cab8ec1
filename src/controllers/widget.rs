use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::store::{WidgetStore, begin_write};
use crate::types::widget::{NewWidget, Widget, WidgetPatch};

#[derive(Clone, Debug)]
pub(crate) struct WidgetController {
    pool: SqlitePool,
}

impl WidgetController {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl WidgetStore for WidgetController {
    #[instrument(skip(self, widget))]
    async fn create_widget(&self, owner: i64, widget: NewWidget) -> Result<Widget, Error> {
        widget.validate()?;

        let now = Utc::now();

        let mut tx = begin_write(&self.pool).await?;

        let created = sqlx::query(
            "INSERT INTO widgets (
                type, content, position_x, position_y, width, height, anchor,
                created_at, updated_at, user_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id, type, content, position_x, position_y, width, height, anchor,
                created_at, updated_at, user_id;",
        )
        .bind(&widget.kind)
        .bind(Json(&widget.content))
        .bind(widget.position_x)
        .bind(widget.position_y)
        .bind(widget.width)
        .bind(widget.height)
        .bind(widget.anchor.as_str())
        .bind(now)
        .bind(now)
        .bind(owner)
        .try_map(map_widget)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(id = created.id, kind = %created.kind, "widget created");

        Ok(created)
    }

    async fn list_widgets(&self, owner: i64) -> Result<Vec<Widget>, Error> {
        let widgets = sqlx::query(
            "SELECT
                id, type, content, position_x, position_y, width, height, anchor,
                created_at, updated_at, user_id
            FROM widgets
            WHERE user_id = ?
            ORDER BY id;",
        )
        .bind(owner)
        .try_map(map_widget)
        .fetch_all(&self.pool)
        .await?;

        Ok(widgets)
    }

    async fn get_widget(&self, owner: i64, id: i64) -> Result<Option<Widget>, Error> {
        let widget = sqlx::query(
            "SELECT
                id, type, content, position_x, position_y, width, height, anchor,
                created_at, updated_at, user_id
            FROM widgets
            WHERE id = ? AND user_id = ?;",
        )
        .bind(id)
        .bind(owner)
        .try_map(map_widget)
        .fetch_optional(&self.pool)
        .await?;

        Ok(widget)
    }

    #[instrument(skip(self, patch))]
    async fn update_widget(
        &self,
        owner: i64,
        id: i64,
        patch: WidgetPatch,
    ) -> Result<Option<Widget>, Error> {
        patch.validate()?;

        let mut tx = begin_write(&self.pool).await?;

        let Some(mut widget) = sqlx::query(
            "SELECT
                id, type, content, position_x, position_y, width, height, anchor,
                created_at, updated_at, user_id
            FROM widgets
            WHERE id = ? AND user_id = ?;",
        )
        .bind(id)
        .bind(owner)
        .try_map(map_widget)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        patch.apply(&mut widget);

        // updated_at must move forward even when the clock has not
        widget.updated_at = Utc::now().max(widget.updated_at + Duration::microseconds(1));

        sqlx::query(
            "UPDATE widgets
            SET type = ?, content = ?, position_x = ?, position_y = ?, width = ?, height = ?,
                anchor = ?, updated_at = ?
            WHERE id = ? AND user_id = ?;",
        )
        .bind(&widget.kind)
        .bind(Json(&widget.content))
        .bind(widget.position_x)
        .bind(widget.position_y)
        .bind(widget.width)
        .bind(widget.height)
        .bind(widget.anchor.as_str())
        .bind(widget.updated_at)
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("widget updated");

        Ok(Some(widget))
    }

    #[instrument(skip(self))]
    async fn delete_widget(&self, owner: i64, id: i64) -> Result<bool, Error> {
        let mut tx = begin_write(&self.pool).await?;

        let result = sqlx::query("DELETE FROM widgets WHERE id = ? AND user_id = ?;")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_widgets(&self) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM widgets;")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn map_widget(row: SqliteRow) -> Result<Widget, sqlx::Error> {
    let content: Json<Value> = row.try_get("content")?;
    let anchor: String = row.try_get("anchor")?;

    Ok(Widget {
        id: row.try_get("id")?,
        kind: row.try_get("type")?,
        content: content.0,
        position_x: row.try_get("position_x")?,
        position_y: row.try_get("position_y")?,
        width: row.try_get("width")?,
        height: row.try_get("height")?,
        anchor: anchor.parse().map_err(|e| sqlx::Error::ColumnDecode {
            index: "anchor".into(),
            source: Box::new(e),
        })?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        user_id: row.try_get("user_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::user::tests::new_user;
    use crate::controllers::user::UserController;
    use crate::core::config::MIN_BCRYPT_COST;
    use crate::core::store::{CredentialStore, shared_test_pool, test_pool};
    use crate::types::widget::Anchor;
    use serde_json::json;

    async fn controllers() -> (UserController, WidgetController) {
        let pool = test_pool().await;

        (
            UserController::new(pool.clone(), MIN_BCRYPT_COST).unwrap(),
            WidgetController::new(pool),
        )
    }

    async fn setup() -> (WidgetController, i64, i64) {
        let (users, widgets) = controllers().await;
        let alice = users.create_user(new_user("alice", "pw1")).await.unwrap();
        let bob = users.create_user(new_user("bob", "pw2")).await.unwrap();

        (widgets, alice.id, bob.id)
    }

    fn text_widget(text: &str) -> NewWidget {
        serde_json::from_value(json!({
            "type": "text",
            "content": {"text": text, "style": {"bold": true}},
            "position_x": 12.0,
            "position_y": 34.0,
            "width": 200.0,
            "height": 80.0,
            "anchor": "top-left"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_binds_owner_and_keeps_content() {
        let (widgets, alice, _) = setup().await;

        let created = widgets.create_widget(alice, text_widget("hi")).await.unwrap();

        assert_eq!(created.user_id, alice);
        assert_eq!(created.anchor, Anchor::TopLeft);
        assert_eq!(created.content, json!({"text": "hi", "style": {"bold": true}}));
        assert_eq!(created.created_at, created.updated_at);

        let listed = widgets.list_widgets(alice).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn create_rejects_invalid_geometry() {
        let (widgets, alice, _) = setup().await;

        let mut widget = text_widget("hi");
        widget.height = -5.0;

        assert!(matches!(
            widgets.create_widget(alice, widget).await,
            Err(Error::Validation(_))
        ));
        assert!(widgets.list_widgets(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_update_advances_updated_at() {
        let (widgets, alice, _) = setup().await;
        let created = widgets.create_widget(alice, text_widget("hi")).await.unwrap();

        let patch = WidgetPatch {
            width: Some(320.0),
            ..Default::default()
        };
        let updated = widgets
            .update_widget(alice, created.id, patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.width, 320.0);
        assert_eq!(updated.kind, created.kind);
        assert_eq!(updated.content, created.content);
        assert_eq!(updated.position_x, created.position_x);
        assert_eq!(updated.position_y, created.position_y);
        assert_eq!(updated.height, created.height);
        assert_eq!(updated.anchor, created.anchor);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let empty = widgets
            .update_widget(alice, created.id, WidgetPatch::default())
            .await
            .unwrap()
            .unwrap();
        assert!(empty.updated_at > updated.updated_at);

        let stored = widgets.get_widget(alice, created.id).await.unwrap().unwrap();
        assert_eq!(stored, empty);
    }

    #[tokio::test]
    async fn invalid_update_leaves_widget_untouched() {
        let (widgets, alice, _) = setup().await;
        let created = widgets.create_widget(alice, text_widget("hi")).await.unwrap();

        let patch = WidgetPatch {
            kind: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            widgets.update_widget(alice, created.id, patch).await,
            Err(Error::Validation(_))
        ));

        let patch = WidgetPatch {
            width: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            widgets.update_widget(alice, created.id, patch).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(
            widgets.get_widget(alice, created.id).await.unwrap().unwrap(),
            created
        );
    }

    #[tokio::test]
    async fn foreign_widgets_look_missing() {
        let (widgets, alice, bob) = setup().await;
        let created = widgets.create_widget(alice, text_widget("mine")).await.unwrap();

        assert!(widgets.get_widget(bob, created.id).await.unwrap().is_none());
        assert!(widgets.list_widgets(bob).await.unwrap().is_empty());

        let patch = WidgetPatch {
            content: Some(json!({"text": "stolen"})),
            ..Default::default()
        };
        assert!(widgets
            .update_widget(bob, created.id, patch)
            .await
            .unwrap()
            .is_none());
        assert!(!widgets.delete_widget(bob, created.id).await.unwrap());

        assert_eq!(
            widgets.get_widget(bob, created.id).await.unwrap().is_none(),
            widgets.get_widget(alice, 9999).await.unwrap().is_none()
        );
        assert_eq!(
            widgets.get_widget(alice, created.id).await.unwrap().unwrap(),
            created
        );
    }

    #[tokio::test]
    async fn delete_removes_widget() {
        let (widgets, alice, _) = setup().await;
        let keep = widgets.create_widget(alice, text_widget("keep")).await.unwrap();
        let doomed = widgets.create_widget(alice, text_widget("drop")).await.unwrap();

        assert!(widgets.delete_widget(alice, doomed.id).await.unwrap());
        assert!(!widgets.delete_widget(alice, doomed.id).await.unwrap());

        let remaining = widgets.list_widgets(alice).await.unwrap();
        assert_eq!(remaining, vec![keep]);
    }

    #[tokio::test]
    async fn deleting_owner_removes_widgets() {
        let (users, widgets) = controllers().await;
        let alice = users.create_user(new_user("alice", "pw1")).await.unwrap();

        let created = widgets
            .create_widget(alice.id, text_widget("bye"))
            .await
            .unwrap();

        assert!(users.delete_user(alice.id).await.unwrap());

        assert!(widgets.get_widget(alice.id, created.id).await.unwrap().is_none());
        assert!(widgets.list_widgets(alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_anchor_is_an_error() {
        let (widgets, alice, _) = setup().await;
        let created = widgets.create_widget(alice, text_widget("hi")).await.unwrap();

        sqlx::query("UPDATE widgets SET anchor = 'sideways' WHERE id = ?;")
            .bind(created.id)
            .execute(&widgets.pool)
            .await
            .unwrap();

        assert!(matches!(
            widgets.get_widget(alice, created.id).await,
            Err(Error::Sql(sqlx::Error::ColumnDecode { .. }))
        ));
    }

    #[tokio::test]
    async fn counts_widgets_of_all_owners() {
        let (widgets, alice, bob) = setup().await;
        assert_eq!(widgets.count_widgets().await.unwrap(), 0);

        widgets.create_widget(alice, text_widget("a")).await.unwrap();
        widgets.create_widget(alice, text_widget("b")).await.unwrap();
        widgets.create_widget(bob, text_widget("c")).await.unwrap();

        assert_eq!(widgets.count_widgets().await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_all_commit() {
        let (_dir, pool) = shared_test_pool().await;
        let users = UserController::new(pool.clone(), MIN_BCRYPT_COST).unwrap();
        let widgets = WidgetController::new(pool);
        let alice = users.create_user(new_user("alice", "pw1")).await.unwrap().id;
        let created = widgets.create_widget(alice, text_widget("hi")).await.unwrap();
        let id = created.id;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let widgets = widgets.clone();
                let patch = WidgetPatch {
                    width: Some(f64::from(i)),
                    ..Default::default()
                };
                tokio::spawn(async move { widgets.update_widget(alice, id, patch).await })
            })
            .collect();

        let mut widths = Vec::new();
        for handle in handles {
            let updated = handle.await.unwrap().unwrap().unwrap();
            assert!(updated.updated_at > created.updated_at);
            widths.push(updated.width);
        }

        // the last committed write wins
        let stored = widgets.get_widget(alice, created.id).await.unwrap().unwrap();
        assert!(widths.contains(&stored.width));
        assert_eq!(stored.content, created.content);
    }
}
