//! SQLite adapter for the document store ports.
//!
//! Writes that must be all-or-nothing run in `BEGIN IMMEDIATE` transactions
//! so concurrent writers queue on the busy timeout instead of failing on a
//! lock upgrade. Counters are only ever changed with `col = col + ?`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use super::{
    CommentRepo, CommitOutcome, ContentRepo, Counters, Filter, ProfileRepo, ReactionRepo,
    ReactionWrite, SortOrder, StoreQuery,
};
use crate::db::models::{
    from_micros, to_micros, Comment, ContentItem, ContentPatch, ContentStatus, Profile,
    ProfileUpdate, ReactionKind, ReactionRecord, Role, Subject, WatchEntry,
};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

const CONTENT_COLUMNS: &str = "id, title, description, media_url, thumbnail_url, duration_secs, \
     category, tags, is_premium, is_short, status, owner_id, views, likes, dislikes, \
     created_at, updated_at";

const COMMENT_COLUMNS: &str =
    "id, video_id, author_id, parent_id, body, likes, dislikes, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, display_name, avatar_url, role, is_premium, \
     premium_expires_at, videos_watched, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

// --- Row mapping ---

fn parse_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn content_from_row(row: &Row<'_>) -> rusqlite::Result<ContentItem> {
    let tags_json: String = row.get(7)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(ContentItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        media_url: row.get(3)?,
        thumbnail_url: row.get(4)?,
        duration_secs: row.get(5)?,
        category: row.get(6)?,
        tags,
        is_premium: row.get(8)?,
        is_short: row.get(9)?,
        status: parse_column(row, 10)?,
        owner_id: row.get(11)?,
        views: row.get(12)?,
        likes: row.get(13)?,
        dislikes: row.get(14)?,
        created_at: from_micros(row.get(15)?),
        updated_at: from_micros(row.get(16)?),
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        video_id: row.get(1)?,
        author_id: row.get(2)?,
        parent_id: row.get(3)?,
        body: row.get(4)?,
        likes: row.get(5)?,
        dislikes: row.get(6)?,
        created_at: from_micros(row.get(7)?),
        updated_at: from_micros(row.get(8)?),
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        avatar_url: row.get(2)?,
        role: parse_column(row, 3)?,
        is_premium: row.get(4)?,
        premium_expires_at: row.get::<_, Option<i64>>(5)?.map(from_micros),
        videos_watched: row.get(6)?,
        created_at: from_micros(row.get(7)?),
        updated_at: from_micros(row.get(8)?),
    })
}

fn load_content(conn: &rusqlite::Connection, id: &str) -> AppResult<Option<ContentItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {CONTENT_COLUMNS} FROM videos WHERE id = ?1"),
            params![id],
            content_from_row,
        )
        .optional()?;
    Ok(item)
}

fn load_profile(conn: &rusqlite::Connection, id: &str) -> AppResult<Option<Profile>> {
    let profile = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
            params![id],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}

/// Turns a `StoreQuery` into SQL plus positional parameters.
pub(crate) fn compose_sql(query: &StoreQuery) -> AppResult<(String, Vec<Value>)> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    for filter in &query.filters {
        let (clause, value) = match filter {
            Filter::Status(status) => ("status = ?", Value::Text(status.as_str().to_string())),
            Filter::Category(category) => ("category = ?", Value::Text(category.clone())),
            Filter::Owner(owner) => ("owner_id = ?", Value::Text(owner.clone())),
            Filter::Premium(flag) => ("is_premium = ?", Value::Integer(*flag as i64)),
            Filter::Short(flag) => ("is_short = ?", Value::Integer(*flag as i64)),
        };
        clauses.push(clause.to_string());
        values.push(value);
    }

    let column = query.sort.field.column();
    if let Some(cursor) = &query.start_after {
        if cursor.field != query.sort.field {
            return Err(AppError::BadRequest(
                "Continuation cursor belongs to a different sort field".into(),
            ));
        }
        let op = match query.sort.order {
            SortOrder::Asc => ">",
            SortOrder::Desc => "<",
        };
        clauses.push(format!(
            "({column} {op} ? OR ({column} = ? AND id {op} ?))"
        ));
        values.push(Value::Integer(cursor.value));
        values.push(Value::Integer(cursor.value));
        values.push(Value::Text(cursor.id.clone()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let dir = query.sort.order.keyword();
    let sql = format!(
        "SELECT {CONTENT_COLUMNS} FROM videos{where_clause} ORDER BY {column} {dir}, id {dir} LIMIT ?"
    );
    values.push(Value::Integer(query.limit as i64));

    Ok((sql, values))
}

#[async_trait]
impl ContentRepo for SqliteStore {
    async fn query_content(&self, query: &StoreQuery) -> AppResult<Vec<ContentItem>> {
        let (sql, values) = compose_sql(query)?;
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Query(e.to_string()))?;
        let items = stmt
            .query_map(rusqlite::params_from_iter(values), content_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn get_content(&self, id: &str) -> AppResult<Option<ContentItem>> {
        let conn = self.pool.get()?;
        load_content(&conn, id)
    }

    async fn insert_content(&self, item: &ContentItem) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO videos ({CONTENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                item.id,
                item.title,
                item.description,
                item.media_url,
                item.thumbnail_url,
                item.duration_secs,
                item.category,
                serde_json::to_string(&item.tags)?,
                item.is_premium,
                item.is_short,
                item.status.as_str(),
                item.owner_id,
                item.views,
                item.likes,
                item.dislikes,
                to_micros(&item.created_at),
                to_micros(&item.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        patch: &ContentPatch,
        at: DateTime<Utc>,
    ) -> AppResult<Option<ContentItem>> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut item) = load_content(&tx, id)? else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        if let Some(description) = &patch.description {
            item.description = description.clone();
        }
        if let Some(tags) = &patch.tags {
            item.tags = tags.clone();
        }
        if let Some(is_premium) = patch.is_premium {
            item.is_premium = is_premium;
        }

        tx.execute(
            "UPDATE videos SET title = ?1, description = ?2, tags = ?3, is_premium = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                item.title,
                item.description,
                serde_json::to_string(&item.tags)?,
                item.is_premium,
                to_micros(&at),
                id,
            ],
        )?;
        let updated = load_content(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    async fn transition_status(
        &self,
        id: &str,
        from: ContentStatus,
        to: ContentStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE videos SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![to.as_str(), to_micros(&at), id, from.as_str()],
        )?;
        Ok(rows > 0)
    }

    async fn delete_content(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM reactions WHERE subject_kind = 'comment'
             AND subject_id IN (SELECT id FROM comments WHERE video_id = ?1)",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM reactions WHERE subject_kind = 'video' AND subject_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM comments WHERE video_id = ?1", params![id])?;
        tx.execute("DELETE FROM watch_history WHERE video_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM videos WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    async fn record_view(
        &self,
        id: &str,
        viewer: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<i64>> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = tx.execute(
            "UPDATE videos SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Ok(None);
        }

        if let Some(user_id) = viewer {
            tx.execute(
                "INSERT INTO watch_history (id, user_id, video_id, watched_at) VALUES (?1, ?2, ?3, ?4)",
                params![uuid::Uuid::now_v7().to_string(), user_id, id, to_micros(&at)],
            )?;
            tx.execute(
                "UPDATE profiles SET videos_watched = videos_watched + 1 WHERE id = ?1",
                params![user_id],
            )?;
        }

        let views: i64 = tx.query_row(
            "SELECT views FROM videos WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Some(views))
    }
}

#[async_trait]
impl ReactionRepo for SqliteStore {
    async fn get_reaction(
        &self,
        subject: &Subject,
        user_id: &str,
    ) -> AppResult<Option<ReactionRecord>> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                "SELECT kind, created_at, updated_at FROM reactions
                 WHERE subject_kind = ?1 AND subject_id = ?2 AND user_id = ?3",
                params![subject.kind.as_str(), subject.id, user_id],
                |row| {
                    Ok(ReactionRecord {
                        subject: subject.clone(),
                        user_id: user_id.to_string(),
                        kind: parse_column(row, 0)?,
                        created_at: from_micros(row.get(1)?),
                        updated_at: from_micros(row.get(2)?),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    async fn commit_reaction(&self, write: &ReactionWrite) -> AppResult<CommitOutcome> {
        let table = write.subject.kind.counter_table();
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            &format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1"),
            params![write.subject.id],
            |r| r.get(0),
        )?;
        if !exists {
            return Err(AppError::SubjectNotFound);
        }

        let current: Option<ReactionKind> = tx
            .query_row(
                "SELECT kind FROM reactions WHERE subject_kind = ?1 AND subject_id = ?2 AND user_id = ?3",
                params![write.subject.kind.as_str(), write.subject.id, write.user_id],
                |row| parse_column(row, 0),
            )
            .optional()?;
        if current != write.expected {
            return Ok(CommitOutcome::Conflict);
        }

        let at = to_micros(&write.at);
        match (current, write.next) {
            (Some(_), None) => {
                tx.execute(
                    "DELETE FROM reactions WHERE subject_kind = ?1 AND subject_id = ?2 AND user_id = ?3",
                    params![write.subject.kind.as_str(), write.subject.id, write.user_id],
                )?;
            }
            (Some(prev), Some(next)) if prev != next => {
                tx.execute(
                    "UPDATE reactions SET kind = ?1, updated_at = ?2
                     WHERE subject_kind = ?3 AND subject_id = ?4 AND user_id = ?5",
                    params![
                        next.as_str(),
                        at,
                        write.subject.kind.as_str(),
                        write.subject.id,
                        write.user_id
                    ],
                )?;
            }
            (None, Some(next)) => {
                tx.execute(
                    "INSERT INTO reactions (subject_kind, subject_id, user_id, kind, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![
                        write.subject.kind.as_str(),
                        write.subject.id,
                        write.user_id,
                        next.as_str(),
                        at
                    ],
                )?;
            }
            _ => {}
        }

        if write.likes_delta != 0 || write.dislikes_delta != 0 {
            tx.execute(
                &format!(
                    "UPDATE {table} SET likes = likes + ?1, dislikes = dislikes + ?2 WHERE id = ?3"
                ),
                params![write.likes_delta, write.dislikes_delta, write.subject.id],
            )?;
        }

        let counters = tx.query_row(
            &format!("SELECT likes, dislikes FROM {table} WHERE id = ?1"),
            params![write.subject.id],
            |r| {
                Ok(Counters {
                    likes: r.get(0)?,
                    dislikes: r.get(1)?,
                })
            },
        )?;

        tx.commit()?;
        Ok(CommitOutcome::Applied(counters))
    }
}

#[async_trait]
impl CommentRepo for SqliteStore {
    async fn insert_comment(&self, comment: &Comment) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                comment.id,
                comment.video_id,
                comment.author_id,
                comment.parent_id,
                comment.body,
                comment.likes,
                comment.dislikes,
                to_micros(&comment.created_at),
                to_micros(&comment.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> AppResult<Option<Comment>> {
        let conn = self.pool.get()?;
        let comment = conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    async fn list_comments(&self, video_id: &str) -> AppResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE video_id = ?1 ORDER BY created_at ASC, id ASC"
        ))?;
        let comments = stmt
            .query_map(params![video_id], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn update_comment_body(
        &self,
        id: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE comments SET body = ?1, updated_at = ?2 WHERE id = ?3",
            params![body, to_micros(&at), id],
        )?;
        Ok(rows > 0)
    }

    async fn delete_comment(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM reactions WHERE subject_kind = 'comment'
             AND (subject_id = ?1 OR subject_id IN (SELECT id FROM comments WHERE parent_id = ?1))",
            params![id],
        )?;
        tx.execute("DELETE FROM comments WHERE parent_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM comments WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }
}

#[async_trait]
impl ProfileRepo for SqliteStore {
    async fn insert_profile(&self, profile: &Profile) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO profiles ({PROFILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                profile.id,
                profile.display_name,
                profile.avatar_url,
                profile.role.as_str(),
                profile.is_premium,
                profile.premium_expires_at.as_ref().map(to_micros),
                profile.videos_watched,
                to_micros(&profile.created_at),
                to_micros(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        let conn = self.pool.get()?;
        load_profile(&conn, id)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE profiles SET display_name = COALESCE(?1, display_name),
                                 avatar_url = COALESCE(?2, avatar_url),
                                 updated_at = ?3
             WHERE id = ?4",
            params![update.display_name, update.avatar_url, to_micros(&at), id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        load_profile(&conn, id)
    }

    async fn set_role(&self, id: &str, role: Role, at: DateTime<Utc>) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE profiles SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![role.as_str(), to_micros(&at), id],
        )?;
        Ok(rows > 0)
    }

    async fn set_premium(
        &self,
        id: &str,
        is_premium: bool,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE profiles SET is_premium = ?1, premium_expires_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                is_premium,
                expires_at.as_ref().map(to_micros),
                to_micros(&at),
                id
            ],
        )?;
        Ok(rows > 0)
    }

    async fn watch_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<WatchEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, video_id, watched_at FROM watch_history
             WHERE user_id = ?1 ORDER BY watched_at DESC, id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(WatchEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    video_id: row.get(2)?,
                    watched_at: from_micros(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Cursor, Sort, SortField};

    #[test]
    fn compose_sql_orders_by_field_then_id() {
        let query = StoreQuery {
            filters: vec![
                Filter::Status(ContentStatus::Published),
                Filter::Category("Müzik".into()),
            ],
            sort: Sort {
                field: SortField::Views,
                order: SortOrder::Desc,
            },
            limit: 10,
            start_after: None,
        };
        let (sql, values) = compose_sql(&query).unwrap();
        assert!(sql.contains("WHERE status = ? AND category = ?"));
        assert!(sql.ends_with("ORDER BY views DESC, id DESC LIMIT ?"));
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], Value::Integer(10));
    }

    #[test]
    fn compose_sql_adds_keyset_clause_for_cursor() {
        let query = StoreQuery {
            filters: vec![],
            sort: Sort {
                field: SortField::CreatedAt,
                order: SortOrder::Asc,
            },
            limit: 5,
            start_after: Some(Cursor {
                field: SortField::CreatedAt,
                value: 100,
                id: "b".into(),
            }),
        };
        let (sql, values) = compose_sql(&query).unwrap();
        assert!(sql.contains("(created_at > ? OR (created_at = ? AND id > ?))"));
        assert_eq!(
            values,
            vec![
                Value::Integer(100),
                Value::Integer(100),
                Value::Text("b".into()),
                Value::Integer(5),
            ]
        );
    }

    #[test]
    fn cursor_for_another_sort_field_is_rejected() {
        let query = StoreQuery {
            filters: vec![],
            sort: Sort {
                field: SortField::Likes,
                order: SortOrder::Desc,
            },
            limit: 5,
            start_after: Some(Cursor {
                field: SortField::Views,
                value: 1,
                id: "a".into(),
            }),
        };
        assert!(matches!(compose_sql(&query), Err(AppError::BadRequest(_))));
    }
}
