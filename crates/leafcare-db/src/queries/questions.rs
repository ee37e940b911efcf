use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::Value;

use leafcare_types::api::QuestionInput;
use leafcare_types::models::{Question, QuestionFilter};

use super::{Conditions, OptionalExt, QUESTION_COLUMNS, question_from_row};
use crate::models::now_timestamp;
use crate::{Database, DbError};

impl Database {
    pub fn create_question(&self, id: &str, author_id: &str, input: &QuestionInput) -> Result<Question> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_timestamp();
            tx.execute(
                "INSERT INTO questions (id, title, content, author_id, image_url, crop, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![id, input.title, input.content, author_id, input.image_url, input.crop, now],
            )?;
            let question = load_question(&tx, id)?.ok_or(DbError::NotFound("Question"))?;
            tx.commit()?;
            Ok(question)
        })
    }

    /// Rewrites title, content, image and crop. Only the author may edit.
    pub fn update_question(&self, id: &str, user_id: &str, input: &QuestionInput) -> Result<Question> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let author_id: String = tx
                .query_row("SELECT author_id FROM questions WHERE id = ?1", [id], |row| row.get(0))
                .optional()?
                .ok_or(DbError::NotFound("Question"))?;
            if author_id != user_id {
                return Err(DbError::Forbidden("You are not authorized to edit this question".to_string()).into());
            }

            tx.execute(
                "UPDATE questions
                 SET title = ?1, content = ?2, image_url = ?3, crop = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![input.title, input.content, input.image_url, input.crop, now_timestamp(), id],
            )?;

            let question = load_question(&tx, id)?.ok_or(DbError::NotFound("Question"))?;
            tx.commit()?;
            Ok(question)
        })
    }

    pub fn get_question(&self, id: &str) -> Result<Option<Question>> {
        self.with_conn(|conn| load_question(conn, id))
    }

    /// Returns the new view count, or `None` when the question is missing.
    pub fn increment_views(&self, id: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE questions SET views = views + 1 WHERE id = ?1 RETURNING views",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// One page of questions plus the total match count.
    pub fn list_questions(
        &self,
        keyword: Option<&str>,
        filter: QuestionFilter,
        skip: u32,
        limit: u32,
    ) -> Result<(Vec<Question>, u64)> {
        let mut conditions = Conditions::default();
        let order = match filter {
            QuestionFilter::Recommended => return Ok((Vec::new(), 0)),
            QuestionFilter::Newest => "q.created_at DESC, q.rowid DESC",
            QuestionFilter::Unanswered => {
                conditions.push("q.answers = 0", std::iter::empty());
                "q.created_at DESC, q.rowid DESC"
            }
            QuestionFilter::Popular => "q.upvotes DESC, q.created_at DESC, q.rowid DESC",
        };
        if let Some(keyword) = keyword {
            conditions.keyword(&["q.title", "q.content"], keyword);
        }

        self.with_conn(|conn| {
            let where_sql = conditions.sql();

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM questions q {}", where_sql),
                rusqlite::params_from_iter(conditions.args.iter()),
                |r| r.get(0),
            )?;

            let mut args = conditions.args.clone();
            args.push(Value::Integer(i64::from(limit)));
            args.push(Value::Integer(i64::from(skip)));

            let mut stmt = conn.prepare(&format!(
                "SELECT {}
                 FROM questions q
                 LEFT JOIN users u ON q.author_id = u.id
                 {}
                 ORDER BY {}
                 LIMIT ? OFFSET ?",
                QUESTION_COLUMNS, where_sql, order
            ))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), question_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows.into_iter().map(Question::from).collect(), total as u64))
        })
    }
}

fn load_question(conn: &Connection, id: &str) -> Result<Option<Question>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM questions q LEFT JOIN users u ON q.author_id = u.id WHERE q.id = ?1",
                QUESTION_COLUMNS
            ),
            [id],
            question_from_row,
        )
        .optional()?;
    Ok(row.map(Question::from))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::super::test_support;
    use super::*;

    fn input(title: &str, content: &str) -> QuestionInput {
        QuestionInput {
            title: title.to_string(),
            content: content.to_string(),
            image_url: None,
            crop: None,
        }
    }

    fn ask(db: &Database, author: &str, title: &str, content: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_question(&id, author, &input(title, content)).unwrap();
        id
    }

    #[test]
    fn create_and_fetch_question_with_author() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let mut q = input("Yellow leaves on rice", "Started last week");
        q.crop = Some("Rice".into());
        let id = Uuid::new_v4().to_string();
        let created = db.create_question(&id, &fern, &q).unwrap();

        assert_eq!(created.author.name, "fern");
        assert_eq!(created.crop.as_deref(), Some("Rice"));
        assert_eq!((created.views, created.answers, created.upvotes), (0, 0, 0));

        let fetched = db.get_question(&id).unwrap().unwrap();
        assert_eq!(fetched.title, "Yellow leaves on rice");
    }

    #[test]
    fn only_author_can_edit() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let moss = test_support::user(&db, "moss");
        let id = ask(&db, &fern, "Original title", "body");

        let err = db.update_question(&id, &moss, &input("Hijacked", "x")).unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Forbidden(_))));

        let edited = db.update_question(&id, &fern, &input("Better title", "more detail")).unwrap();
        assert_eq!(edited.title, "Better title");
        assert_eq!(edited.content, "more detail");
    }

    #[test]
    fn increment_views_counts_up() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let id = ask(&db, &fern, "Spots", "body");
        assert_eq!(db.increment_views(&id).unwrap(), Some(1));
        assert_eq!(db.increment_views(&id).unwrap(), Some(2));
        assert_eq!(db.increment_views("missing").unwrap(), None);
    }

    #[test]
    fn list_questions_filters() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let old = ask(&db, &fern, "Wheat rust", "orange pustules");
        let _new = ask(&db, &fern, "Potato blight", "dark lesions on WHEAT too");

        let (newest, total) = db.list_questions(None, QuestionFilter::Newest, 0, 10).unwrap();
        assert_eq!(total, 2);
        assert_eq!(newest[0].title, "Potato blight");

        let (matches, total) = db.list_questions(Some("wheat"), QuestionFilter::Newest, 0, 10).unwrap();
        assert_eq!((matches.len(), total), (2, 2));

        db.with_conn(|conn| {
            conn.execute("UPDATE questions SET answers = 1, upvotes = 5 WHERE id = ?1", [&old])?;
            Ok(())
        })
        .unwrap();

        let (unanswered, total) = db.list_questions(None, QuestionFilter::Unanswered, 0, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(unanswered[0].title, "Potato blight");

        let (popular, _) = db.list_questions(None, QuestionFilter::Popular, 0, 10).unwrap();
        assert_eq!(popular[0].title, "Wheat rust");

        let (recommended, total) = db.list_questions(None, QuestionFilter::Recommended, 0, 10).unwrap();
        assert!(recommended.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn popular_pages_are_stable_when_keys_tie() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let ids: Vec<_> = (0..4)
            .map(|i| ask(&db, &fern, &format!("Question {}", i), "body"))
            .collect();
        db.with_conn(|conn| {
            conn.execute("UPDATE questions SET created_at = '2024-01-01T00:00:00.000000Z'", [])?;
            Ok(())
        })
        .unwrap();

        let mut seen = Vec::new();
        for page in 0..4 {
            let (rows, _) = db.list_questions(None, QuestionFilter::Popular, page, 1).unwrap();
            seen.push(rows[0].id.to_string());
        }
        let expected: Vec<_> = ids.iter().rev().cloned().collect();
        assert_eq!(seen, expected);
    }
}
