use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::Value;

use leafcare_types::api::AnswerInput;
use leafcare_types::models::{Answer, AnswerFilter};

use super::{ANSWER_COLUMNS, Conditions, OptionalExt, answer_from_row};
use crate::models::now_timestamp;
use crate::{Database, DbError};

impl Database {
    /// Inserts the answer and bumps the question's answer counter atomically.
    pub fn create_answer(
        &self,
        id: &str,
        question_id: &str,
        author_id: &str,
        input: &AnswerInput,
    ) -> Result<Answer> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.query_row("SELECT 1 FROM questions WHERE id = ?1", [question_id], |_| Ok(()))
                .optional()?
                .ok_or(DbError::NotFound("Question"))?;

            let now = now_timestamp();
            tx.execute(
                "INSERT INTO answers (id, question_id, author_id, content, image_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, question_id, author_id, input.content, input.image_url, now],
            )?;
            tx.execute(
                "UPDATE questions SET answers = answers + 1 WHERE id = ?1",
                [question_id],
            )?;

            let answer = load_answer(&tx, id)?.ok_or(DbError::NotFound("Answer"))?;
            tx.commit()?;
            Ok(answer)
        })
    }

    pub fn get_answer(&self, id: &str) -> Result<Option<Answer>> {
        self.with_conn(|conn| load_answer(conn, id))
    }

    /// One page of a question's answers plus the total answer count.
    pub fn list_answers(
        &self,
        question_id: &str,
        filter: AnswerFilter,
        skip: u32,
        limit: u32,
    ) -> Result<(Vec<Answer>, u64)> {
        let mut conditions = Conditions::default();
        conditions.push("a.question_id = ?", [Value::Text(question_id.to_string())]);
        let order = match filter {
            AnswerFilter::Latest => "a.created_at DESC, a.rowid DESC",
            AnswerFilter::Oldest => "a.created_at ASC, a.rowid ASC",
            AnswerFilter::Popular => "a.upvotes DESC, a.created_at DESC, a.rowid DESC",
        };

        self.with_conn(|conn| {
            let where_sql = conditions.sql();

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM answers a {}", where_sql),
                rusqlite::params_from_iter(conditions.args.iter()),
                |r| r.get(0),
            )?;

            let mut args = conditions.args.clone();
            args.push(Value::Integer(i64::from(limit)));
            args.push(Value::Integer(i64::from(skip)));

            let mut stmt = conn.prepare(&format!(
                "SELECT {}
                 FROM answers a
                 LEFT JOIN users u ON a.author_id = u.id
                 {}
                 ORDER BY {}
                 LIMIT ? OFFSET ?",
                ANSWER_COLUMNS, where_sql, order
            ))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), answer_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows.into_iter().map(Answer::from).collect(), total as u64))
        })
    }
}

fn load_answer(conn: &Connection, id: &str) -> Result<Option<Answer>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM answers a LEFT JOIN users u ON a.author_id = u.id WHERE a.id = ?1",
                ANSWER_COLUMNS
            ),
            [id],
            answer_from_row,
        )
        .optional()?;
    Ok(row.map(Answer::from))
}

#[cfg(test)]
mod tests {
    use leafcare_types::api::QuestionInput;
    use uuid::Uuid;

    use super::super::test_support;
    use super::*;

    fn question(db: &Database, author: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let input = QuestionInput {
            title: "Curling tomato leaves".into(),
            content: "Leaves curl upward".into(),
            image_url: None,
            crop: Some("Tomato".into()),
        };
        db.create_question(&id, author, &input).unwrap();
        id
    }

    fn answer(db: &Database, question_id: &str, author: &str, content: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let input = AnswerInput { content: content.to_string(), image_url: None };
        db.create_answer(&id, question_id, author, &input).unwrap();
        id
    }

    #[test]
    fn create_answer_bumps_question_counter() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let moss = test_support::user(&db, "moss");
        let qid = question(&db, &fern);

        answer(&db, &qid, &moss, "Check for heat stress");
        answer(&db, &qid, &fern, "Could be herbicide drift");

        let q = db.get_question(&qid).unwrap().unwrap();
        assert_eq!(q.answers, 2);
    }

    #[test]
    fn answer_to_missing_question_is_not_found() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let input = AnswerInput { content: "hello".into(), image_url: None };
        let err = db.create_answer("a1", "missing", &fern, &input).unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::NotFound("Question"))));
        assert!(db.get_answer("a1").unwrap().is_none());
    }

    #[test]
    fn list_answers_orders_by_filter() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let qid = question(&db, &fern);
        let first = answer(&db, &qid, &fern, "first");
        answer(&db, &qid, &fern, "second");
        answer(&db, &qid, &fern, "third");

        let (latest, total) = db.list_answers(&qid, AnswerFilter::Latest, 0, 10).unwrap();
        assert_eq!(total, 3);
        assert_eq!(latest[0].content, "third");
        assert_eq!(latest[0].author.name, "fern");

        let (oldest, _) = db.list_answers(&qid, AnswerFilter::Oldest, 0, 2).unwrap();
        let contents: Vec<_> = oldest.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        db.with_conn(|conn| {
            conn.execute("UPDATE answers SET upvotes = 3 WHERE id = ?1", [&first])?;
            Ok(())
        })
        .unwrap();
        let (popular, _) = db.list_answers(&qid, AnswerFilter::Popular, 0, 10).unwrap();
        assert_eq!(popular[0].content, "first");
    }

    #[test]
    fn popular_answers_page_without_repeats() {
        let db = test_support::db();
        let fern = test_support::user(&db, "fern");
        let qid = question(&db, &fern);
        let ids: Vec<_> = (0..3).map(|i| answer(&db, &qid, &fern, &format!("answer {}", i))).collect();
        db.with_conn(|conn| {
            conn.execute("UPDATE answers SET created_at = '2024-01-01T00:00:00.000000Z'", [])?;
            Ok(())
        })
        .unwrap();

        let mut seen = Vec::new();
        for page in 0..3 {
            let (rows, _) = db.list_answers(&qid, AnswerFilter::Popular, page, 1).unwrap();
            seen.push(rows[0].id.to_string());
        }
        let expected: Vec<_> = ids.iter().rev().cloned().collect();
        assert_eq!(seen, expected);
    }
}
