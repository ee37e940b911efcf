mod answers;
mod chats;
mod questions;
mod users;
mod votes;

use anyhow::Result;
use rusqlite::Row;
use rusqlite::types::Value;

use crate::models::{AnswerRow, AuthorRow, QuestionRow};

const QUESTION_COLUMNS: &str =
    "q.id, q.title, q.content, q.author_id, u.name, u.image, q.views, q.answers,
     q.upvotes, q.downvotes, q.image_url, q.crop, q.created_at, q.updated_at";

const ANSWER_COLUMNS: &str =
    "a.id, a.question_id, a.author_id, u.name, u.image, a.content, a.upvotes,
     a.downvotes, a.image_url, a.created_at, a.updated_at";

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<QuestionRow> {
    Ok(QuestionRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author: AuthorRow {
            id: row.get(3)?,
            name: row.get(4)?,
            image: row.get(5)?,
        },
        views: row.get(6)?,
        answers: row.get(7)?,
        upvotes: row.get(8)?,
        downvotes: row.get(9)?,
        image_url: row.get(10)?,
        crop: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<AnswerRow> {
    Ok(AnswerRow {
        id: row.get(0)?,
        question_id: row.get(1)?,
        author: AuthorRow {
            id: row.get(2)?,
            name: row.get(3)?,
            image: row.get(4)?,
        },
        content: row.get(5)?,
        upvotes: row.get(6)?,
        downvotes: row.get(7)?,
        image_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Accumulates `WHERE` conditions with their positional `?` arguments.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    args: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, clause: &str, args: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.args.extend(args);
    }

    /// Case-insensitive substring match of `keyword` against every column.
    fn keyword(&mut self, columns: &[&str], keyword: &str) {
        let pattern = like_pattern(keyword);
        let clause = columns
            .iter()
            .map(|c| format!("{} LIKE ? ESCAPE '\\'", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(
            &format!("({})", clause),
            columns.iter().map(|_| Value::Text(pattern.clone())),
        );
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Escapes LIKE metacharacters so the keyword matches literally.
/// SQLite's LIKE folds ASCII case only.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use uuid::Uuid;

    use crate::Database;
    use crate::models::NewUser;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let email = format!("{}@example.com", username);
        db.create_user(&NewUser {
            id: &id,
            name: username,
            username,
            email: &email,
            image: None,
            password_hash: "hash",
        })
        .unwrap();
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("blight"), "%blight%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn conditions_render_where_clause() {
        let mut c = Conditions::default();
        assert_eq!(c.sql(), "");
        c.push("a = ?", [Value::Integer(1)]);
        c.keyword(&["t", "b"], "x");
        assert_eq!(c.sql(), "WHERE a = ? AND (t LIKE ? ESCAPE '\\' OR b LIKE ? ESCAPE '\\')");
        assert_eq!(c.args.len(), 3);
    }
}
