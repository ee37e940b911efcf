use anyhow::Result;
use rusqlite::Connection;

use super::OptionalExt;
use crate::Database;
use crate::models::{NewUser, UserRow, now_timestamp};

const USER_COLUMNS: &str = "id, name, username, email, image, password, created_at";

impl Database {
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, username, email, image, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.username,
                    user.email,
                    user.image,
                    user.password_hash,
                    now_timestamp(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

/// `column` is always one of the fixed names above, never user input.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                username: row.get(2)?,
                email: row.get(3)?,
                image: row.get(4)?,
                password: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::super::test_support;

    #[test]
    fn finds_user_by_each_key() {
        let db = test_support::db();
        let id = test_support::user(&db, "fern");

        let by_name = db.get_user_by_username("fern").unwrap().unwrap();
        let by_email = db.get_user_by_email("fern@example.com").unwrap().unwrap();
        let by_id = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_email.id, id);
        assert_eq!(by_id.username, "fern");
        assert!(db.get_user_by_username("moss").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = test_support::db();
        test_support::user(&db, "fern");
        let dup = db.create_user(&crate::models::NewUser {
            id: "other",
            name: "Fern Two",
            username: "fern",
            email: "other@example.com",
            image: None,
            password_hash: "hash",
        });
        assert!(dup.is_err());
    }
}
