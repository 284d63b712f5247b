use anyhow::Result;
use rusqlite::Connection;

use super::OptionalExt;
use crate::models::UserRow;
use crate::{Database, now};

impl Database {
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, now()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::queries::testutil;

    #[test]
    fn users_are_found_by_name_and_id() {
        let db = testutil::db();
        let id = testutil::user(&db, "alice");

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().username, "alice");
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let db = testutil::db();
        testutil::user(&db, "alice");
        assert!(db.create_user("other-id", "alice", "hash").is_err());
    }
}
