use anyhow::Result;
use rusqlite::Connection;

use leafcare_types::models::{HasVoted, TargetType, VoteAction, VoteOutcome, VoteType};

use super::OptionalExt;
use crate::models::now_timestamp;
use crate::{Database, DbError};

impl Database {
    /// Applies a vote by `author_id`:
    /// no previous vote inserts one, the same vote again removes it, and the
    /// opposite vote switches it. Counters on the target move in the same
    /// transaction.
    pub fn cast_vote(
        &self,
        id: &str,
        author_id: &str,
        target_id: &str,
        target_type: TargetType,
        vote_type: VoteType,
    ) -> Result<VoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            // Table name comes from the enum, never from input.
            tx.query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", target_type.table()),
                [target_id],
                |_| Ok(()),
            )
            .optional()?
            .ok_or(DbError::NotFound(match target_type {
                TargetType::Question => "Question",
                TargetType::Answer => "Answer",
            }))?;

            let existing = tx
                .query_row(
                    "SELECT id, vote_type FROM votes
                     WHERE author_id = ?1 AND target_id = ?2 AND target_type = ?3",
                    rusqlite::params![author_id, target_id, target_type.as_str()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?
                .map(|(vote_id, previous)| Ok::<_, anyhow::Error>((vote_id, previous.parse::<VoteType>()?)))
                .transpose()?;

            let action = match existing {
                None => {
                    tx.execute(
                        "INSERT INTO votes (id, author_id, target_id, target_type, vote_type, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        rusqlite::params![
                            id,
                            author_id,
                            target_id,
                            target_type.as_str(),
                            vote_type.as_str(),
                            now_timestamp(),
                        ],
                    )?;
                    adjust_counter(&tx, target_type, target_id, vote_type, 1)?;
                    VoteAction::Added
                }
                Some((vote_id, previous)) if previous == vote_type => {
                    tx.execute("DELETE FROM votes WHERE id = ?1", [&vote_id])?;
                    adjust_counter(&tx, target_type, target_id, vote_type, -1)?;
                    VoteAction::Removed
                }
                Some((vote_id, _)) => {
                    tx.execute(
                        "UPDATE votes SET vote_type = ?1 WHERE id = ?2",
                        rusqlite::params![vote_type.as_str(), vote_id],
                    )?;
                    adjust_counter(&tx, target_type, target_id, vote_type.opposite(), -1)?;
                    adjust_counter(&tx, target_type, target_id, vote_type, 1)?;
                    VoteAction::Switched
                }
            };

            let (upvotes, downvotes): (i64, i64) = tx.query_row(
                &format!("SELECT upvotes, downvotes FROM {} WHERE id = ?1", target_type.table()),
                [target_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            tx.commit()?;
            Ok(VoteOutcome { action, upvotes, downvotes })
        })
    }

    pub fn has_voted(&self, author_id: &str, target_id: &str, target_type: TargetType) -> Result<HasVoted> {
        self.with_conn(|conn| {
            let vote = conn
                .query_row::<String, _, _>(
                    "SELECT vote_type FROM votes
                     WHERE author_id = ?1 AND target_id = ?2 AND target_type = ?3",
                    rusqlite::params![author_id, target_id, target_type.as_str()],
                    |row| row.get(0),
                )
                .optional()?
                .map(|raw| raw.parse::<VoteType>())
                .transpose()?;

            Ok(HasVoted {
                has_upvoted: vote == Some(VoteType::Upvote),
                has_downvoted: vote == Some(VoteType::Downvote),
            })
        })
    }
}

fn adjust_counter(
    conn: &Connection,
    target_type: TargetType,
    target_id: &str,
    vote_type: VoteType,
    change: i64,
) -> Result<()> {
    let column = vote_type.counter_column();
    conn.execute(
        &format!(
            "UPDATE {} SET {col} = MAX({col} + ?1, 0) WHERE id = ?2",
            target_type.table(),
            col = column
        ),
        rusqlite::params![change, target_id],
    )?;
    Ok(())
}
