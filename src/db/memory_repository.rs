use crate::db::models::{
    LongTermMemoryRecord, NewLongTermMemory, NewShortTermMemory, ShortTermMemoryRecord,
};
use crate::errors::Error;
use chrono::Utc;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Repository over the `short_term_memory` and `long_term_memory` tables
pub struct MemoryRepository<'a> {
    pub conn: &'a mut SqliteConnection,
}

impl<'a> MemoryRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        MemoryRepository { conn }
    }

    /// Appends a short-term note; earlier notes with the same key are kept
    ///
    /// # Arguments
    ///
    /// * `the_task_id` - Owning task
    /// * `the_key` - Note key
    /// * `the_value` - Note value
    pub fn insert_note(
        &mut self,
        the_task_id: &str,
        the_key: &str,
        the_value: &str,
    ) -> Result<(), Error> {
        use crate::schema::short_term_memory;
        let now = Utc::now().to_rfc3339();

        diesel::insert_into(short_term_memory::table)
            .values(&NewShortTermMemory {
                task_id: the_task_id,
                key: the_key,
                value: the_value,
                created_at: &now,
            })
            .execute(self.conn)?;
        Ok(())
    }

    /// Returns the value of the most recently written note for `(task, key)`
    pub fn latest_note(
        &mut self,
        the_task_id: &str,
        the_key: &str,
    ) -> Result<Option<String>, Error> {
        use crate::schema::short_term_memory::dsl::*;
        let found = short_term_memory
            .filter(task_id.eq(the_task_id))
            .filter(key.eq(the_key))
            .order_by(id.desc())
            .select(value)
            .first::<String>(self.conn)
            .optional()?;
        Ok(found)
    }

    /// Every note of a task in insertion order
    pub fn list_notes(&mut self, the_task_id: &str) -> Result<Vec<ShortTermMemoryRecord>, Error> {
        use crate::schema::short_term_memory::dsl::*;
        let notes = short_term_memory
            .filter(task_id.eq(the_task_id))
            .order_by(id.asc())
            .load::<ShortTermMemoryRecord>(self.conn)?;
        Ok(notes)
    }

    /// Allocates the next embedding id and inserts the long-term row in one transaction
    ///
    /// The id is one greater than the current maximum, or 1 for an empty table.
    ///
    /// # Arguments
    ///
    /// * `the_content` - Memory text
    /// * `the_metadata` - JSON serialized metadata
    ///
    /// # Returns
    ///
    /// The allocated `embedding_id`
    pub fn insert_memory(&mut self, the_content: &str, the_metadata: &str) -> Result<i64, Error> {
        use crate::schema::long_term_memory;
        let now = Utc::now().to_rfc3339();

        self.conn.immediate_transaction(|conn| {
            let current = long_term_memory::table
                .select(max(long_term_memory::embedding_id))
                .first::<Option<i64>>(conn)?;
            let next_id = current.map_or(1, |last| last + 1);

            diesel::insert_into(long_term_memory::table)
                .values(&NewLongTermMemory {
                    embedding_id: next_id,
                    content: the_content,
                    metadata: the_metadata,
                    created_at: &now,
                })
                .execute(conn)?;
            Ok(next_id)
        })
    }

    /// Loads the long-term rows whose embedding id is in `ids`, in no particular order
    pub fn find_memories(&mut self, ids: &[i64]) -> Result<Vec<LongTermMemoryRecord>, Error> {
        use crate::schema::long_term_memory::dsl::*;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = long_term_memory
            .filter(embedding_id.eq_any(ids))
            .load::<LongTermMemoryRecord>(self.conn)?;
        Ok(found)
    }

    /// All embedding ids known to the relational side, ascending
    pub fn embedding_ids(&mut self) -> Result<Vec<i64>, Error> {
        use crate::schema::long_term_memory::dsl::*;
        let ids = long_term_memory
            .select(embedding_id)
            .order_by(embedding_id.asc())
            .load::<i64>(self.conn)?;
        Ok(ids)
    }
}
