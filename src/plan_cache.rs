use rusqlite::{params, Connection, OptionalExtension, Result};

const PLAN_KEY: &str = "workout_plan";

/// Single-slot store for the raw text of this week's plan.
pub struct PlanCache {
    conn: Connection,
}

impl PlanCache {
    pub fn open(database_url: &str) -> Result<Self> {
        let conn = Connection::open(database_url.replace("sqlite://", ""))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                week TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(PlanCache { conn })
    }

    /// The stored plan, only if it was stored for `week` and is non-empty.
    pub fn get(&self, week: &str) -> Result<Option<String>> {
        let stored: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT week, value FROM kv_store WHERE key = ?1",
                params![PLAN_KEY],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(stored
            .filter(|(stored_week, plan)| stored_week == week && !plan.is_empty())
            .map(|(_, plan)| plan))
    }

    pub fn put(&self, week: &str, plan: &str) -> Result<()> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.conn.execute(
            "INSERT INTO kv_store (key, week, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
             week = excluded.week,
             value = excluded.value,
             updated_at = excluded.updated_at",
            params![PLAN_KEY, week, plan, now],
        )?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![PLAN_KEY])?;
        Ok(())
    }
}
