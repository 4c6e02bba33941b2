// src/utils/patch.rs

use chrono::Utc;
use sqlx::{Encode, FromRow, QueryBuilder, Sqlite, SqlitePool, Type, sqlite::SqliteRow};

/// Builds the `UPDATE` statement for a sparse patch.
///
/// Only values that are present *and* differ from what is stored are
/// staged, so a patch that changes nothing never reaches the store.
pub struct Patch<'args> {
    builder: QueryBuilder<'args, Sqlite>,
    staged: Vec<&'static str>,
}

impl<'args> Patch<'args> {
    pub fn new(table: &'static str) -> Self {
        Self {
            builder: QueryBuilder::new(format!("UPDATE {} SET ", table)),
            staged: Vec::new(),
        }
    }

    /// Stages `candidate` when it is present and differs from `current`.
    pub fn set<T>(&mut self, column: &'static str, candidate: Option<T>, current: &T) -> &mut Self
    where
        T: PartialEq + Encode<'args, Sqlite> + Type<Sqlite> + Send + 'args,
    {
        match candidate {
            Some(value) if value != *current => self.assign(column, value),
            _ => self,
        }
    }

    /// Stages `value` unconditionally.
    pub fn assign<T>(&mut self, column: &'static str, value: T) -> &mut Self
    where
        T: Encode<'args, Sqlite> + Type<Sqlite> + Send + 'args,
    {
        if !self.staged.is_empty() {
            self.builder.push(", ");
        }
        self.builder.push(column);
        self.builder.push(" = ");
        self.builder.push_bind(value);
        self.staged.push(column);
        self
    }

    /// Columns staged so far, in order.
    pub fn staged(&self) -> &[&'static str] {
        &self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Runs the update against the row whose `id` matches and returns it.
    /// Returns `Ok(None)` without touching the store when nothing was staged.
    pub async fn apply<T>(mut self, id: String, pool: &SqlitePool) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        if self.staged.is_empty() {
            return Ok(None);
        }

        tracing::debug!(fields = ?self.staged, "applying patch");

        self.builder.push(", updated_at = ");
        self.builder.push_bind(Utc::now());
        self.builder.push(" WHERE id = ");
        self.builder.push_bind(id);
        self.builder.push(" RETURNING *");

        let row = self.builder.build_query_as::<T>().fetch_one(pool).await?;
        Ok(Some(row))
    }

    /// Same as [`Patch::apply`] for tables without an `updated_at` column.
    pub async fn apply_untimed<T>(mut self, id: String, pool: &SqlitePool) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        if self.staged.is_empty() {
            return Ok(None);
        }

        self.builder.push(" WHERE id = ");
        self.builder.push_bind(id);
        self.builder.push(" RETURNING *");

        let row = self.builder.build_query_as::<T>().fetch_one(pool).await?;
        Ok(Some(row))
    }

    #[cfg(test)]
    fn sql(&self) -> &str {
        self.builder.sql()
    }
}
