// SPDX-License-Identifier: MIT OR Apache-2.0

use sqlx::{FromRow, QueryBuilder, Sqlite, query, query_as};
use treehole_core::{Tag, current_timestamp};

use crate::sqlite::{SqliteError, SqliteStore, to_sql_timestamp};
use crate::tags::TagStore;

impl<'a> TagStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn tags_by_names(&self, names: &[String]) -> Result<Vec<Tag>, Self::Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .tx(async |tx| {
                let mut builder = QueryBuilder::<Sqlite>::new(
                    "
                    SELECT
                        id,
                        name,
                        temperature
                    FROM
                        tags_v1
                    WHERE
                        name IN (",
                );
                let mut separated = builder.separated(", ");
                for name in names {
                    separated.push_bind(name.as_str());
                }
                separated.push_unseparated(")");

                builder
                    .build_query_as::<TagRow>()
                    .fetch_all(&mut **tx)
                    .await
                    .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn insert_tags_if_absent(&self, names: &[String]) -> Result<u64, Self::Error> {
        let now = to_sql_timestamp(current_timestamp());

        self.tx(async |tx| {
            let mut inserted = 0;

            for name in names {
                // Ignore insertion when name already exists (UNIQUE constraint).
                let result = query(
                    "
                    INSERT OR IGNORE
                    INTO
                        tags_v1 (
                            name,
                            temperature,
                            created_at,
                            updated_at
                        )
                    VALUES
                        (?, 0, ?, ?)
                    ",
                )
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(&mut **tx)
                .await?;

                inserted += result.rows_affected();
            }

            Ok(inserted)
        })
        .await
    }

    async fn tags_by_temperature(&self) -> Result<Vec<Tag>, Self::Error> {
        let rows = self
            .execute(async |pool| {
                query_as::<_, TagRow>(
                    "
                    SELECT
                        id,
                        name,
                        temperature
                    FROM
                        tags_v1
                    ORDER BY
                        temperature DESC,
                        id ASC
                    ",
                )
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }
}

/// Single tag row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct TagRow {
    id: i64,
    name: String,
    temperature: i64,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            temperature: row.temperature,
        }
    }
}
