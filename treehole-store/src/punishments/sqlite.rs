// SPDX-License-Identifier: MIT OR Apache-2.0

use sqlx::{FromRow, query, query_as};
use treehole_core::{DivisionId, Punishment, UserId};

use crate::punishments::PunishmentStore;
use crate::sqlite::{SqliteError, SqliteStore, from_sql_timestamp, to_sql_timestamp};

impl<'a> PunishmentStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_punishment(&self, punishment: &Punishment) -> Result<i64, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT
                    INTO
                        punishments_v1 (
                            division_id,
                            user_id,
                            made_by,
                            start_time,
                            end_time
                        )
                    VALUES
                        (?, ?, ?, ?, ?)
                    ",
                )
                .bind(punishment.division_id)
                .bind(punishment.user_id)
                .bind(punishment.made_by)
                .bind(to_sql_timestamp(punishment.start_time))
                .bind(to_sql_timestamp(punishment.end_time))
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn latest_punishment(
        &self,
        user_id: UserId,
        division_id: DivisionId,
    ) -> Result<Option<Punishment>, Self::Error> {
        let row = self
            .execute(async |pool| {
                query_as::<_, PunishmentRow>(
                    "
                    SELECT
                        id,
                        division_id,
                        user_id,
                        made_by,
                        start_time,
                        end_time
                    FROM
                        punishments_v1
                    WHERE
                        user_id = ?
                        AND division_id = ?
                    ORDER BY
                        start_time DESC,
                        id DESC
                    LIMIT
                        1
                    ",
                )
                .bind(user_id)
                .bind(division_id)
                .fetch_optional(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        row.map(Punishment::try_from).transpose()
    }
}

/// Single punishment row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct PunishmentRow {
    id: i64,
    division_id: i64,
    user_id: i64,
    made_by: i64,
    start_time: i64,
    end_time: i64,
}

impl TryFrom<PunishmentRow> for Punishment {
    type Error = SqliteError;

    fn try_from(row: PunishmentRow) -> Result<Self, Self::Error> {
        Ok(Punishment {
            id: Some(row.id),
            division_id: row.division_id,
            user_id: row.user_id,
            made_by: row.made_by,
            start_time: from_sql_timestamp("start_time", row.start_time)?,
            end_time: from_sql_timestamp("end_time", row.end_time)?,
        })
    }
}
