// SPDX-License-Identifier: MIT OR Apache-2.0

use sqlx::{FromRow, query, query_as};
use treehole_core::{BanDivision, User, UserId};

use crate::sqlite::{DecodeError, SqliteError, SqliteStore};
use crate::users::UserStore;

impl<'a> UserStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn user_for_update(&self, id: UserId) -> Result<Option<User>, Self::Error> {
        let row = self
            .tx(async |tx| {
                query_as::<_, UserRow>(
                    "
                    SELECT
                        id,
                        config,
                        ban_division,
                        offence_count
                    FROM
                        users_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<bool, Self::Error> {
        let config = serde_json::to_string(&user.config)
            .map_err(|err| SqliteError::Encode("config".to_string(), err))?;
        let ban_division = encode_ban_division(&user.ban_division)?;

        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT OR IGNORE
                    INTO
                        users_v1 (
                            id,
                            config,
                            ban_division,
                            offence_count
                        )
                    VALUES
                        (?, ?, ?, ?)
                    ",
                )
                .bind(user.id)
                .bind(config)
                .bind(ban_division)
                .bind(user.offence_count)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_ban_division(
        &self,
        id: UserId,
        ban_division: &BanDivision,
    ) -> Result<bool, Self::Error> {
        let ban_division = encode_ban_division(ban_division)?;

        let result = self
            .tx(async |tx| {
                query(
                    "
                    UPDATE
                        users_v1
                    SET
                        ban_division = ?
                    WHERE
                        id = ?
                    ",
                )
                .bind(ban_division)
                .bind(id)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, Self::Error> {
        let row = self
            .execute(async |pool| {
                query_as::<_, UserRow>(
                    "
                    SELECT
                        id,
                        config,
                        ban_division,
                        offence_count
                    FROM
                        users_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        row.map(User::try_from).transpose()
    }
}

fn encode_ban_division(ban_division: &BanDivision) -> Result<String, SqliteError> {
    serde_json::to_string(ban_division)
        .map_err(|err| SqliteError::Encode("ban_division".to_string(), err))
}

/// Single user row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    config: String,
    ban_division: String,
    offence_count: i64,
}

impl TryFrom<UserRow> for User {
    type Error = SqliteError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            config: serde_json::from_str(&row.config)
                .map_err(|err| SqliteError::Decode("config".into(), DecodeError::Json(err)))?,
            ban_division: serde_json::from_str(&row.ban_division).map_err(|err| {
                SqliteError::Decode("ban_division".into(), DecodeError::Json(err))
            })?,
            offence_count: row.offence_count,
        })
    }
}
