// Registrar
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Database abstraction to manipulate user accounts.

use crate::model::{HashedPassword, User};
#[cfg(feature = "postgres")]
use registrar_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use registrar_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use registrar_core::db::{DbError, DbResult, Executor};
use registrar_core::model::{EmailAddress, Username};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
#[cfg(feature = "postgres")]
use time::OffsetDateTime;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let username: String = row.try_get("username").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(postgres::map_sqlx_error)?;
        let date_joined: OffsetDateTime =
            row.try_get("date_joined").map_err(postgres::map_sqlx_error)?;

        Ok(User::new(
            Username::new(username)?,
            EmailAddress::new(email)?,
            HashedPassword::new(password),
            date_joined,
        ))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let username: String = row.try_get("username").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(sqlite::map_sqlx_error)?;
        let date_joined_secs: i64 =
            row.try_get("date_joined_secs").map_err(sqlite::map_sqlx_error)?;
        let date_joined_nsecs: i64 =
            row.try_get("date_joined_nsecs").map_err(sqlite::map_sqlx_error)?;

        Ok(User::new(
            Username::new(username)?,
            EmailAddress::new(email)?,
            HashedPassword::new(password),
            build_timestamp(date_joined_secs, date_joined_nsecs)?,
        ))
    }
}

/// Persists a new `user`.  Fails with `AlreadyExists` if either the username or the email
/// address are already taken.
pub async fn create_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO users (username, email, password, date_joined)
                VALUES ($1, $2, $3, $4)";
            let done = sqlx::query(query_str)
                .bind(user.username().as_str())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.date_joined())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (date_joined_secs, date_joined_nsecs) = unpack_timestamp(user.date_joined())?;

            let query_str = "
                INSERT INTO users (username, email, password, date_joined_secs, date_joined_nsecs)
                VALUES (?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(user.username().as_str())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(date_joined_secs)
                .bind(date_joined_nsecs)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected != 1 {
        return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Gets the user whose `column` matches `value`.
async fn get_user_by(ex: &mut Executor, column: &'static str, value: &str) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!("SELECT * FROM users WHERE {} = $1", column);
            let raw_user = sqlx::query(&query_str)
                .bind(value)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!("SELECT * FROM users WHERE {} = ?", column);
            let raw_user = sqlx::query(&query_str)
                .bind(value)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets information about an existing user named `username`.
pub async fn get_user_by_username(ex: &mut Executor, username: &Username) -> DbResult<User> {
    get_user_by(ex, "username", username.as_str()).await
}

/// Gets information about the user registered with `email`.
pub async fn get_user_by_email(ex: &mut Executor, email: &EmailAddress) -> DbResult<User> {
    get_user_by(ex, "email", email.as_str()).await
}
