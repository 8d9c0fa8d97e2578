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

//! Utilities to help testing services that integrate with the `authn` features.

use crate::db;
use crate::driver::AuthnDriver;
use crate::model::{HashedPassword, User};
use registrar_core::clocks::Clock;
use registrar_core::clocks::testutils::SettableClock;
use registrar_core::db::{Db, DbError};
use registrar_core::model::{EmailAddress, Username};
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::datetime;

/// State of a running test.
pub struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used by the driver, which tests can manipulate.
    clock: Arc<SettableClock>,

    /// The driver to handle registrations.
    driver: AuthnDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    pub async fn setup() -> Self {
        let db = Arc::from(registrar_core::db::sqlite::testutils::setup().await);
        let clock = Arc::from(SettableClock::new(datetime!(2024-09-01 08:00:00 UTC)));
        Self::setup_with(db, clock).await
    }

    /// Initializes the test context using the given already-initialized objects.
    pub async fn setup_with(db: Arc<dyn Db + Send + Sync>, clock: Arc<SettableClock>) -> Self {
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let driver = AuthnDriver::new(db.clone(), clock.clone());
        TestContext { db, clock, driver }
    }

    /// Gets a copy of the driver in this test context.
    pub fn driver(&self) -> AuthnDriver {
        self.driver.clone()
    }

    /// Gets the database used by this test context.
    pub fn db(&self) -> Arc<dyn Db + Send + Sync> {
        self.db.clone()
    }

    /// Returns the current time as seen by the driver.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Creates a user by directly modifying the backing database.
    pub async fn create_user(&self, username: &'static str, email: &'static str) -> User {
        let user = User::new(
            Username::from(username),
            EmailAddress::from(email),
            HashedPassword::new("not-a-real-hash"),
            self.now(),
        );
        db::create_user(&mut self.db.ex().await.unwrap(), &user).await.unwrap();
        user
    }

    /// Checks if the user with `username` exists by directly querying the backing database.
    pub async fn user_exists(&self, username: &Username) -> bool {
        match db::get_user_by_username(&mut self.db.ex().await.unwrap(), username).await {
            Ok(_) => true,
            Err(DbError::NotFound) => false,
            Err(e) => panic!("{:?}", e),
        }
    }

    /// Releases the database connections held by the context.
    pub async fn close(self) {
        self.db.close().await;
    }
}
