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

//! Assembly of the service and of its HTTP server.

use crate::db;
use crate::driver::RecordsDriver;
use crate::model::Registry;
use crate::rest;
use axum::Router;
use log::info;
use registrar_authn::driver::AuthnDriver;
use registrar_core::clocks::{Clock, SystemClock};
use registrar_core::db::Db;
use registrar_core::env::get_optional_var;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Default port to listen on when none is configured.
const DEFAULT_PORT: u16 = 3000;

/// Configuration of the HTTP server.
#[derive(Debug, PartialEq)]
pub struct ServerOptions {
    /// Address of the interface to listen on.
    pub bind_addr: IpAddr,

    /// Port to listen on.
    pub port: u16,
}

impl ServerOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with
    /// `prefix`.
    ///
    /// This will use variables such as `<prefix>_BIND_ADDR` and `<prefix>_PORT`, both of which
    /// are optional.
    pub fn from_env(prefix: &str) -> Result<ServerOptions, String> {
        let bind_addr = match get_optional_var::<String>(prefix, "BIND_ADDR")? {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|e| format!("Invalid address in {}_BIND_ADDR: {}", prefix, e))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let port = get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(DEFAULT_PORT);
        Ok(ServerOptions { bind_addr, port })
    }

    /// Returns the socket address to listen on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Creates the database tables of all the components of the service if they don't exist yet.
pub async fn init_schemas(db: &(dyn Db + Send + Sync)) -> Result<(), Box<dyn Error>> {
    let mut ex = db.ex().await?;
    registrar_authn::db::init_schema(&mut ex).await?;
    db::init_schema(&mut ex).await?;
    Ok(())
}

/// Creates the router for the whole service, with all APIs under `/api/v1`.
pub fn app(
    db: Arc<dyn Db + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<Router, String> {
    let registry = Registry::school()?;
    let authn = AuthnDriver::new(db.clone(), clock.clone());
    let records = RecordsDriver::new(db, clock, Arc::new(registry));
    let api = rest::app(records).merge(registrar_authn::rest::app(authn));
    Ok(Router::new().nest("/api/v1", api))
}

/// Instantiates all resources to serve the application as configured by `opts`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    opts: ServerOptions,
    db: Arc<dyn Db + Send + Sync>,
) -> Result<(), Box<dyn Error>> {
    init_schemas(db.as_ref()).await?;
    let app = app(db, Arc::new(SystemClock::default()))?;

    let listener = tokio::net::TcpListener::bind(opts.socket_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
