/* Copyright (C) 2024  AlphaKeks <alphakeks@dawn.sh>
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this repository.  If not, see <https://www.gnu.org/licenses/>.
 */

#[macro_use]
extern crate derive_more;

#[allow(unused_imports)]
#[macro_use(trace, debug, info, info_span, warn, error)]
extern crate tracing;

#[macro_use(select)]
extern crate tokio;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing, Router, ServiceExt};
use futures_util::FutureExt as _;
use srl::Context;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tower::ServiceBuilder;
use tower_http::ServiceBuilderExt;

pub mod config;
pub use config::Config;

pub mod runtime;
pub mod openapi;

pub mod leaderboards;
pub mod runs;

mod extract;
mod middleware;
mod problem_details;
mod response;

#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display("failed to initialize runtime: {_0}")]
    #[from(ignore)]
    InitializeRuntime(io::Error),

    #[display("{_0}")]
    InitializeContext(srl::context::InitializeContextError),

    #[display("failed to run server: {_0}")]
    #[from(ignore)]
    RunServer(io::Error),
}

/// The HTTP routes served by the API.
pub fn router() -> Router<Context> {
    Router::new()
        .route("/", routing::get("speedrun leaderboards, now with points"))
        .nest("/docs", openapi::router())
        .nest("/leaderboards", leaderboards::router())
        .nest("/runs", runs::router())
}

/// Run the API.
///
/// This function will initialize its own [`tokio`] runtime and **block** until the server shuts
/// down.
pub fn run(config: Config) -> Result<(), Error> {
    runtime::panic_hook::install();
    runtime::build(&config.runtime)
        .map_err(Error::InitializeRuntime)?
        .block_on(async {
            let cx = Context::new(config.srl).await?;

            let api_service = ServiceBuilder::new()
                .map_response_body(axum::body::Body::new)
                .set_x_request_id(middleware::request_id::make_request_id())
                .propagate_x_request_id()
                .layer(middleware::trace::layer())
                .layer(middleware::catch_panic::layer())
                .service(router().with_state(cx.clone()).into_service())
                .into_make_service_with_connect_info::<SocketAddr>();

            let socket = tokio::net::TcpListener::bind(config.server.socket_addr())
                .await
                .map_err(Error::RunServer)?;

            let addr = socket.local_addr().map_err(Error::RunServer)?;

            info!("Listening on {addr}");

            let (serve_result_tx, mut serve_result_rx) = oneshot::channel();
            let (shutdown_tx, shutdown_rx) = oneshot::channel();

            tokio::spawn(async move {
                let serve_result = axum::serve(socket, api_service)
                    .with_graceful_shutdown(shutdown_rx.map(drop))
                    .await;

                serve_result_tx.send(serve_result)
            });

            select! {
                biased;

                Ok(result) = &mut serve_result_rx => match result {
                    Ok(()) => {
                        error!("server shut down prematurely");
                        return Ok(());
                    },
                    Err(error) => {
                        error!(%error, "failed to run server");
                        return Err(Error::RunServer(error));
                    },
                },

                () = runtime::signal::shutdown() => {},
            }

            let _ = shutdown_tx.send(());

            match timeout(Duration::from_secs(15), async {
                tokio::join!(serve_result_rx, cx.cleanup())
            })
            .await
            {
                Ok((Ok(Ok(())), ())) => Ok(()),
                Ok((Ok(Err(error)), ())) => {
                    error!(%error, "failed to run server");
                    Err(Error::RunServer(error))
                },
                Ok((Err(_), ())) => {
                    warn!("server task exited without reporting a result");
                    Ok(())
                },
                Err(_) => {
                    warn!("server did not shut down within timeout");
                    Ok(())
                },
            }
        })
}
