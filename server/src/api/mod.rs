//! HTTP API for the collector server.
//!
//! Routes: `GET /` (HTML metric list), `POST /update`, `POST /updates`,
//! `POST /value`, `GET /ping`. Success bodies are JSON; error bodies are
//! stable plain-text strings that agents can match on.

use actix_web::dev::Server;
use actix_web::{middleware, web, App, HttpServer};
use pulse_core::MetricHasher;
use std::sync::Arc;
use tracing::info;

use crate::service::MetricsService;
use crate::storage::Pingable;

pub mod handlers;
pub mod render;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<MetricsService>,
    pub hasher: MetricHasher,
    pub pingables: Vec<Arc<dyn Pingable>>,
}

pub struct ApiServer {
    address: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(
        address: impl Into<String>,
        service: Arc<MetricsService>,
        hasher: MetricHasher,
        pingables: Vec<Arc<dyn Pingable>>,
    ) -> Self {
        Self {
            address: address.into(),
            state: ApiState {
                service,
                hasher,
                pingables,
            },
        }
    }

    pub fn start(&self) -> std::io::Result<Server> {
        let state = web::Data::new(self.state.clone());

        info!("Starting API server on {}", self.address);
        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(middleware::Logger::default())
                .configure(handlers::configure)
        })
        .bind(&self.address)?
        .run();

        Ok(server)
    }
}
