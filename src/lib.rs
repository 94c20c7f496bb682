pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod notifications;
pub mod payment;
pub mod utils;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::notifications::SystemEmailService;
use crate::payment::PaymentClient;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub mailer: SystemEmailService,
    pub payment: PaymentClient,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let mailer = SystemEmailService::new(
            config.email.clone(),
            config.server.public_url.clone(),
        );
        let payment = PaymentClient::new(config.payment.clone());
        Self {
            config,
            db,
            mailer,
            payment,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
