use chrono::{DateTime, Utc};
use expalink::concierge::{ConciergeService, HttpAssistantGateway, RetryingAssistant};
use expalink::config::{AppConfig, AssistantConfig};
use expalink::error::AppError;
use expalink::import::DirectoryImporter;
use expalink::marketplace::{
    CheckoutError, CheckoutGateway, CheckoutItem, CheckoutRequest, CheckoutSession,
    InMemoryStore, MarketplaceService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type Concierge = ConciergeService<RetryingAssistant<HttpAssistantGateway>>;
pub(crate) type Marketplace = MarketplaceService<InMemoryStore, HostedCheckout>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared handles for the concierge routes. `concierge` is absent when no endpoint is configured.
#[derive(Clone)]
pub(crate) struct ConciergeState {
    pub(crate) concierge: Option<Arc<Concierge>>,
    pub(crate) store: Arc<InMemoryStore>,
}

/// Checkout collaborator that hands out numbered hosted-page URLs.
///
/// Payment confirmation arrives separately through the admin callback routes.
#[derive(Debug, Default, Clone)]
pub(crate) struct HostedCheckout {
    base_url: String,
    sequence: Arc<AtomicU64>,
}

impl HostedCheckout {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sequence: Arc::default(),
        }
    }
}

impl CheckoutGateway for HostedCheckout {
    fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, CheckoutError> {
        let number = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let item = match request.item {
            CheckoutItem::Plan { plan, .. } => format!("plan-{}", plan.label()),
            CheckoutItem::Credits { pack } => format!("credits-{}", pack.label()),
        };
        let url = format!("{}/checkout/{}/{}", self.base_url, item, number);
        info!(
            reference = %request.reference,
            %url,
            issued = number,
            "checkout session created"
        );
        Ok(CheckoutSession { url })
    }
}

/// Fresh store, optionally seeded from a directory export.
pub(crate) fn load_store(
    seed_csv: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<Arc<InMemoryStore>, AppError> {
    let store = Arc::new(InMemoryStore::new());
    if let Some(path) = seed_csv {
        DirectoryImporter::seed(store.as_ref(), path, now)?;
    }
    Ok(store)
}

pub(crate) fn build_marketplace(config: &AppConfig, store: Arc<InMemoryStore>) -> Arc<Marketplace> {
    let checkout = Arc::new(HostedCheckout::new(config.public_url.clone()));
    Arc::new(
        MarketplaceService::new(store, checkout, config.marketplace.clone())
            .with_return_url(config.public_url.clone()),
    )
}

/// Concierge backed by the configured edge endpoint, or `None` when it is not configured.
pub(crate) fn build_concierge(config: &AssistantConfig) -> Option<Arc<Concierge>> {
    let endpoint = config.endpoint.as_deref()?;
    match HttpAssistantGateway::new(endpoint, config.api_key.clone()) {
        Ok(gateway) => {
            let gateway = RetryingAssistant::from_config(gateway, config);
            info!(endpoint, "concierge enabled");
            Some(Arc::new(ConciergeService::new(Arc::new(gateway))))
        }
        Err(error) => {
            warn!(%error, "concierge disabled, gateway could not be built");
            None
        }
    }
}
