use std::sync::Arc;

use portal_service::PortalService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PortalService>,
}
impl AppState {
	pub fn new(config: portal_config::Config) -> Self {
		Self::with_service(PortalService::new(config))
	}

	pub fn with_service(service: PortalService) -> Self {
		Self { service: Arc::new(service) }
	}
}
