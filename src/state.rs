use std::sync::Arc;

use crate::collaborators::{Clock, Mailer, Notifier, TokenGenerator};
use crate::config::Config;
use crate::db::Database;
use crate::services::{CheckInService, PointService, ProvisioningService, TransactionService};

/// Everything the HTTP layer needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub points: Arc<PointService>,
    pub check_in: Arc<CheckInService>,
    pub provisioning: Arc<ProvisioningService>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: &Config,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        mailer: Arc<dyn Mailer>,
        tokens: Arc<dyn TokenGenerator>,
    ) -> Self {
        let transactions = Arc::new(TransactionService::new(
            db.clone(),
            clock.clone(),
            notifier,
            mailer,
            tokens.clone(),
            config.payment_deadline(),
            config.confirmation_grace(),
        ));
        let points = Arc::new(PointService::new(
            db.clone(),
            clock.clone(),
            config.point_expiry_warning(),
        ));
        let check_in = Arc::new(CheckInService::new(db.clone(), clock.clone()));
        let provisioning = Arc::new(ProvisioningService::new(db, clock, tokens));

        Self {
            transactions,
            points,
            check_in,
            provisioning,
        }
    }
}
