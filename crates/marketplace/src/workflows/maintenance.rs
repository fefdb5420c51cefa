//! Daily sweeps: subscription renewal and expiry, and stale checkout cleanup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::payments::PaymentEffectDispatcher;
use super::subscriptions::SubscriptionService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub renewed: usize,
    pub renewal_failures: usize,
    pub expired: usize,
    pub stale_failed: usize,
    /// Jobs that returned an error; the remaining jobs still ran.
    pub job_errors: usize,
}

pub struct MaintenanceJobs {
    subscriptions: Arc<SubscriptionService>,
    dispatcher: Arc<PaymentEffectDispatcher>,
}

impl MaintenanceJobs {
    pub fn new(
        subscriptions: Arc<SubscriptionService>,
        dispatcher: Arc<PaymentEffectDispatcher>,
    ) -> Self {
        Self {
            subscriptions,
            dispatcher,
        }
    }

    pub fn run_daily(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match self.subscriptions.auto_renew_due(now) {
            Ok(renewals) => {
                report.renewed = renewals.renewed;
                report.renewal_failures = renewals.failed;
            }
            Err(err) => {
                warn!(job = "auto_renew", error = %err, "maintenance job failed");
                report.job_errors += 1;
            }
        }

        match self.subscriptions.expire_due(now) {
            Ok(expired) => report.expired = expired,
            Err(err) => {
                warn!(job = "expire_subscriptions", error = %err, "maintenance job failed");
                report.job_errors += 1;
            }
        }

        match self.dispatcher.payments().fail_stale(now) {
            Ok(stale) => {
                for transaction in &stale {
                    if let Err(err) = self.dispatcher.dispatch(transaction) {
                        warn!(
                            reference = %transaction.reference,
                            error = %err,
                            "failure effects for stale transaction did not run"
                        );
                    }
                }
                report.stale_failed = stale.len();
            }
            Err(err) => {
                warn!(job = "fail_stale_transactions", error = %err, "maintenance job failed");
                report.job_errors += 1;
            }
        }

        info!(
            renewed = report.renewed,
            renewal_failures = report.renewal_failures,
            expired = report.expired,
            stale_failed = report.stale_failed,
            job_errors = report.job_errors,
            "daily maintenance finished"
        );
        report
    }
}
