use marketplace::config::{NotificationConfig, PaymentConfig};
use marketplace::memory::{InMemoryNotifications, InMemoryStore, SandboxGateway};
use marketplace::workflows::bookings::BookingService;
use marketplace::workflows::documents::DocumentVerificationService;
use marketplace::workflows::inspections::InspectionService;
use marketplace::workflows::maintenance::MaintenanceJobs;
use marketplace::workflows::notifications::{DeliveryError, EmailMessage, Mailer, Notifier};
use marketplace::workflows::payments::{PaymentEffectDispatcher, PaymentService, TransactionType};
use marketplace::workflows::subscriptions::{PlanCatalog, SubscriptionService};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes outbound mail to the log instead of a transport.
#[derive(Debug, Default, Clone)]
pub(crate) struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        info!(to = %message.to, subject = %message.subject, "email queued");
        Ok(())
    }
}

/// Every workflow service, wired onto one in-memory store.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) gateway: Arc<SandboxGateway>,
    pub(crate) notifications: Arc<InMemoryNotifications>,
    pub(crate) inspections: Arc<InspectionService>,
    pub(crate) bookings: Arc<BookingService>,
    pub(crate) documents: Arc<DocumentVerificationService>,
    pub(crate) subscriptions: Arc<SubscriptionService>,
    pub(crate) dispatcher: Arc<PaymentEffectDispatcher>,
}

impl Services {
    pub(crate) fn build(
        payments: PaymentConfig,
        notifications_config: NotificationConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(SandboxGateway::new());
        let notifications = Arc::new(InMemoryNotifications::new());
        let notifier = Notifier::new(mailer, notifications.clone(), notifications_config);
        let payments = Arc::new(PaymentService::new(gateway.clone(), store.clone(), payments));

        let inspections = Arc::new(InspectionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            payments.clone(),
            notifier.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            payments.clone(),
            notifier.clone(),
        ));
        let documents = Arc::new(DocumentVerificationService::new(
            store.clone(),
            store.clone(),
            payments.clone(),
            notifier.clone(),
        ));
        let subscriptions = Arc::new(SubscriptionService::new(
            store.clone(),
            payments.clone(),
            notifier,
            PlanCatalog::standard(),
        ));
        let dispatcher = Arc::new(
            PaymentEffectDispatcher::new(payments)
                .register(TransactionType::Inspection, inspections.clone())
                .register(TransactionType::ShortletBooking, bookings.clone())
                .register(TransactionType::DocumentVerification, documents.clone())
                .register(TransactionType::Subscription, subscriptions.clone()),
        );

        Self {
            store,
            gateway,
            notifications,
            inspections,
            bookings,
            documents,
            subscriptions,
            dispatcher,
        }
    }

    pub(crate) fn maintenance(&self) -> MaintenanceJobs {
        MaintenanceJobs::new(self.subscriptions.clone(), self.dispatcher.clone())
    }
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    match Decimal::from_str(raw.trim()) {
        Ok(amount) if !amount.is_sign_negative() => Ok(amount),
        Ok(_) => Err(format!("'{raw}' must not be negative")),
        Err(err) => Err(format!("failed to parse '{raw}' as an amount ({err})")),
    }
}
