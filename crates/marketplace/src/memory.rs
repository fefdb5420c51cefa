//! Process-local adapters for every storage, delivery and provider seam.
//!
//! The API binary runs on these until real MongoDB, SMTP and Paystack
//! adapters are wired in; the test suites use them to observe side effects.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::workflows::activity::{
    ActivityId, ActivityLog, ActivityLogEntry, ActivitySubject, NewActivity,
};
use crate::workflows::bookings::{Booking, BookingId, BookingRepository};
use crate::workflows::directory::{
    Buyer, BuyerContact, DealSite, DirectoryRepository, Property, PropertyId, UserId,
};
use crate::workflows::documents::{
    DocumentRepository, DocumentVerification, DocumentVerificationId,
};
use crate::workflows::inspections::{InspectionBooking, InspectionId, InspectionRepository};
use crate::workflows::notifications::{
    DeliveryError, EmailMessage, InAppNotification, Mailer, NotificationSink,
};
use crate::workflows::payments::gateway::to_minor_units;
use crate::workflows::payments::{
    AutoCharge, Checkout, GatewayError, GatewayStatus, NewTransaction, PaymentGateway,
    PaymentInit, SplitTerms, TransactionId, TransactionRepository, TransactionStatus,
    Verification,
};
use crate::workflows::store::{check_version, RepositoryError, Versioned};
use crate::workflows::subscriptions::{Subscription, SubscriptionId, SubscriptionRepository};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

fn insert_new<K, T>(map: &mut HashMap<K, T>, key: K, record: T) -> Result<T, RepositoryError>
where
    K: Eq + Hash,
    T: Clone,
{
    if map.contains_key(&key) {
        return Err(RepositoryError::Conflict);
    }
    map.insert(key, record.clone());
    Ok(record)
}

fn replace_versioned<K, T>(
    map: &mut HashMap<K, T>,
    key: K,
    mut record: T,
    expected_version: u64,
) -> Result<T, RepositoryError>
where
    K: Eq + Hash,
    T: Versioned + Clone,
{
    let stored = map.get(&key).ok_or(RepositoryError::NotFound)?;
    check_version(stored, expected_version)?;
    record.bump_version();
    map.insert(key, record.clone());
    Ok(record)
}

/// One store backing every repository trait.
#[derive(Default)]
pub struct InMemoryStore {
    properties: Mutex<HashMap<PropertyId, Property>>,
    deal_sites: Mutex<HashMap<String, DealSite>>,
    buyers: Mutex<Vec<Buyer>>,
    transactions: Mutex<HashMap<TransactionId, NewTransaction>>,
    inspections: Mutex<HashMap<InspectionId, InspectionBooking>>,
    bookings: Mutex<HashMap<BookingId, Booking>>,
    documents: Mutex<HashMap<DocumentVerificationId, DocumentVerification>>,
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    activity: Mutex<Vec<ActivityLogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buyers(&self) -> Result<Vec<Buyer>, RepositoryError> {
        Ok(lock(&self.buyers)?.clone())
    }

    pub fn transactions(&self) -> Result<Vec<NewTransaction>, RepositoryError> {
        let mut all: Vec<NewTransaction> = lock(&self.transactions)?.values().cloned().collect();
        all.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(all)
    }

    pub fn bookings(&self) -> Result<Vec<Booking>, RepositoryError> {
        let mut all: Vec<Booking> = lock(&self.bookings)?.values().cloned().collect();
        all.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(all)
    }

    /// Overwrites a stored subscription without a version check.
    pub fn put_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError> {
        lock(&self.subscriptions)?.insert(subscription.id.clone(), subscription);
        Ok(())
    }

    pub fn activity(&self) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        Ok(lock(&self.activity)?.clone())
    }
}

impl DirectoryRepository for InMemoryStore {
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(lock(&self.properties)?.get(id).cloned())
    }

    fn deal_site(&self, public_slug: &str) -> Result<Option<DealSite>, RepositoryError> {
        Ok(lock(&self.deal_sites)?.get(public_slug).cloned())
    }

    fn upsert_buyer(&self, contact: &BuyerContact) -> Result<Buyer, RepositoryError> {
        let mut buyers = lock(&self.buyers)?;
        let email = contact.email.trim().to_ascii_lowercase();
        if let Some(existing) = buyers.iter().find(|buyer| buyer.email == email) {
            return Ok(existing.clone());
        }

        let buyer = Buyer {
            id: UserId(format!("buyer-{:04}", buyers.len() + 1)),
            full_name: contact.full_name.trim().to_string(),
            email,
            phone: contact.phone.clone(),
        };
        buyers.push(buyer.clone());
        Ok(buyer)
    }

    fn save_property(&self, property: Property) -> Result<(), RepositoryError> {
        lock(&self.properties)?.insert(property.id.clone(), property);
        Ok(())
    }

    fn save_deal_site(&self, deal_site: DealSite) -> Result<(), RepositoryError> {
        lock(&self.deal_sites)?.insert(deal_site.public_slug.clone(), deal_site);
        Ok(())
    }
}

impl TransactionRepository for InMemoryStore {
    fn insert(&self, transaction: NewTransaction) -> Result<NewTransaction, RepositoryError> {
        let mut transactions = lock(&self.transactions)?;
        if transactions
            .values()
            .any(|stored| stored.reference == transaction.reference)
        {
            return Err(RepositoryError::Conflict);
        }
        insert_new(&mut *transactions, transaction.id.clone(), transaction)
    }

    fn fetch(&self, id: &TransactionId) -> Result<Option<NewTransaction>, RepositoryError> {
        Ok(lock(&self.transactions)?.get(id).cloned())
    }

    fn by_reference(&self, reference: &str) -> Result<Option<NewTransaction>, RepositoryError> {
        Ok(lock(&self.transactions)?
            .values()
            .find(|transaction| transaction.reference == reference)
            .cloned())
    }

    fn update(
        &self,
        transaction: NewTransaction,
        expected_version: u64,
    ) -> Result<NewTransaction, RepositoryError> {
        let key = transaction.id.clone();
        replace_versioned(&mut *lock(&self.transactions)?, key, transaction, expected_version)
    }

    fn pending_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<NewTransaction>, RepositoryError> {
        let mut pending: Vec<NewTransaction> = lock(&self.transactions)?
            .values()
            .filter(|tx| tx.status == TransactionStatus::Pending && tx.created_at < cutoff)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(pending)
    }
}

impl InspectionRepository for InMemoryStore {
    fn insert(&self, inspection: InspectionBooking) -> Result<InspectionBooking, RepositoryError> {
        insert_new(
            &mut *lock(&self.inspections)?,
            inspection.id.clone(),
            inspection,
        )
    }

    fn fetch(&self, id: &InspectionId) -> Result<Option<InspectionBooking>, RepositoryError> {
        Ok(lock(&self.inspections)?.get(id).cloned())
    }

    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Vec<InspectionBooking>, RepositoryError> {
        let mut linked: Vec<InspectionBooking> = lock(&self.inspections)?
            .values()
            .filter(|inspection| &inspection.transaction_id == transaction_id)
            .cloned()
            .collect();
        linked.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(linked)
    }

    fn update(
        &self,
        inspection: InspectionBooking,
        expected_version: u64,
    ) -> Result<InspectionBooking, RepositoryError> {
        let key = inspection.id.clone();
        replace_versioned(&mut *lock(&self.inspections)?, key, inspection, expected_version)
    }
}

impl BookingRepository for InMemoryStore {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut bookings = lock(&self.bookings)?;
        if bookings
            .values()
            .any(|stored| stored.booking_code == booking.booking_code)
        {
            return Err(RepositoryError::Conflict);
        }
        insert_new(&mut *bookings, booking.id.clone(), booking)
    }

    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?.get(id).cloned())
    }

    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?
            .values()
            .find(|booking| booking.transaction_id.as_ref() == Some(transaction_id))
            .cloned())
    }

    fn by_code(&self, booking_code: &str) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?
            .values()
            .find(|booking| booking.booking_code == booking_code)
            .cloned())
    }

    fn update(&self, booking: Booking, expected_version: u64) -> Result<Booking, RepositoryError> {
        let key = booking.id.clone();
        replace_versioned(&mut *lock(&self.bookings)?, key, booking, expected_version)
    }
}

impl DocumentRepository for InMemoryStore {
    fn insert(
        &self,
        verification: DocumentVerification,
    ) -> Result<DocumentVerification, RepositoryError> {
        insert_new(
            &mut *lock(&self.documents)?,
            verification.id.clone(),
            verification,
        )
    }

    fn fetch(
        &self,
        id: &DocumentVerificationId,
    ) -> Result<Option<DocumentVerification>, RepositoryError> {
        Ok(lock(&self.documents)?.get(id).cloned())
    }

    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<DocumentVerification>, RepositoryError> {
        Ok(lock(&self.documents)?
            .values()
            .find(|verification| &verification.transaction_id == transaction_id)
            .cloned())
    }

    fn update(
        &self,
        verification: DocumentVerification,
        expected_version: u64,
    ) -> Result<DocumentVerification, RepositoryError> {
        let key = verification.id.clone();
        replace_versioned(&mut *lock(&self.documents)?, key, verification, expected_version)
    }
}

impl SubscriptionRepository for InMemoryStore {
    fn insert(&self, subscription: Subscription) -> Result<Subscription, RepositoryError> {
        insert_new(
            &mut *lock(&self.subscriptions)?,
            subscription.id.clone(),
            subscription,
        )
    }

    fn fetch(&self, id: &SubscriptionId) -> Result<Option<Subscription>, RepositoryError> {
        Ok(lock(&self.subscriptions)?.get(id).cloned())
    }

    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(lock(&self.subscriptions)?
            .values()
            .find(|subscription| &subscription.transaction_id == transaction_id)
            .cloned())
    }

    fn lapsed(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, RepositoryError> {
        let mut lapsed: Vec<Subscription> = lock(&self.subscriptions)?
            .values()
            .filter(|subscription| subscription.is_lapsed(now))
            .cloned()
            .collect();
        lapsed.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(lapsed)
    }

    fn update(
        &self,
        subscription: Subscription,
        expected_version: u64,
    ) -> Result<Subscription, RepositoryError> {
        let key = subscription.id.clone();
        replace_versioned(&mut *lock(&self.subscriptions)?, key, subscription, expected_version)
    }
}

impl ActivityLog for InMemoryStore {
    fn append(&self, entry: NewActivity) -> Result<ActivityLogEntry, RepositoryError> {
        let mut activity = lock(&self.activity)?;
        let logged = ActivityLogEntry {
            id: ActivityId(format!("act-{:06}", activity.len() + 1)),
            subject: entry.subject,
            sender_id: entry.sender_id,
            sender_role: entry.sender_role,
            message: entry.message,
            status: entry.status,
            stage: entry.stage,
            metadata: entry.metadata,
            created_at: Utc::now(),
        };
        activity.push(logged.clone());
        Ok(logged)
    }

    fn for_subject(
        &self,
        subject: &ActivitySubject,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        Ok(lock(&self.activity)?
            .iter()
            .filter(|entry| &entry.subject == subject)
            .cloned()
            .collect())
    }
}

/// Captures outgoing email instead of delivering it.
#[derive(Default)]
pub struct InMemoryMailer {
    outbox: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every send is rejected.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|message| message.to.eq_ignore_ascii_case(address))
            .collect()
    }
}

impl Mailer for InMemoryMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("mail relay offline".to_string()));
        }
        self.outbox
            .lock()
            .map_err(|_| DeliveryError::Transport("outbox lock poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotifications {
    items: Mutex<Vec<InAppNotification>>,
}

impl InMemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<InAppNotification> {
        self.items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    pub fn for_user(&self, user_id: &UserId) -> Vec<InAppNotification> {
        self.all()
            .into_iter()
            .filter(|notification| &notification.user_id == user_id)
            .collect()
    }
}

impl NotificationSink for InMemoryNotifications {
    fn push(&self, notification: InAppNotification) -> Result<(), DeliveryError> {
        self.items
            .lock()
            .map_err(|_| DeliveryError::Transport("notification lock poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

#[derive(Default)]
struct SandboxState {
    initialized: HashMap<String, Decimal>,
    splits: HashMap<String, SplitTerms>,
    outcomes: HashMap<String, GatewayStatus>,
    paid_amounts: HashMap<String, Decimal>,
    decline_auto_charges: bool,
    initialization_failure: Option<GatewayError>,
}

/// Provider stand-in. Every checkout verifies as paid in full unless a test
/// scripts a different outcome for its reference.
#[derive(Default)]
pub struct SandboxGateway {
    state: Mutex<SandboxState>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, SandboxState>, GatewayError> {
        self.state
            .lock()
            .map_err(|_| GatewayError::Transport("sandbox lock poisoned".to_string()))
    }

    pub fn set_outcome(&self, reference: &str, status: GatewayStatus) {
        if let Ok(mut state) = self.state() {
            state.outcomes.insert(reference.to_string(), status);
        }
    }

    /// Reports `amount` as paid for `reference` instead of the checkout amount.
    pub fn set_paid_amount(&self, reference: &str, amount: Decimal) {
        if let Ok(mut state) = self.state() {
            state.paid_amounts.insert(reference.to_string(), amount);
        }
    }

    pub fn decline_auto_charges(&self, decline: bool) {
        if let Ok(mut state) = self.state() {
            state.decline_auto_charges = decline;
        }
    }

    pub fn fail_initialization(&self, failure: Option<GatewayError>) {
        if let Ok(mut state) = self.state() {
            state.initialization_failure = failure;
        }
    }

    pub fn split_for(&self, reference: &str) -> Option<SplitTerms> {
        self.state()
            .ok()
            .and_then(|state| state.splits.get(reference).cloned())
    }

    pub fn initialized(&self) -> usize {
        self.state().map(|state| state.initialized.len()).unwrap_or(0)
    }

    fn open(&self, init: &PaymentInit, split: Option<&SplitTerms>) -> Result<Checkout, GatewayError> {
        if to_minor_units(init.amount).map_or(true, |kobo| kobo <= 0) {
            return Err(GatewayError::Declined(format!(
                "amount {} cannot be charged",
                init.amount
            )));
        }

        let mut state = self.state()?;
        if let Some(failure) = state.initialization_failure.clone() {
            return Err(failure);
        }
        state
            .initialized
            .insert(init.reference.clone(), init.amount);
        if let Some(split) = split {
            state.splits.insert(init.reference.clone(), split.clone());
        }

        Ok(Checkout {
            reference: init.reference.clone(),
            authorization_url: format!("https://checkout.sandbox.local/{}", init.reference),
            access_code: format!("ac_{}", init.reference.to_ascii_lowercase()),
        })
    }
}

impl PaymentGateway for SandboxGateway {
    fn initialize_payment(&self, init: &PaymentInit) -> Result<Checkout, GatewayError> {
        self.open(init, None)
    }

    fn initialize_split_payment(
        &self,
        init: &PaymentInit,
        split: &SplitTerms,
    ) -> Result<Checkout, GatewayError> {
        self.open(init, Some(split))
    }

    fn verify_payment(&self, reference: &str) -> Result<Verification, GatewayError> {
        let state = self.state()?;
        let amount = *state
            .initialized
            .get(reference)
            .ok_or_else(|| GatewayError::UnknownReference(reference.to_string()))?;
        let status = state
            .outcomes
            .get(reference)
            .copied()
            .unwrap_or(GatewayStatus::Success);

        Ok(Verification {
            reference: reference.to_string(),
            status,
            amount: state.paid_amounts.get(reference).copied().unwrap_or(amount),
            authorization_code: (status == GatewayStatus::Success)
                .then(|| format!("AUTH_{reference}")),
            message: match status {
                GatewayStatus::Success => Some("Approved".to_string()),
                GatewayStatus::Failed => Some("Declined by issuer".to_string()),
                GatewayStatus::Abandoned => Some("Checkout abandoned".to_string()),
                GatewayStatus::Pending => None,
            },
        })
    }

    fn auto_charge(&self, charge: &AutoCharge) -> Result<Verification, GatewayError> {
        let declined = self.state()?.decline_auto_charges;
        let (status, message) = if declined {
            (GatewayStatus::Failed, "Insufficient funds")
        } else {
            (GatewayStatus::Success, "Approved")
        };

        Ok(Verification {
            reference: charge.reference.clone(),
            status,
            amount: charge.amount,
            authorization_code: Some(charge.authorization_code.clone()),
            message: Some(message.to_string()),
        })
    }
}
