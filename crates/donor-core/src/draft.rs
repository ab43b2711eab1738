//! Attribution & Draft Store
//!
//! Owns the in-progress donation. All mutation goes through validated
//! setters; every setter re-derives the display summary and fires exactly
//! one coalesced change notification, so downstream consumers can
//! debounce a burst of keystrokes into a single evaluation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::CheckoutConfig;
use crate::error::DraftError;
use crate::money;

/// Durable storage key for the last amount (survives reloads).
pub const DURABLE_AMOUNT_KEY: &str = "donorkit.amount";
/// Durable storage key for team attribution.
pub const DURABLE_TEAM_KEY: &str = "donorkit.team";
/// Volatile storage key for the full draft (survives same-tab navigation).
pub const SESSION_DRAFT_KEY: &str = "donorkit.draft";

/// Minimal key-value persistence seam. Web storage in the browser, a
/// hash map in tests. Implementations swallow quota/availability errors;
/// losing a persisted draft is never fatal.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage for tests and headless runs.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.into(), value.into());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// The donor's in-progress, unsubmitted donation input.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DonationDraft {
    pub amount_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub donor_name: String,
    #[serde(default)]
    pub donor_email: String,
    #[serde(default)]
    pub donor_message: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub cover_fees: bool,
    #[serde(default)]
    pub round_up: bool,
    #[serde(default)]
    pub anonymous: bool,
}

impl DonationDraft {
    fn empty(currency: &str) -> Self {
        Self {
            amount_cents: 0,
            currency: currency.into(),
            donor_name: String::new(),
            donor_email: String::new(),
            donor_message: String::new(),
            team_id: None,
            cover_fees: false,
            round_up: false,
            anonymous: false,
        }
    }
}

/// Display-ready derivation of the current draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftSummary {
    pub base_cents: i64,
    pub round_up_cents: i64,
    /// Authoritative fee cover (algebraic gross-up); billed.
    pub fee_cover_cents: i64,
    /// Naive fee estimate; display only, never billed.
    pub fee_estimate_cents: i64,
    pub total_cents: i64,
    pub display_base: String,
    pub display_total: String,
}

/// Sole owner of the [`DonationDraft`].
pub struct DraftStore {
    config: Rc<CheckoutConfig>,
    draft: RefCell<DonationDraft>,
    durable: Rc<dyn KeyValueStorage>,
    volatile: Rc<dyn KeyValueStorage>,
    listeners: RefCell<Vec<Box<dyn Fn(&DraftSummary)>>>,
}

impl DraftStore {
    /// Build the store, restoring any persisted draft: the volatile
    /// session draft wins; otherwise the durable (amount, team) subset.
    pub fn new(
        config: Rc<CheckoutConfig>,
        durable: Rc<dyn KeyValueStorage>,
        volatile: Rc<dyn KeyValueStorage>,
    ) -> Self {
        let mut draft = DonationDraft::empty(&config.currency);

        if let Some(raw) = volatile.get(SESSION_DRAFT_KEY) {
            match serde_json::from_str::<DonationDraft>(&raw) {
                Ok(restored) => draft = restored,
                Err(err) => tracing::debug!(%err, "discarding unreadable session draft"),
            }
        } else {
            if let Some(raw) = durable.get(DURABLE_AMOUNT_KEY) {
                if let Ok(cents) = raw.parse::<i64>() {
                    draft.amount_cents = cents.clamp(0, config.ceiling_cents);
                }
            }
            if let Some(team) = durable.get(DURABLE_TEAM_KEY) {
                if !team.is_empty() {
                    draft.team_id = Some(team);
                }
            }
        }

        draft.currency = config.currency.clone();

        Self {
            config,
            draft: RefCell::new(draft),
            durable,
            volatile,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Box<dyn Fn(&DraftSummary)>) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn snapshot(&self) -> DonationDraft {
        self.draft.borrow().clone()
    }

    pub fn amount_cents(&self) -> i64 {
        self.draft.borrow().amount_cents
    }

    /// Parse and store a raw amount string. Invalid input zeroes the
    /// amount (so gating blocks) and returns the validation error for
    /// inline display.
    pub fn set_amount_input(&self, raw: &str) -> Result<i64, DraftError> {
        let parsed = money::parse_amount_cents(raw, self.config.ceiling_cents);
        let cents = *parsed.as_ref().unwrap_or(&0);
        self.draft.borrow_mut().amount_cents = cents;
        self.notify();
        parsed
    }

    /// Commit-time floor: lift a valid non-zero amount to the configured
    /// minimum. Called on blur/submit, never per keystroke, so the donor
    /// can type freely.
    pub fn commit_amount(&self) {
        let changed = {
            let mut draft = self.draft.borrow_mut();
            if draft.amount_cents > 0 && draft.amount_cents < self.config.minimum_cents {
                draft.amount_cents = self.config.minimum_cents;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
    }

    /// No-op on an empty id. Team attribution persists durably so it
    /// survives reloads and future donations.
    pub fn set_team(&self, team_id: &str) {
        if team_id.is_empty() {
            return;
        }
        self.draft.borrow_mut().team_id = Some(team_id.into());
        self.notify();
    }

    pub fn set_donor_name(&self, name: &str) {
        self.draft.borrow_mut().donor_name = name.into();
        self.notify();
    }

    pub fn set_donor_email(&self, email: &str) {
        self.draft.borrow_mut().donor_email = email.trim().into();
        self.notify();
    }

    pub fn set_donor_message(&self, message: &str) {
        self.draft.borrow_mut().donor_message = message.into();
        self.notify();
    }

    pub fn set_cover_fees(&self, cover: bool) {
        self.draft.borrow_mut().cover_fees = cover;
        self.notify();
    }

    pub fn set_round_up(&self, round_up: bool) {
        self.draft.borrow_mut().round_up = round_up;
        self.notify();
    }

    pub fn set_anonymous(&self, anonymous: bool) {
        self.draft.borrow_mut().anonymous = anonymous;
        self.notify();
    }

    /// Gating validation shared by the orchestrator: minimum amount and,
    /// when required, a syntactically valid email. Never touches the
    /// network.
    pub fn validate(&self) -> Result<(), DraftError> {
        let draft = self.draft.borrow();
        if draft.amount_cents <= 0 {
            return Err(DraftError::AmountMissing);
        }
        if draft.amount_cents < self.config.minimum_cents {
            return Err(DraftError::BelowMinimum(money::format_cents(
                self.config.minimum_cents,
            )));
        }
        if self.config.require_email && !money::is_valid_email(&draft.donor_email) {
            return Err(DraftError::EmailInvalid);
        }
        Ok(())
    }

    /// Derive the display summary from the current draft.
    pub fn summary(&self) -> DraftSummary {
        let draft = self.draft.borrow();
        let base = draft.amount_cents;
        let round_up = if draft.round_up {
            money::round_up_cents(base, self.config.round_up_denomination_cents)
        } else {
            0
        };
        let net = base + round_up;
        let fees = money::fee_cover_cents(net, &self.config.fee);
        let fee_cover = if draft.cover_fees { fees.exact_cents } else { 0 };
        let total = net + fee_cover;

        DraftSummary {
            base_cents: base,
            round_up_cents: round_up,
            fee_cover_cents: fee_cover,
            fee_estimate_cents: fees.approximate_cents,
            total_cents: total,
            display_base: money::format_cents(base),
            display_total: money::format_cents(total),
        }
    }

    /// Cleared on successful payment. The durable team attribution is
    /// kept; a returning donor stays attributed.
    pub fn clear(&self) {
        let team = self.draft.borrow().team_id.clone();
        let mut fresh = DonationDraft::empty(&self.config.currency);
        fresh.team_id = team;
        *self.draft.borrow_mut() = fresh;
        self.volatile.remove(SESSION_DRAFT_KEY);
        self.durable.remove(DURABLE_AMOUNT_KEY);
        self.notify();
    }

    fn notify(&self) {
        self.persist();
        let summary = self.summary();
        for listener in self.listeners.borrow().iter() {
            listener(&summary);
        }
    }

    fn persist(&self) {
        let draft = self.draft.borrow();
        self.durable
            .set(DURABLE_AMOUNT_KEY, &draft.amount_cents.to_string());
        if let Some(team) = &draft.team_id {
            self.durable.set(DURABLE_TEAM_KEY, team);
        }
        match serde_json::to_string(&*draft) {
            Ok(json) => self.volatile.set(SESSION_DRAFT_KEY, &json),
            Err(err) => tracing::debug!(%err, "draft not persisted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn config() -> Rc<CheckoutConfig> {
        Rc::new(CheckoutConfig::from_json(r#"{"minimum_cents":100}"#).unwrap())
    }

    fn store() -> (Rc<DraftStore>, Rc<MemoryStorage>, Rc<MemoryStorage>) {
        let durable = Rc::new(MemoryStorage::new());
        let volatile = Rc::new(MemoryStorage::new());
        let store = Rc::new(DraftStore::new(config(), durable.clone(), volatile.clone()));
        (store, durable, volatile)
    }

    #[test]
    fn test_one_notification_per_setter() {
        let (store, _, _) = store();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        store.subscribe(Box::new(move |_| counter.set(counter.get() + 1)));

        store.set_amount_input("25").unwrap();
        assert_eq!(fired.get(), 1);
        store.set_cover_fees(true);
        store.set_round_up(true);
        assert_eq!(fired.get(), 3);
    }

    #[test]
    fn test_invalid_amount_zeroes_draft() {
        let (store, _, _) = store();
        store.set_amount_input("25").unwrap();
        assert!(store.set_amount_input("garbage").is_err());
        assert_eq!(store.amount_cents(), 0);
        assert!(store.validate().is_err());
    }

    #[test]
    fn test_commit_floors_to_minimum() {
        let (store, _, _) = store();
        store.set_amount_input("0.50").unwrap();
        assert_eq!(store.amount_cents(), 50);
        store.commit_amount();
        assert_eq!(store.amount_cents(), 100);

        // zero is not lifted; it stays invalid
        let _ = store.set_amount_input("");
        store.commit_amount();
        assert_eq!(store.amount_cents(), 0);
    }

    #[test]
    fn test_summary_totals() {
        let (store, _, _) = store();
        store.set_amount_input("25.50").unwrap();
        store.set_round_up(true);
        let summary = store.summary();
        assert_eq!(summary.base_cents, 2550);
        assert_eq!(summary.round_up_cents, 50);
        assert_eq!(summary.total_cents, 2600);
        assert_eq!(summary.display_base, "25.50");

        store.set_cover_fees(true);
        let summary = store.summary();
        assert!(summary.fee_cover_cents > 0);
        assert_eq!(
            summary.total_cents,
            2600 + summary.fee_cover_cents
        );
    }

    #[test]
    fn test_session_draft_round_trips() {
        let durable = Rc::new(MemoryStorage::new());
        let volatile = Rc::new(MemoryStorage::new());
        {
            let store = DraftStore::new(config(), durable.clone(), volatile.clone());
            store.set_amount_input("42").unwrap();
            store.set_donor_email("donor@example.com");
            store.set_team("team-7");
        }
        let restored = DraftStore::new(config(), durable, volatile);
        let draft = restored.snapshot();
        assert_eq!(draft.amount_cents, 4200);
        assert_eq!(draft.donor_email, "donor@example.com");
        assert_eq!(draft.team_id.as_deref(), Some("team-7"));
    }

    #[test]
    fn test_durable_subset_without_session_draft() {
        let durable = Rc::new(MemoryStorage::new());
        let volatile = Rc::new(MemoryStorage::new());
        durable.set(DURABLE_AMOUNT_KEY, "1500");
        durable.set(DURABLE_TEAM_KEY, "team-3");

        let store = DraftStore::new(config(), durable, volatile);
        let draft = store.snapshot();
        assert_eq!(draft.amount_cents, 1500);
        assert_eq!(draft.team_id.as_deref(), Some("team-3"));
        // only the subset survives; donor fields start empty
        assert!(draft.donor_email.is_empty());
    }

    #[test]
    fn test_clear_keeps_team_attribution() {
        let (store, durable, volatile) = store();
        store.set_amount_input("25").unwrap();
        store.set_team("team-7");
        store.clear();

        assert_eq!(store.amount_cents(), 0);
        assert_eq!(store.snapshot().team_id.as_deref(), Some("team-7"));
        assert!(volatile.get(SESSION_DRAFT_KEY).is_some()); // re-persisted empty draft
        assert_eq!(durable.get(DURABLE_TEAM_KEY).as_deref(), Some("team-7"));
    }

    #[test]
    fn test_validate_requires_email() {
        let (store, _, _) = store();
        store.set_amount_input("25").unwrap();
        assert_eq!(store.validate(), Err(DraftError::EmailInvalid));
        store.set_donor_email("donor@example.com");
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_set_team_ignores_empty() {
        let (store, _, _) = store();
        store.set_team("");
        assert!(store.snapshot().team_id.is_none());
    }
}
