use crate::core::criteria::{normalize_city, CriteriaError, FilterStore};
use crate::core::filters::ListingPredicate;
use crate::models::{CategoryFilter, FilterCriteria, FilteredResult, Listing, Radius, UserPosition};
use crate::services::{fetch_roster, LocationOutcome, LocationService, PreferenceStore, RosterProvider};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use thiserror::Error;
use tokio::sync::Mutex;

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Errors returned by the discovery controller
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiscoveryError {
    #[error("Discovery controller has been disposed")]
    Disposed,

    #[error(transparent)]
    InvalidCriteria(#[from] CriteriaError),
}

/// Proof that a location request was started by a given controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateTicket {
    controller: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocateState {
    Idle,
    Pending,
    Resolved,
}

/// Owns the criteria, the position and the latest roster snapshot,
/// and recomputes the filtered result whenever any of them changes.
///
/// Recomputation is synchronous and happens on every mutator call; nothing
/// is debounced or scheduled behind the caller's back.
#[derive(Debug)]
pub struct DiscoveryController<S> {
    id: u64,
    filters: FilterStore<S>,
    roster: Vec<Listing>,
    position: Option<UserPosition>,
    detected_city: Option<String>,
    locate: LocateState,
    result: FilteredResult,
    disposed: bool,
}

impl<S: PreferenceStore> DiscoveryController<S> {
    /// Create a controller, restoring persisted criteria from `store`
    pub fn new(store: S) -> Self {
        Self {
            id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
            filters: FilterStore::load(store),
            roster: Vec::new(),
            position: None,
            detected_city: None,
            locate: LocateState::Idle,
            result: FilteredResult::default(),
            disposed: false,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.filters.criteria()
    }

    pub fn filters(&self) -> &FilterStore<S> {
        &self.filters
    }

    pub fn position(&self) -> Option<UserPosition> {
        self.position
    }

    pub fn detected_city(&self) -> Option<&str> {
        self.detected_city.as_deref()
    }

    pub fn roster(&self) -> &[Listing] {
        &self.roster
    }

    /// Result of the latest recomputation
    pub fn result(&self) -> &FilteredResult {
        &self.result
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn location_requested(&self) -> bool {
        self.locate != LocateState::Idle
    }

    /// Criteria actually fed to the predicate engine.
    ///
    /// A detected city stands in for an unset city filter.
    pub fn effective_criteria(&self) -> Cow<'_, FilterCriteria> {
        let criteria = self.filters.criteria();
        match (&criteria.city, &self.detected_city) {
            (None, Some(detected)) => Cow::Owned(FilterCriteria {
                city: Some(detected.clone()),
                ..criteria.clone()
            }),
            _ => Cow::Borrowed(criteria),
        }
    }

    /// Re-run the predicate engine over the current roster
    pub fn recompute(&mut self) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;

        let predicate = ListingPredicate::new(&self.effective_criteria(), self.position)?;
        let listings: Vec<Listing> = predicate.apply(&self.roster).into_iter().cloned().collect();

        tracing::debug!(
            "Recomputed discovery result: {} of {} listings",
            listings.len(),
            self.roster.len()
        );

        self.result = FilteredResult {
            listings,
            total_listings: self.roster.len(),
        };

        Ok(&self.result)
    }

    /// Replace the roster snapshot
    pub fn set_roster(&mut self, roster: Vec<Listing>) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.roster = roster;
        self.recompute()
    }

    /// Fetch a fresh roster; a failed fetch yields an empty roster
    pub async fn load_roster<R>(&mut self, provider: &R) -> Result<&FilteredResult, DiscoveryError>
    where
        R: RosterProvider + ?Sized,
    {
        self.ensure_live()?;
        let roster = fetch_roster(provider).await;
        self.set_roster(roster)
    }

    pub fn set_city(&mut self, city: Option<&str>) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.set_city(city);
        self.recompute()
    }

    pub fn set_category(&mut self, category: CategoryFilter) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.set_category(category);
        self.recompute()
    }

    pub fn set_min_price(&mut self, price: Option<f64>) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.set_min_price(price)?;
        self.recompute()
    }

    pub fn set_max_price(&mut self, price: Option<f64>) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.set_max_price(price)?;
        self.recompute()
    }

    pub fn set_radius(&mut self, radius: Radius) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.set_radius(radius)?;
        self.recompute()
    }

    /// Replace all criteria with a single store write
    pub fn replace_criteria(&mut self, criteria: FilterCriteria) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.replace(criteria)?;
        self.recompute()
    }

    pub fn reset_criteria(&mut self) -> Result<&FilteredResult, DiscoveryError> {
        self.ensure_live()?;
        self.filters.reset();
        self.recompute()
    }

    /// Start the one location request this controller may make
    ///
    /// Returns `None` if a request was already made or the controller is gone.
    pub fn begin_locate(&mut self) -> Option<LocateTicket> {
        if self.disposed || self.locate != LocateState::Idle {
            return None;
        }

        self.locate = LocateState::Pending;
        Some(LocateTicket { controller: self.id })
    }

    /// Apply the outcome of a location request
    ///
    /// Late outcomes (after `dispose`) and foreign tickets are ignored.
    /// Returns whether the outcome was applied.
    pub fn complete_locate(&mut self, ticket: LocateTicket, outcome: LocationOutcome) -> bool {
        if self.disposed {
            tracing::debug!("Ignoring location outcome for disposed controller");
            return false;
        }
        if ticket.controller != self.id || self.locate != LocateState::Pending {
            tracing::debug!("Ignoring stale location outcome");
            return false;
        }

        self.locate = LocateState::Resolved;

        match outcome {
            LocationOutcome::Located(located) => {
                tracing::info!(
                    "User position resolved ({:.4}, {:.4})",
                    located.position.latitude,
                    located.position.longitude
                );
                self.position = Some(located.position);
                self.detected_city = normalize_city(located.city.as_deref());
            }
            LocationOutcome::Denied => tracing::info!("Location permission denied, radius filter disabled"),
            LocationOutcome::Unavailable => tracing::info!("Location unavailable, radius filter disabled"),
        }

        if let Err(e) = self.recompute() {
            tracing::warn!("Recompute after location outcome failed: {}", e);
        }
        true
    }

    /// Tear the controller down; later location outcomes are dropped
    pub fn dispose(&mut self) {
        if !self.disposed {
            tracing::debug!("Disposing discovery controller {}", self.id);
        }
        self.disposed = true;
    }

    fn ensure_live(&self) -> Result<(), DiscoveryError> {
        if self.disposed {
            Err(DiscoveryError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// Run the controller's single location request against `service`
///
/// The controller is only locked to start and to complete the request, so
/// other work can proceed while the platform answers. If the controller has
/// been dropped or disposed by then, the outcome is discarded.
pub async fn locate_user<S, L>(controller: Weak<Mutex<DiscoveryController<S>>>, service: &L) -> bool
where
    S: PreferenceStore,
    L: LocationService + ?Sized,
{
    let ticket = {
        let Some(shared) = controller.upgrade() else {
            return false;
        };
        let mut guard = shared.lock().await;
        match guard.begin_locate() {
            Some(ticket) => ticket,
            None => return false,
        }
    };

    let outcome = service.request_position().await;

    let Some(shared) = controller.upgrade() else {
        tracing::debug!("Discovery controller dropped before location resolved");
        return false;
    };
    let mut guard = shared.lock().await;
    guard.complete_locate(ticket, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::criteria::PreferenceKey;
    use crate::models::{Category, Coordinate};
    use crate::services::{FixedLocation, LocatedPosition, MemoryPreferenceStore, ReportedLocation};
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn create_listing(id: &str, city: &str, lat: f64, lon: f64) -> Listing {
        Listing {
            id: id.to_string(),
            name: format!("Creator {}", id),
            username: None,
            category: Category::Woman,
            city: city.to_string(),
            area: None,
            hourly_price: Some(200.0),
            position: Some(Coordinate::new(lat, lon)),
            rating: 5.0,
            online: true,
            avatar: None,
            created_at: None,
        }
    }

    fn roster() -> Vec<Listing> {
        vec![
            create_listing("1", "São Paulo", 0.0, 0.5),
            create_listing("2", "Campinas", 0.0, 1.0),
            create_listing("3", "Santos", 0.0, 3.0),
        ]
    }

    #[test]
    fn test_restores_persisted_criteria() {
        let mut store = MemoryPreferenceStore::new();
        store.set(PreferenceKey::CATEGORY, "man").unwrap();
        store.set(PreferenceKey::RADIUS, "40").unwrap();

        let controller = DiscoveryController::new(store);
        assert_eq!(controller.criteria().category, CategoryFilter::Only(Category::Man));
        assert_eq!(controller.criteria().radius, Radius::Km(40.0));
    }

    #[test]
    fn test_every_change_recomputes() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());

        assert_eq!(controller.set_roster(roster()).unwrap().len(), 3);
        assert_eq!(controller.set_city(Some("SANTOS")).unwrap().ids(), vec!["3"]);
        assert_eq!(controller.set_city(None).unwrap().len(), 3);
        assert_eq!(controller.set_max_price(Some(100.0)).unwrap().len(), 0);
        assert_eq!(controller.reset_criteria().unwrap().len(), 3);
        assert_eq!(controller.result().total_listings, 3);
    }

    #[test]
    fn test_position_enables_radius() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());
        controller.set_roster(roster()).unwrap();
        controller.set_radius(Radius::Km(120.0)).unwrap();

        // No position yet: radius is permissive
        assert_eq!(controller.result().len(), 3);

        let ticket = controller.begin_locate().unwrap();
        let applied = controller.complete_locate(
            ticket,
            LocationOutcome::located(Coordinate::new(0.0, 0.0)),
        );

        assert!(applied);
        assert_eq!(controller.result().ids(), vec!["1", "2"]);
    }

    #[test]
    fn test_location_requested_once() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());

        assert!(controller.begin_locate().is_some());
        assert!(controller.location_requested());
        assert!(controller.begin_locate().is_none());
    }

    #[test]
    fn test_foreign_ticket_ignored() {
        let mut first = DiscoveryController::new(MemoryPreferenceStore::new());
        let mut second = DiscoveryController::new(MemoryPreferenceStore::new());
        let foreign = first.begin_locate().unwrap();
        second.begin_locate().unwrap();

        assert!(!second.complete_locate(foreign, LocationOutcome::Denied));
    }

    #[test]
    fn test_late_outcome_after_dispose_is_ignored() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());
        let ticket = controller.begin_locate().unwrap();

        controller.dispose();

        assert!(!controller.complete_locate(
            ticket,
            LocationOutcome::located(Coordinate::new(0.0, 0.0))
        ));
        assert!(controller.position().is_none());
    }

    #[test]
    fn test_disposed_controller_does_not_write() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());
        controller.dispose();

        assert!(matches!(controller.set_city(Some("Santos")), Err(DiscoveryError::Disposed)));
        assert!(controller.filters().store().is_empty());
    }

    #[test]
    fn test_detected_city_fills_unset_city_filter() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());
        controller.set_roster(roster()).unwrap();
        let ticket = controller.begin_locate().unwrap();

        controller.complete_locate(
            ticket,
            LocationOutcome::Located(LocatedPosition {
                position: Coordinate::new(0.0, 0.0),
                city: Some("Campinas".to_string()),
            }),
        );
        assert_eq!(controller.result().ids(), vec!["2"]);

        // Explicit choice wins over the detected city
        assert_eq!(controller.set_city(Some("paulo")).unwrap().ids(), vec!["1"]);
        assert_eq!(controller.filters().store().get(PreferenceKey::CITY).as_deref(), Some("paulo"));
    }

    #[test]
    fn test_invalid_criteria_rejected() {
        let mut controller = DiscoveryController::new(MemoryPreferenceStore::new());

        let err = controller.set_radius(Radius::Km(f64::NAN)).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidCriteria(_)));
        assert_eq!(controller.criteria().radius, Radius::Unlimited);
    }

    #[tokio::test]
    async fn test_locate_user_applies_outcome() {
        let controller = Arc::new(Mutex::new(DiscoveryController::new(MemoryPreferenceStore::new())));
        controller.lock().await.set_roster(roster()).unwrap();
        controller.lock().await.set_radius(Radius::Km(60.0)).unwrap();

        let service = FixedLocation::new(LocationOutcome::located(Coordinate::new(0.0, 0.0)));
        assert!(locate_user(Arc::downgrade(&controller), &service).await);

        let guard = controller.lock().await;
        assert_eq!(guard.result().ids(), vec!["1"]);
        assert_eq!(guard.position(), Some(Coordinate::new(0.0, 0.0)));
    }

    #[tokio::test]
    async fn test_locate_user_after_drop_is_ignored() {
        let controller = Arc::new(Mutex::new(DiscoveryController::new(MemoryPreferenceStore::new())));
        let weak = Arc::downgrade(&controller);
        let (service, reporter) = ReportedLocation::channel();

        let mut pending = task::spawn(async move { locate_user(weak, &service).await });
        assert_pending!(pending.poll());

        // The request is in flight before the controller goes away
        assert!(controller.lock().await.location_requested());
        drop(controller);

        assert!(reporter.report(LocationOutcome::located(Coordinate::new(0.0, 0.0))));
        assert_ready_eq!(pending.poll(), false);
    }
}
