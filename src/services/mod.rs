// Service exports
pub mod location;
pub mod preferences;
pub mod roster;

pub use location::{FixedLocation, LocatedPosition, LocationOutcome, LocationReporter, LocationService, ReportedLocation};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore};
pub use roster::{fetch_roster, RestRosterProvider, RosterError, RosterProvider, StaticRoster};
