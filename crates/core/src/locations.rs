//! Static registry of scrape locations.
//!
//! Callers pick a location by its small integer code; the worker is told the
//! region identifier (e.g. `"UK"`). The table is fixed at compile time.

use serde::Serialize;

/// One registered scrape location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Code the caller submits (1-based).
    pub id: u8,
    /// Region identifier passed to the worker.
    pub code: &'static str,
    /// Human-readable region name.
    pub name: &'static str,
}

/// Location used when a submission omits one.
pub const DEFAULT_LOCATION_CODE: u8 = 1;

const LOCATIONS: [Location; 10] = [
    Location { id: 1, code: "US", name: "United States" },
    Location { id: 2, code: "UK", name: "United Kingdom" },
    Location { id: 3, code: "CA", name: "Canada" },
    Location { id: 4, code: "AU", name: "Australia" },
    Location { id: 5, code: "DE", name: "Germany" },
    Location { id: 6, code: "FR", name: "France" },
    Location { id: 7, code: "JP", name: "Japan" },
    Location { id: 8, code: "BR", name: "Brazil" },
    Location { id: 9, code: "IN", name: "India" },
    Location { id: 10, code: "SG", name: "Singapore" },
];

/// Resolve a location code to its registry entry.
pub fn resolve(code: i64) -> Option<Location> {
    LOCATIONS.iter().copied().find(|l| i64::from(l.id) == code)
}

/// Friendly name for a region identifier, falling back to the identifier.
pub fn display_name(region: &str) -> &str {
    LOCATIONS
        .iter()
        .find(|l| l.code == region)
        .map(|l| l.name)
        .unwrap_or(region)
}

/// All registered locations in code order.
pub fn all() -> &'static [Location] {
    &LOCATIONS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
