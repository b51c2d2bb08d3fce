//! Derives the deduplicated facility list from availabilities and the raw
//! location table.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::model::{Availability, Facility, LocationRecord};

/// Province every facility in this dataset belongs to.
pub const PROVINCE: &str = "Ontario";

/// Outcome of the resolution pass beyond the facility list itself.
///
/// `unmatched` holds location ids that appear in availabilities but have no
/// row in the location table. Those ids produce no facility, and their
/// availabilities stay in the stream; the loader treats them as a fatal
/// lookup failure. Surfacing them here keeps the gap visible instead of
/// silently dropping it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    pub unmatched: Vec<i64>,
}

/// Build one [`Facility`] per distinct location id referenced by any
/// availability, with contact and geo fields unset. Ids are visited in
/// ascending order so the output is deterministic.
pub fn resolve_facilities(
    availabilities: &[Availability],
    locations: &[LocationRecord],
) -> (Vec<Facility>, ResolveReport) {
    let location_ids: BTreeSet<i64> = availabilities.iter().map(|a| a.location_id).collect();
    info!(
        "Resolving {} distinct locations against {} location rows",
        location_ids.len(),
        locations.len()
    );

    let mut facilities = Vec::new();
    let mut report = ResolveReport::default();

    for location_id in location_ids {
        match locations.iter().find(|l| l.location_id == location_id) {
            Some(record) => facilities.push(facility_from_record(record)),
            None => {
                warn!("Location id {} has no row in the location table", location_id);
                report.unmatched.push(location_id);
            }
        }
    }

    (facilities, report)
}

fn facility_from_record(record: &LocationRecord) -> Facility {
    // street number and suffix are concatenated without a separator
    let street = format!(
        "{}{} {} {}",
        record.street_no, record.street_no_suffix, record.street_name, record.street_type
    );
    Facility {
        location_id: record.location_id,
        name: record.name.clone(),
        city: record.district.clone(),
        street,
        province: PROVINCE.to_string(),
        postal_code: record.postal_code.clone(),
        phone: None,
        url: None,
        lat: None,
        lng: None,
    }
}
