//! Flattens raw drop-in records into the sorted availability list.

use chrono::{NaiveDateTime, Timelike};
use thiserror::Error;
use tracing::info;

use crate::model::{Availability, RawDropIn};

const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Feed-shape failures while flattening drop-in records. Fatal: a record the
/// feed promised to be well-formed was not.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("bad start timestamp {value:?} for {course_title:?}: {message}")]
    BadStartTime {
        course_title: String,
        value: String,
        message: String,
    },

    #[error("end time {end_hour}:{end_min:02} out of range for {course_title:?}")]
    BadEndTime {
        course_title: String,
        end_hour: u32,
        end_min: u32,
    },
}

/// Flatten the drop-in feed and sort the result.
///
/// The returned list is stably sorted by (category, type_name, course_title,
/// location_id) ascending; the loader's change-detection depends on this
/// exact order, tie-breaks included.
pub fn build_availabilities(dropins: &[RawDropIn]) -> Result<Vec<Availability>, ExtractError> {
    info!("Extracting availabilities from {} drop-in records", dropins.len());
    let mut availabilities = dropins
        .iter()
        .map(flatten_dropin)
        .collect::<Result<Vec<_>, _>>()?;
    sort_availabilities(&mut availabilities);
    Ok(availabilities)
}

fn flatten_dropin(dropin: &RawDropIn) -> Result<Availability, ExtractError> {
    let start_time = NaiveDateTime::parse_from_str(&dropin.start_date_time, START_TIME_FORMAT)
        .map_err(|e| ExtractError::BadStartTime {
            course_title: dropin.course_title.clone(),
            value: dropin.start_date_time.clone(),
            message: e.to_string(),
        })?;
    let end_time = end_time_of(start_time, dropin.end_hour, dropin.end_min).ok_or(
        ExtractError::BadEndTime {
            course_title: dropin.course_title.clone(),
            end_hour: dropin.end_hour,
            end_min: dropin.end_min,
        },
    )?;

    Ok(Availability {
        location_id: dropin.location_id,
        course_title: dropin.course_title.clone(),
        type_name: derive_type(&dropin.course_title).to_string(),
        age_min: dropin.age_min,
        age_max: dropin.age_max,
        start_time,
        end_time,
        category: dropin.category.clone(),
    })
}

/// Derive the hierarchy's middle level from a course title: the substring
/// before the first `:`, else `(`, else `-`, else the full title, trimmed.
/// Delimiter precedence is by delimiter, not by position in the string.
pub fn derive_type(course_title: &str) -> &str {
    for delimiter in [':', '(', '-'] {
        if let Some(idx) = course_title.find(delimiter) {
            return course_title[..idx].trim();
        }
    }
    course_title.trim()
}

/// End time is the start timestamp with only hour and minute overwritten;
/// the feed never crosses midnight, so the date is carried over as-is.
fn end_time_of(start: NaiveDateTime, end_hour: u32, end_min: u32) -> Option<NaiveDateTime> {
    start.with_hour(end_hour)?.with_minute(end_min)
}

/// Stable sort by (category, type_name, course_title, location_id).
pub fn sort_availabilities(availabilities: &mut [Availability]) {
    availabilities.sort_by(|a, b| {
        (
            a.category.as_str(),
            a.type_name.as_str(),
            a.course_title.as_str(),
            a.location_id,
        )
            .cmp(&(
                b.category.as_str(),
                b.type_name.as_str(),
                b.course_title.as_str(),
                b.location_id,
            ))
    });
}
