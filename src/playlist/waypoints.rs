use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::models::{Coordinate, RouteStep};
use crate::services::Geocoder;

/// Nominatim asks clients to keep request bursts small
const MAX_CONCURRENT_LOOKUPS: usize = 4;

/// Turn route steps into an ordered list of place labels anchored by the trip's
/// start and end.
///
/// Steps without instructions are skipped. Remaining steps are reverse geocoded
/// concurrently, at most `MAX_CONCURRENT_LOOKUPS` at a time; lookups that yield nothing are dropped. Labels keep the
/// order of their steps no matter which lookup finishes first, repeated neighbours
/// are collapsed, and `start_label`/`end_label` are added at the ends unless the
/// first/last label already contains them (ignoring case).
pub async fn extract_waypoints<F, Fut>(
    steps: &[RouteStep],
    reverse_geocode: F,
    start_label: &str,
    end_label: &str,
) -> Vec<String>
where
    F: Fn(Coordinate) -> Fut,
    Fut: Future<Output = Option<String>>,
{
    let usable: Vec<&RouteStep> = steps
        .iter()
        .filter(|step| !step.instruction.trim().is_empty())
        .collect();

    // buffered hands results back in input order, one slot per step
    let slots: Vec<Option<String>> = futures::stream::iter(&usable)
        .map(|step| reverse_geocode(step.coordinate))
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;

    let resolved = slots.iter().filter(|slot| slot.is_some()).count();
    debug!(
        steps = steps.len(),
        usable = usable.len(),
        resolved,
        "reverse geocoded route steps"
    );

    let labels = collapse_repeats(slots.into_iter().flatten());
    anchor_endpoints(labels, start_label, end_label)
}

/// `extract_waypoints` against a geocoding service, with a time limit per lookup.
/// Failed or timed out lookups count as "no label" for that step.
pub async fn extract_route_waypoints(
    steps: &[RouteStep],
    geocoder: &dyn Geocoder,
    start_label: &str,
    end_label: &str,
    timeout: Duration,
) -> Vec<String> {
    let lookup = move |coordinate: Coordinate| async move {
        match tokio::time::timeout(timeout, geocoder.reverse_geocode(coordinate)).await {
            Ok(Ok(label)) => label,
            Ok(Err(e)) => {
                warn!(?coordinate, error = %e, "reverse geocoding failed, dropping step");
                None
            }
            Err(_) => {
                warn!(?coordinate, "reverse geocoding timed out, dropping step");
                None
            }
        }
    };

    let waypoints = extract_waypoints(steps, lookup, start_label, end_label).await;
    info!(count = waypoints.len(), "extracted waypoints");
    waypoints
}

/// Drop labels equal to the one right before them
pub fn collapse_repeats(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for label in labels {
        if unique.last() != Some(&label) {
            unique.push(label);
        }
    }
    unique
}

fn anchor_endpoints(mut labels: Vec<String>, start_label: &str, end_label: &str) -> Vec<String> {
    let needs_start = match labels.first() {
        Some(first) => !contains_ignore_case(first, start_label),
        None => !start_label.trim().is_empty(),
    };
    if needs_start {
        labels.insert(0, start_label.to_string());
    }

    let needs_end = match labels.last() {
        Some(last) => !contains_ignore_case(last, end_label),
        None => !end_label.trim().is_empty(),
    };
    if needs_end {
        labels.push(end_label.to_string());
    }

    labels
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
