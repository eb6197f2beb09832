//! Stage 9: event ordering.

use crate::models::Event;

/// Event ids sorted by `order`, stable on ties.
///
/// Placeholder for a real temporal ordering that would weigh temporal evidence
/// and causal connectives. Until then this is the assembly order.
pub fn order_events(events: &[Event]) -> Vec<String> {
    let mut indexed: Vec<&Event> = events.iter().collect();
    indexed.sort_by_key(|e| e.order);
    indexed.into_iter().map(|e| e.id.clone()).collect()
}
