//! Read-side queries over a published co-visitation graph.
//!
//! Every function here takes a borrowed graph snapshot plus the destination
//! catalog and never mutates either, so any number of queries can run
//! concurrently against the same snapshot.

pub mod day;
pub mod itinerary;
pub mod next;

#[cfg(test)]
pub(crate) mod test_support;

pub use day::{suggest_complete_day, DayOptions};
pub use itinerary::{combined_score, optimize_itinerary, ItineraryOptions};
pub use next::{rank_successors, suggest_next_places, SuggestOptions};
