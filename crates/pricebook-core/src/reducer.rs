//! The pure state reducer.
//!
//! `apply` is total over the declared payload set: it never fails, never
//! performs I/O, and never suspends. Undecodable payloads are a codec
//! concern and never reach this module.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::event::{Event, EventPayload};
use crate::state::PricingState;

/// Applies one event to a state, producing the successor state.
///
/// The input state is left untouched; the returned state shares every map the
/// event did not modify.
#[must_use]
pub fn apply(state: &PricingState, event: &Event) -> PricingState {
    let mut next = state.clone();
    next.as_of_sequence = event.sequence_number;

    match &event.payload {
        EventPayload::MarkupUpdated { category, rate } => {
            let mut markups: BTreeMap<String, f64> = (*state.markups).clone();
            // Domain rule: a non-positive rate removes the entry rather than
            // storing a rate that could never be charged.
            if *rate > 0.0 {
                markups.insert(category.clone(), *rate);
            } else {
                markups.remove(category);
            }
            next.markups = Arc::new(markups);
        }
        EventPayload::BrandUpdated { code, name } => {
            let mut brands: BTreeMap<String, String> = (*state.brands).clone();
            brands.insert(code.clone(), name.clone());
            next.brands = Arc::new(brands);
        }
        EventPayload::DefaultMarkupSet { rate } => {
            next.default_markup = *rate;
        }
    }

    next
}

/// Folds an ordered event slice over a starting state.
#[must_use]
pub fn replay<'a, I>(state: &PricingState, events: I) -> PricingState
where
    I: IntoIterator<Item = &'a Event>,
{
    events
        .into_iter()
        .fold(state.clone(), |acc, event| apply(&acc, event))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use crate::event::{Event, EventPayload};
    use crate::reducer::{apply, replay};
    use crate::state::PricingState;

    fn event(sequence: i64, payload: EventPayload) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            partition_key: "pricing-0".to_owned(),
            sequence_number: sequence,
            payload,
            enqueued_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_apply_positive_markup_inserts_entry() {
        // Arrange
        let state = PricingState::empty();
        let ev = event(
            0,
            EventPayload::MarkupUpdated {
                category: "T-Shirt".to_owned(),
                rate: 3.0,
            },
        );

        // Act
        let next = apply(&state, &ev);

        // Assert
        assert_eq!(next.as_of_sequence, 0);
        assert_eq!(next.markups.get("T-Shirt"), Some(&3.0));
        assert_eq!(state.as_of_sequence, -1);
        assert!(state.markups.is_empty());
    }

    #[test]
    fn test_apply_non_positive_markup_removes_entry() {
        // Arrange
        let state = apply(
            &PricingState::empty(),
            &event(
                0,
                EventPayload::MarkupUpdated {
                    category: "T-Shirt".to_owned(),
                    rate: 3.0,
                },
            ),
        );

        // Act
        let next = apply(
            &state,
            &event(
                1,
                EventPayload::MarkupUpdated {
                    category: "T-Shirt".to_owned(),
                    rate: -1.0,
                },
            ),
        );

        // Assert
        assert_eq!(next.as_of_sequence, 1);
        assert!(!next.markups.contains_key("T-Shirt"));
        // The previous state is unaffected.
        assert_eq!(state.markups.get("T-Shirt"), Some(&3.0));
    }

    #[test]
    fn test_apply_zero_rate_also_removes_entry() {
        let state = apply(
            &PricingState::empty(),
            &event(
                0,
                EventPayload::MarkupUpdated {
                    category: "Jeans".to_owned(),
                    rate: 2.5,
                },
            ),
        );

        let next = apply(
            &state,
            &event(
                1,
                EventPayload::MarkupUpdated {
                    category: "Jeans".to_owned(),
                    rate: 0.0,
                },
            ),
        );

        assert!(!next.markups.contains_key("Jeans"));
    }

    #[test]
    fn test_apply_brand_update_upserts_name() {
        let state = PricingState::empty();

        let next = apply(
            &state,
            &event(
                0,
                EventPayload::BrandUpdated {
                    code: "ACME".to_owned(),
                    name: "Acme Apparel".to_owned(),
                },
            ),
        );
        let renamed = apply(
            &next,
            &event(
                1,
                EventPayload::BrandUpdated {
                    code: "ACME".to_owned(),
                    name: "Acme Apparel Co.".to_owned(),
                },
            ),
        );

        assert_eq!(next.brand_name("ACME"), Some("Acme Apparel"));
        assert_eq!(renamed.brand_name("ACME"), Some("Acme Apparel Co."));
    }

    #[test]
    fn test_apply_default_markup_replaces_scalar_and_shares_maps() {
        let state = apply(
            &PricingState::empty(),
            &event(
                0,
                EventPayload::BrandUpdated {
                    code: "ACME".to_owned(),
                    name: "Acme Apparel".to_owned(),
                },
            ),
        );

        let next = apply(&state, &event(1, EventPayload::DefaultMarkupSet { rate: 1.2 }));

        assert_eq!(next.default_markup, 1.2);
        // Untouched maps are shared, not copied.
        assert!(std::sync::Arc::ptr_eq(&state.brands, &next.brands));
        assert!(std::sync::Arc::ptr_eq(&state.markups, &next.markups));
    }

    #[test]
    fn test_markup_for_falls_back_to_default() {
        let state = apply(
            &PricingState::empty(),
            &event(0, EventPayload::DefaultMarkupSet { rate: 1.5 }),
        );

        assert_eq!(state.markup_for("Unlisted"), 1.5);
    }

    #[test]
    fn test_replay_is_deterministic() {
        // Arrange
        let events = vec![
            event(
                0,
                EventPayload::MarkupUpdated {
                    category: "T-Shirt".to_owned(),
                    rate: 3.0,
                },
            ),
            event(
                1,
                EventPayload::BrandUpdated {
                    code: "ACME".to_owned(),
                    name: "Acme Apparel".to_owned(),
                },
            ),
            event(2, EventPayload::DefaultMarkupSet { rate: 1.1 }),
            event(
                3,
                EventPayload::MarkupUpdated {
                    category: "T-Shirt".to_owned(),
                    rate: -1.0,
                },
            ),
        ];

        // Act
        let first = replay(&PricingState::empty(), &events);
        let second = replay(&PricingState::empty(), &events);

        // Assert
        assert_eq!(first, second);
        assert_eq!(first.as_of_sequence, 3);
        assert!(!first.markups.contains_key("T-Shirt"));
    }

    #[test]
    fn test_replay_from_midpoint_matches_full_replay() {
        let events: Vec<Event> = (0..10)
            .map(|n| {
                event(
                    n,
                    EventPayload::MarkupUpdated {
                        category: format!("cat-{}", n % 3),
                        rate: (n as f64) + 0.5,
                    },
                )
            })
            .collect();

        let full = replay(&PricingState::empty(), &events);
        let midpoint = replay(&PricingState::empty(), &events[..6]);
        let resumed = replay(&midpoint, &events[6..]);

        assert_eq!(full, resumed);
    }
}
