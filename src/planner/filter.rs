//! Filter Stage
//!
//! Applies the query's hard constraints to the aggregated routes. A route is
//! dropped only for an explicit violation: when a route lacks the data a
//! constraint needs (no timestamp, unknown bag weight) it passes that check.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Query, Route, TimeWindow, TransportMode};

/// A hard constraint a query can impose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    MaxConnections,
    RequiredBags,
    MinBagWeight,
    MinPrice,
    MaxPrice,
    MaxDuration,
    DepartureWindow,
    ArrivalWindow,
    Mode,
    PreferredCarrier,
    ExcludedCarrier,
}

impl Constraint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Constraint::MaxConnections => "max connections",
            Constraint::RequiredBags => "required bags",
            Constraint::MinBagWeight => "minimum bag weight",
            Constraint::MinPrice => "min price",
            Constraint::MaxPrice => "max price",
            Constraint::MaxDuration => "max duration",
            Constraint::DepartureWindow => "departure window",
            Constraint::ArrivalWindow => "arrival window",
            Constraint::Mode => "transport mode",
            Constraint::PreferredCarrier => "preferred carrier",
            Constraint::ExcludedCarrier => "excluded carrier",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed constraint check, with the values that failed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum Violation {
    TooManyConnections { connections: u32, max: u32 },
    NotEnoughBags { checked_bags: u32, required: u32 },
    BagWeightTooLow { per_bag_kg: f64, min: f64 },
    BelowMinimumPrice { price: f64, min: f64 },
    OverBudget { price: f64, max: f64 },
    TooLong { duration_hours: f64, max: f64 },
    DepartureOutsideWindow { departure: NaiveTime, window: TimeWindow },
    ArrivalOutsideWindow { arrival: NaiveTime, window: TimeWindow },
    ModeNotAllowed { mode: TransportMode },
    CarrierNotPreferred { carrier: String },
    CarrierExcluded { carrier: String },
}

impl Violation {
    #[must_use]
    pub fn constraint(&self) -> Constraint {
        match self {
            Violation::TooManyConnections { .. } => Constraint::MaxConnections,
            Violation::NotEnoughBags { .. } => Constraint::RequiredBags,
            Violation::BagWeightTooLow { .. } => Constraint::MinBagWeight,
            Violation::BelowMinimumPrice { .. } => Constraint::MinPrice,
            Violation::OverBudget { .. } => Constraint::MaxPrice,
            Violation::TooLong { .. } => Constraint::MaxDuration,
            Violation::DepartureOutsideWindow { .. } => Constraint::DepartureWindow,
            Violation::ArrivalOutsideWindow { .. } => Constraint::ArrivalWindow,
            Violation::ModeNotAllowed { .. } => Constraint::Mode,
            Violation::CarrierNotPreferred { .. } => Constraint::PreferredCarrier,
            Violation::CarrierExcluded { .. } => Constraint::ExcludedCarrier,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TooManyConnections { connections, max } => {
                write!(f, "{connections} connections exceeds the limit of {max}")
            }
            Violation::NotEnoughBags {
                checked_bags,
                required,
            } => write!(f, "{checked_bags} checked bags, {required} required"),
            Violation::BagWeightTooLow { per_bag_kg, min } => {
                write!(f, "{per_bag_kg}kg per bag, at least {min}kg required")
            }
            Violation::BelowMinimumPrice { price, min } => {
                write!(f, "price {price:.2}€ is below the minimum of {min:.2}€")
            }
            Violation::OverBudget { price, max } => {
                write!(f, "price {price:.2}€ exceeds budget of {max:.2}€")
            }
            Violation::TooLong {
                duration_hours,
                max,
            } => write!(f, "{duration_hours:.2}h exceeds limit of {max:.2}h"),
            Violation::DepartureOutsideWindow { departure, window } => write!(
                f,
                "departs {} outside {}-{}",
                departure.format("%H:%M"),
                window.start.format("%H:%M"),
                window.end.format("%H:%M")
            ),
            Violation::ArrivalOutsideWindow { arrival, window } => write!(
                f,
                "arrives {} outside {}-{}",
                arrival.format("%H:%M"),
                window.start.format("%H:%M"),
                window.end.format("%H:%M")
            ),
            Violation::ModeNotAllowed { mode } => write!(f, "mode {mode} not allowed"),
            Violation::CarrierNotPreferred { carrier } => {
                write!(f, "carrier {carrier} is not a preferred carrier")
            }
            Violation::CarrierExcluded { carrier } => write!(f, "carrier {carrier} is excluded"),
        }
    }
}

/// A route excluded by the filter, with every constraint it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRoute {
    pub route: Route,
    pub violations: Vec<Violation>,
}

/// Per-constraint drop counts. A route failing several constraints counts
/// once under each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub kept: usize,
    pub dropped: usize,
    pub drops_by_constraint: BTreeMap<Constraint, usize>,
}

/// Routes split into survivors and rejects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<Route>,
    pub dropped: Vec<DroppedRoute>,
}

impl FilterOutcome {
    #[must_use]
    pub fn report(&self) -> FilterReport {
        let mut drops_by_constraint = BTreeMap::new();
        for dropped in &self.dropped {
            for violation in &dropped.violations {
                *drops_by_constraint
                    .entry(violation.constraint())
                    .or_insert(0) += 1;
            }
        }

        FilterReport {
            kept: self.kept.len(),
            dropped: self.dropped.len(),
            drops_by_constraint,
        }
    }
}

/// Routes satisfying every hard constraint of the query
#[must_use]
pub fn filter(routes: &[Route], query: &Query) -> Vec<Route> {
    apply(routes, query).kept
}

/// Split routes into those satisfying the query and those violating it.
/// Input order is preserved on both sides.
#[must_use]
pub fn apply(routes: &[Route], query: &Query) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for route in routes {
        let violations = violations(route, query);
        if violations.is_empty() {
            outcome.kept.push(route.clone());
        } else {
            debug!(
                "Dropping {}: {}",
                route.label(),
                violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            );
            outcome.dropped.push(DroppedRoute {
                route: route.clone(),
                violations,
            });
        }
    }

    info!(
        "Filtering kept {} of {} routes",
        outcome.kept.len(),
        routes.len()
    );
    outcome
}

/// Every hard constraint the route violates; empty when it satisfies all of them
#[must_use]
pub fn violations(route: &Route, query: &Query) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Some(max) = query.max_connections {
        if route.connections > max {
            violations.push(Violation::TooManyConnections {
                connections: route.connections,
                max,
            });
        }
    }

    if route.baggage.checked_bags < query.required_bags {
        violations.push(Violation::NotEnoughBags {
            checked_bags: route.baggage.checked_bags,
            required: query.required_bags,
        });
    }

    // Zero per-bag weight means the provider did not say
    if let Some(min) = query.min_bag_weight_kg {
        if route.baggage.has_weight_limit() && route.baggage.per_bag_kg < min {
            violations.push(Violation::BagWeightTooLow {
                per_bag_kg: route.baggage.per_bag_kg,
                min,
            });
        }
    }

    if let Some(min) = query.min_price {
        if route.price < min {
            violations.push(Violation::BelowMinimumPrice {
                price: route.price,
                min,
            });
        }
    }

    if let Some(max) = query.max_price {
        if route.price > max {
            violations.push(Violation::OverBudget {
                price: route.price,
                max,
            });
        }
    }

    if let Some(max) = query.max_duration_hours {
        if route.duration_hours > max {
            violations.push(Violation::TooLong {
                duration_hours: route.duration_hours,
                max,
            });
        }
    }

    if let (Some(window), Some(departure)) = (query.departure_window, route.departure_time) {
        if !window.contains(departure.time()) {
            violations.push(Violation::DepartureOutsideWindow {
                departure: departure.time(),
                window,
            });
        }
    }

    if let (Some(window), Some(arrival)) = (query.arrival_window, route.arrival_time) {
        if !window.contains(arrival.time()) {
            violations.push(Violation::ArrivalOutsideWindow {
                arrival: arrival.time(),
                window,
            });
        }
    }

    if !query.allows_mode(route.mode) {
        violations.push(Violation::ModeNotAllowed { mode: route.mode });
    }

    if !query.prefers_carrier(&route.carrier) {
        violations.push(Violation::CarrierNotPreferred {
            carrier: route.carrier.clone(),
        });
    }

    if query.excludes_carrier(&route.carrier) {
        violations.push(Violation::CarrierExcluded {
            carrier: route.carrier.clone(),
        });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Baggage, PlanOptions, ProviderKind};
    use chrono::NaiveDate;
    use rstest::rstest;

    fn route(mode: TransportMode, price: f64, hours: f64, connections: u32, bags: u32) -> Route {
        Route {
            origin: "Stuttgart".to_string(),
            destination: "Vienna".to_string(),
            mode,
            carrier: "Test".to_string(),
            price,
            duration_hours: hours,
            connections,
            baggage: Baggage::new(bags, 23.0),
            departure_time: None,
            arrival_time: None,
            via: vec![],
            provider_source: ProviderKind::Mock,
        }
    }

    fn query(options: PlanOptions) -> Query {
        Query::from_options("Stuttgart", "Vienna", "2025-10-01", &options).unwrap()
    }

    fn at(hour: u32, minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_reference_scenario_drops_bus() {
        let routes = vec![
            route(TransportMode::Flight, 180.0, 1.25, 0, 2),
            route(TransportMode::Bus, 40.0, 14.0, 2, 1),
        ];
        let q = query(PlanOptions {
            max_connections: Some(1),
            required_bags: 1,
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert_eq!(outcome.kept, vec![routes[0].clone()]);
        assert_eq!(
            outcome.dropped[0].violations,
            vec![Violation::TooManyConnections {
                connections: 2,
                max: 1
            }]
        );
    }

    #[test]
    fn test_unbounded_query_keeps_everything() {
        let routes = vec![
            route(TransportMode::Flight, 180.0, 1.25, 5, 0),
            route(TransportMode::Bus, 40.0, 14.0, 2, 0),
        ];
        let q = query(PlanOptions::default());
        assert_eq!(filter(&routes, &q), routes);
    }

    #[rstest]
    #[case(0, 0, true)]
    #[case(1, 1, true)]
    #[case(2, 1, false)]
    #[case(0, 3, false)]
    fn test_connections_and_bags(
        #[case] connections: u32,
        #[case] required_bags: u32,
        #[case] kept: bool,
    ) {
        let routes = vec![route(TransportMode::Train, 50.0, 3.0, connections, 2)];
        let q = query(PlanOptions {
            max_connections: Some(1),
            required_bags,
            ..PlanOptions::default()
        });
        assert_eq!(filter(&routes, &q).len() == 1, kept);
    }

    #[test]
    fn test_unknown_bag_weight_is_permissive() {
        let mut unknown = route(TransportMode::Bus, 20.0, 5.0, 0, 1);
        unknown.baggage = Baggage::new(1, 0.0);
        let mut light = route(TransportMode::Bus, 20.0, 5.0, 0, 1);
        light.baggage = Baggage::new(1, 15.0);

        let q = query(PlanOptions {
            min_bag_weight_kg: Some(20.0),
            ..PlanOptions::default()
        });
        let outcome = apply(&[unknown.clone(), light], &q);
        assert_eq!(outcome.kept, vec![unknown]);
        assert_eq!(
            outcome.report().drops_by_constraint.get(&Constraint::MinBagWeight),
            Some(&1)
        );
    }

    #[test]
    fn test_price_and_duration_limits() {
        let routes = vec![
            route(TransportMode::Flight, 300.0, 1.0, 0, 1),
            route(TransportMode::Train, 90.0, 9.0, 0, 1),
            route(TransportMode::Train, 90.0, 4.0, 0, 1),
        ];
        let q = query(PlanOptions {
            max_price: Some(100.0),
            max_duration_hours: Some(8.0),
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert_eq!(outcome.kept, vec![routes[2].clone()]);

        let report = outcome.report();
        assert_eq!(report.kept, 1);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.drops_by_constraint[&Constraint::MaxPrice], 1);
        assert_eq!(report.drops_by_constraint[&Constraint::MaxDuration], 1);
    }

    #[test]
    fn test_time_windows_skip_routes_without_timestamps() {
        let mut early = route(TransportMode::Train, 50.0, 3.0, 0, 1);
        early.departure_time = Some(at(5, 30));
        let mut midday = route(TransportMode::Train, 50.0, 3.0, 0, 1);
        midday.departure_time = Some(at(11, 0));
        midday.arrival_time = Some(at(14, 0));
        let untimed = route(TransportMode::Train, 50.0, 3.0, 0, 1);

        let q = query(PlanOptions {
            departure_window: Some(TimeWindow::new(t(6, 0), t(12, 0))),
            arrival_window: Some(TimeWindow::new(t(13, 0), t(23, 0))),
            ..PlanOptions::default()
        });

        let outcome = apply(&[early, midday.clone(), untimed.clone()], &q);
        assert_eq!(outcome.kept, vec![midday, untimed]);
        assert_eq!(
            outcome.dropped[0].violations[0].constraint(),
            Constraint::DepartureWindow
        );
    }

    #[test]
    fn test_mode_allow_list() {
        let routes = vec![
            route(TransportMode::Flight, 100.0, 1.0, 0, 1),
            route(TransportMode::Train, 100.0, 5.0, 0, 1),
        ];
        let q = query(PlanOptions {
            modes: vec![TransportMode::Train],
            ..PlanOptions::default()
        });
        let kept = filter(&routes, &q);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].mode, TransportMode::Train);
    }

    fn carrier_route(carrier: &str, price: f64) -> Route {
        let mut route = route(TransportMode::Flight, price, 2.0, 0, 1);
        route.carrier = carrier.to_string();
        route
    }

    #[test]
    fn test_min_price_drops_cheaper_routes() {
        let routes = vec![carrier_route("Budget", 19.0), carrier_route("Standard", 80.0)];
        let q = query(PlanOptions {
            min_price: Some(20.0),
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert_eq!(outcome.kept, vec![routes[1].clone()]);
        assert_eq!(
            outcome.dropped[0].violations,
            vec![Violation::BelowMinimumPrice {
                price: 19.0,
                min: 20.0
            }]
        );
    }

    #[test]
    fn test_preferred_carriers_keep_only_matches() {
        let routes = vec![
            carrier_route("Mock Airlines", 180.0),
            carrier_route("Other Air", 120.0),
        ];
        let q = query(PlanOptions {
            preferred_carriers: vec!["mock airlines".to_string()],
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert_eq!(outcome.kept, vec![routes[0].clone()]);
        assert_eq!(
            outcome.report().drops_by_constraint.get(&Constraint::PreferredCarrier),
            Some(&1)
        );
    }

    #[test]
    fn test_excluded_carriers_are_dropped() {
        let routes = vec![
            carrier_route("Mock Airlines", 180.0),
            carrier_route("Mock Coaches", 40.0),
        ];
        let q = query(PlanOptions {
            excluded_carriers: vec![" MOCK COACHES ".to_string()],
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert_eq!(outcome.kept, vec![routes[0].clone()]);
        assert_eq!(
            outcome.dropped[0].violations,
            vec![Violation::CarrierExcluded {
                carrier: "Mock Coaches".to_string()
            }]
        );
        assert_eq!(
            outcome.dropped[0].violations[0].to_string(),
            "carrier Mock Coaches is excluded"
        );
    }

    #[test]
    fn test_every_violation_is_reported() {
        let routes = vec![route(TransportMode::Bus, 500.0, 30.0, 4, 0)];
        let q = query(PlanOptions {
            max_connections: Some(1),
            required_bags: 1,
            max_price: Some(100.0),
            max_duration_hours: Some(10.0),
            modes: vec![TransportMode::Flight],
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.dropped[0].violations.len(), 5);
        assert_eq!(outcome.report().drops_by_constraint.len(), 5);
    }

    #[test]
    fn test_output_is_subset_and_partition_is_exact() {
        let routes: Vec<Route> = (0..12)
            .map(|i| {
                route(
                    TransportMode::Train,
                    20.0 * f64::from(i),
                    1.0 + f64::from(i),
                    i % 4,
                    i % 3,
                )
            })
            .collect();
        let q = query(PlanOptions {
            max_connections: Some(2),
            required_bags: 1,
            max_price: Some(150.0),
            ..PlanOptions::default()
        });

        let outcome = apply(&routes, &q);
        assert_eq!(outcome.kept.len() + outcome.dropped.len(), routes.len());
        for kept in &outcome.kept {
            assert!(routes.contains(kept));
            assert!(violations(kept, &q).is_empty());
        }
        for dropped in &outcome.dropped {
            assert!(!dropped.violations.is_empty());
        }
    }

    #[test]
    fn test_empty_input() {
        let q = query(PlanOptions::default());
        let outcome = apply(&[], &q);
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.report(), FilterReport::default());
    }

    #[test]
    fn test_violation_messages() {
        let violation = Violation::TooManyConnections {
            connections: 2,
            max: 1,
        };
        assert_eq!(violation.to_string(), "2 connections exceeds the limit of 1");
        assert_eq!(Constraint::MaxConnections.to_string(), "max connections");
    }
}
