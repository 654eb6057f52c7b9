//! Plain-text presentation of a plan

use crate::models::{Query, RankedResult, Route};
use crate::planner::PlanResult;

/// Short natural-language summary: count, best option, cheapest and fastest
#[must_use]
pub fn describe(plan: &PlanResult, query: &Query) -> String {
    let trip = format!(
        "{} to {} on {}",
        query.origin,
        query.destination,
        query.date.format("%Y-%m-%d")
    );

    let Some(best) = plan.best() else {
        let reason = plan
            .metadata
            .diagnosis()
            .unwrap_or_else(|| "No routes matched.".to_string());
        return format!("No routes found from {trip}. {reason}");
    };

    let mut summary = format!(
        "Found {} {} from {}. Best option: {}.",
        plan.metadata.routes_ranked,
        plural(plan.metadata.routes_ranked, "route", "routes"),
        trip,
        sentence(&best.route)
    );

    let cheapest = plan
        .candidates
        .iter()
        .min_by(|a, b| a.price.total_cmp(&b.price));
    if let Some(cheapest) = cheapest.filter(|r| *r != &best.route && r.price < best.route.price) {
        summary.push_str(&format!(" Cheapest: {}.", sentence(cheapest)));
    }

    let fastest = plan
        .candidates
        .iter()
        .min_by(|a, b| a.duration_hours.total_cmp(&b.duration_hours));
    if let Some(fastest) =
        fastest.filter(|r| *r != &best.route && r.duration_hours < best.route.duration_hours)
    {
        summary.push_str(&format!(" Fastest: {}.", sentence(fastest)));
    }

    if !plan.metadata.provider_errors.is_empty() {
        let failed = plan
            .metadata
            .provider_errors
            .iter()
            .map(|f| f.provider.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!(" Some providers were unavailable: {failed}."));
    }

    summary
}

/// Numbered list, one line per ranked route
#[must_use]
pub fn format_results(results: &[RankedResult]) -> String {
    if results.is_empty() {
        return "No routes found.".to_string();
    }

    results
        .iter()
        .map(|result| {
            let route = &result.route;
            let via = if route.via.is_empty() {
                String::new()
            } else {
                format!(" via {}", route.via.join(", "))
            };
            format!(
                "{}. {} • {} • {:.2}€ • {} • {}{} • Bags: {} • score {:.2}",
                result.rank,
                title_case(route.mode.as_str()),
                route.carrier,
                route.price,
                format_duration(route.duration_hours),
                connections(route.connections),
                via,
                bags(route),
                result.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hours as `h:mm`
#[must_use]
pub fn format_duration(hours: f64) -> String {
    let minutes = (hours * 60.0).round().max(0.0) as u64;
    format!("{}:{:02}h", minutes / 60, minutes % 60)
}

fn sentence(route: &Route) -> String {
    format!(
        "{} with {} for {:.2}€, {}, {}",
        route.mode,
        route.carrier,
        route.price,
        format_duration(route.duration_hours),
        connections(route.connections)
    )
}

fn connections(count: u32) -> String {
    match count {
        0 => "direct".to_string(),
        1 => "1 connection".to_string(),
        n => format!("{n} connections"),
    }
}

fn bags(route: &Route) -> String {
    if route.baggage.has_weight_limit() {
        format!(
            "{}x{}kg",
            route.baggage.checked_bags, route.baggage.per_bag_kg
        )
    } else {
        route.baggage.checked_bags.to_string()
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
