//! Declarative filter rules for selecting the training pool
//!
//! Filters are data, not code: a [`FilterSet`] maps a parameter name to one
//! [`FilterRule`] from a closed set (equality, inclusive range, set
//! membership). A flight is admitted only when every rule holds for its
//! parameter row.
//!
//! # Rule syntax
//!
//! Rules can be written as text, which is what the CLI `--filter` flag accepts:
//!
//! - `payload=500` - equality
//! - `payload>=0`, `payload<=750` - half-open range
//! - `payload=250..750`, `payload=..500` - inclusive range
//! - `route=R1,R2` - set membership

use crate::error::{ForecastError, Result};
use crate::types::{FlightRecord, ParamValue};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One comparison applied to a single parameter value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "rule", content = "value", rename_all = "snake_case")
)]
pub enum FilterRule {
    Equals(ParamValue),
    /// Inclusive bounds; `None` leaves that side open
    Range { min: Option<f64>, max: Option<f64> },
    OneOf(Vec<ParamValue>),
}

impl FilterRule {
    pub fn at_least(min: f64) -> Self {
        FilterRule::Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        FilterRule::Range {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        FilterRule::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Check a parameter value against this rule
    pub fn matches(&self, value: &ParamValue) -> bool {
        match self {
            FilterRule::Equals(expected) => values_equal(expected, value),
            FilterRule::Range { min, max } => match value.as_number() {
                Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
                None => false,
            },
            FilterRule::OneOf(options) => options.iter().any(|o| values_equal(o, value)),
        }
    }
}

fn values_equal(a: &ParamValue, b: &ParamValue) -> bool {
    match (a, b) {
        (ParamValue::Number(x), ParamValue::Number(y)) => x == y,
        (ParamValue::Text(x), ParamValue::Text(y)) => x == y,
        _ => false,
    }
}

fn rule_regex() -> Result<&'static Regex> {
    static RULE: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = RULE.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_\-]*)\s*(>=|<=|=)\s*(\S(?:.*\S)?)\s*$")
        .map_err(|err| ForecastError::InvalidFilter(format!("rule pattern: {}", err)))?;
    Ok(RULE.get_or_init(|| pattern))
}

fn parse_bound(text: &str, rule: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| ForecastError::InvalidFilter(format!("'{}': '{}' is not a number", rule, text)))
}

/// Parse one textual rule into its parameter name and rule
pub fn parse_rule(text: &str) -> Result<(String, FilterRule)> {
    let caps = rule_regex()?
        .captures(text)
        .ok_or_else(|| ForecastError::InvalidFilter(format!("'{}': expected NAME=VALUE, NAME>=N or NAME<=N", text)))?;

    let name = caps[1].to_string();
    let op = &caps[2];
    let value = &caps[3];

    let rule = match op {
        ">=" => parse_bound(value, text)?
            .map(FilterRule::at_least)
            .ok_or_else(|| ForecastError::InvalidFilter(format!("'{}': missing bound", text)))?,
        "<=" => parse_bound(value, text)?
            .map(FilterRule::at_most)
            .ok_or_else(|| ForecastError::InvalidFilter(format!("'{}': missing bound", text)))?,
        _ => {
            if let Some((lo, hi)) = value.split_once("..") {
                let min = parse_bound(lo, text)?;
                let max = parse_bound(hi, text)?;
                if min.is_none() && max.is_none() {
                    return Err(ForecastError::InvalidFilter(format!("'{}': range has no bounds", text)));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(ForecastError::InvalidFilter(format!(
                            "'{}': lower bound {} exceeds upper bound {}",
                            text, lo, hi
                        )));
                    }
                }
                FilterRule::Range { min, max }
            } else if value.contains(',') {
                let options: Vec<ParamValue> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ParamValue::parse)
                    .collect();
                FilterRule::OneOf(options)
            } else {
                FilterRule::Equals(ParamValue::parse(value))
            }
        }
    };

    Ok((name, rule))
}

/// Parameter name → rule; the empty set admits every flight
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FilterSet {
    rules: BTreeMap<String, FilterRule>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, parameter: impl Into<String>, rule: FilterRule) -> Self {
        self.insert(parameter, rule);
        self
    }

    /// Add or replace the rule for a parameter
    pub fn insert(&mut self, parameter: impl Into<String>, rule: FilterRule) {
        self.rules.insert(parameter.into(), rule);
    }

    /// Parse textual rules; a later rule for the same parameter wins
    pub fn parse<'a, I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = FilterSet::new();
        for text in rules {
            let (name, rule) = parse_rule(text)?;
            set.insert(name, rule);
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterRule)> {
        self.rules.iter()
    }

    /// Decide whether a flight is admitted.
    ///
    /// A flight without a parameter row is admitted by every filter. A flight
    /// whose row lacks a referenced parameter cannot be judged and yields
    /// `UnresolvablePredicate`.
    pub fn admits(&self, flight: &FlightRecord) -> Result<bool> {
        let Some(parameters) = flight.parameters() else {
            return Ok(true);
        };

        for (name, rule) in &self.rules {
            let value = parameters
                .get(name)
                .ok_or_else(|| ForecastError::UnresolvablePredicate {
                    flight_id: flight.id(),
                    parameter: name.clone(),
                })?;
            if !rule.matches(value) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}
