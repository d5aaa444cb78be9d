// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitoring filter validation.
//!
//! | Filter                 | Requirements                                     |
//! |------------------------|--------------------------------------------------|
//! | data change, none      | Value attribute                                  |
//! | data change, absolute  | Value of a variable with a Number data type      |
//! | data change, percent   | as absolute, plus an EURange property            |
//! | aggregate              | Value attribute, supported aggregate function    |
//! | event                  | EventNotifier attribute, known event type        |

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uanode_core::ids::{data_types, object_types};
use uanode_core::{AttributeId, FilterError, NodeClass, Range};

use crate::event::Event;
use crate::external::{AggregateRegistry, TypeTree};
use crate::node::{HasValue, Node};
use crate::service::{DeadbandType, EventFilter, MonitoringFilter, MonitoringFilterResult};

/// A validated filter with the values derived while validating it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedFilter {
    /// The filter with revised values.
    pub filter: Option<MonitoringFilter>,
    /// EURange of the variable for percent deadbands.
    pub eu_range: Option<Range>,
    /// Revised values reported to the client.
    pub result: Option<MonitoringFilterResult>,
}

/// Inputs to filter validation that come from the item request.
#[derive(Debug, Clone, Copy)]
pub struct FilterRequest<'a> {
    /// Requested filter.
    pub filter: Option<&'a MonitoringFilter>,
    /// Monitored attribute.
    pub attribute_id: AttributeId,
    /// Revised sampling interval in ms.
    pub sampling_interval: f64,
    /// Revised queue size.
    pub queue_size: u32,
}

/// Earliest start of an aggregate window of `window_ms` ending now.
///
/// Windows reaching past the representable range start at `MIN_UTC`.
fn window_start(window_ms: f64) -> DateTime<Utc> {
    ChronoDuration::try_milliseconds(window_ms.min(i64::MAX as f64) as i64)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Validates and revises a monitoring filter.
///
/// `eu_range` is the value of the variable's EURange property, if it has one.
pub fn validate_monitoring_filter(
    request: FilterRequest<'_>,
    node: &Node,
    eu_range: Option<Range>,
    type_tree: &dyn TypeTree,
    aggregates: &dyn AggregateRegistry,
) -> Result<ValidatedFilter, FilterError> {
    let Some(filter) = request.filter else {
        return Ok(ValidatedFilter::default());
    };

    match filter {
        MonitoringFilter::Event(event_filter) => {
            if request.attribute_id != AttributeId::EventNotifier {
                return Err(FilterError::not_allowed("event filter requires the EventNotifier attribute"));
            }
            if let Some(of_type) = &event_filter.of_type {
                if !type_tree.is_type_of(of_type, &object_types::BASE_EVENT_TYPE) {
                    return Err(FilterError::InvalidEventFilter {
                        reason: format!("{} is not an event type", of_type),
                    });
                }
            }
            Ok(ValidatedFilter {
                filter: Some(filter.clone()),
                ..ValidatedFilter::default()
            })
        }

        _ if request.attribute_id == AttributeId::EventNotifier => Err(FilterError::not_allowed(
            "data filters cannot be used on the EventNotifier attribute",
        )),

        MonitoringFilter::Aggregate(aggregate) => {
            if request.attribute_id != AttributeId::Value {
                return Err(FilterError::not_allowed("aggregate filter requires the Value attribute"));
            }
            if !aggregates.is_supported(&aggregate.aggregate_type) {
                return Err(FilterError::AggregateNotSupported {
                    aggregate: aggregate.aggregate_type.to_string(),
                });
            }

            let mut revised = aggregate.clone();
            revised.processing_interval = revised
                .processing_interval
                .max(request.sampling_interval)
                .max(aggregates.minimum_processing_interval());

            let window_ms = f64::from(request.queue_size.saturating_sub(1)) * revised.processing_interval;
            let earliest = window_start(window_ms);
            if revised.start_time < earliest {
                revised.start_time = earliest;
            }
            if revised.configuration.use_server_capabilities_defaults {
                revised.configuration = aggregates.default_configuration();
            }

            let result = MonitoringFilterResult::Aggregate {
                revised_start_time: revised.start_time,
                revised_processing_interval: revised.processing_interval,
                revised_configuration: revised.configuration.clone(),
            };
            Ok(ValidatedFilter {
                filter: Some(MonitoringFilter::Aggregate(revised)),
                eu_range: None,
                result: Some(result),
            })
        }

        MonitoringFilter::DataChange(data_change) => {
            if request.attribute_id != AttributeId::Value {
                return Err(FilterError::not_allowed("data change filter requires the Value attribute"));
            }
            if data_change.deadband_type == DeadbandType::None {
                return Ok(ValidatedFilter {
                    filter: Some(filter.clone()),
                    ..ValidatedFilter::default()
                });
            }

            if node.node_class() != NodeClass::Variable {
                return Err(FilterError::not_allowed("deadband requires a variable"));
            }
            let is_number = node
                .value_data_type()
                .map(|dt| type_tree.is_type_of(dt, &data_types::NUMBER))
                .unwrap_or(false);
            if !is_number {
                return Err(FilterError::not_allowed("deadband requires a numeric data type"));
            }
            if data_change.deadband_value < 0.0 {
                return Err(FilterError::not_allowed("deadband value must not be negative"));
            }

            if data_change.deadband_type == DeadbandType::Percent {
                let Some(range) = eu_range else {
                    return Err(FilterError::EuRangeMissing {
                        node_id: node.node_id().to_string(),
                    });
                };
                return Ok(ValidatedFilter {
                    filter: Some(filter.clone()),
                    eu_range: Some(range),
                    result: None,
                });
            }

            Ok(ValidatedFilter {
                filter: Some(filter.clone()),
                ..ValidatedFilter::default()
            })
        }
    }
}

/// Returns `true` if `event` passes the where part of `filter`.
pub fn event_matches(filter: Option<&EventFilter>, event: &Event, type_tree: &dyn TypeTree) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if let Some(of_type) = &filter.of_type {
        if !type_tree.is_type_of(&event.event_type, of_type) {
            return false;
        }
    }
    if let Some(min) = filter.min_severity {
        if event.severity < min {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{AggregateConfiguration, InMemoryAggregateRegistry, InMemoryTypeTree};
    use crate::service::{AggregateFilter, DataChangeFilter};
    use uanode_core::ids::aggregate_functions;
    use uanode_core::{NodeId, StatusCode};

    fn analog() -> Node {
        Node::variable(NodeId::numeric(2, 1), "2:Level", 10.0, data_types::DOUBLE)
    }

    fn request(filter: &MonitoringFilter) -> FilterRequest<'_> {
        FilterRequest {
            filter: Some(filter),
            attribute_id: AttributeId::Value,
            sampling_interval: 250.0,
            queue_size: 5,
        }
    }

    // ===== Deadband Tests =====

    #[test]
    fn test_percent_requires_eu_range() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::default();
        let filter = MonitoringFilter::DataChange(DataChangeFilter::percent(10.0));

        let err = validate_monitoring_filter(request(&filter), &analog(), None, &types, &aggregates)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BadMonitoredItemFilterUnsupported);

        let ok = validate_monitoring_filter(
            request(&filter),
            &analog(),
            Some(Range::new(0.0, 100.0)),
            &types,
            &aggregates,
        )
        .unwrap();
        assert_eq!(ok.eu_range, Some(Range::new(0.0, 100.0)));
    }

    #[test]
    fn test_deadband_requires_number() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::default();
        let node = Node::variable(NodeId::numeric(2, 2), "2:Name", "abc", data_types::STRING);
        let filter = MonitoringFilter::DataChange(DataChangeFilter::absolute(1.0));

        let err = validate_monitoring_filter(request(&filter), &node, None, &types, &aggregates)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BadFilterNotAllowed);
    }

    #[test]
    fn test_data_filter_on_non_value_attribute() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::default();
        let filter = MonitoringFilter::DataChange(DataChangeFilter::default());
        let mut req = request(&filter);
        req.attribute_id = AttributeId::DisplayName;

        let err = validate_monitoring_filter(req, &analog(), None, &types, &aggregates).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BadFilterNotAllowed);
    }

    // ===== Aggregate Tests =====

    #[test]
    fn test_aggregate_revision() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::default().with_minimum_processing_interval(500.0);
        let filter = MonitoringFilter::Aggregate(AggregateFilter {
            aggregate_type: aggregate_functions::AVERAGE,
            start_time: Utc::now() - ChronoDuration::hours(1),
            processing_interval: 100.0,
            configuration: AggregateConfiguration::default(),
        });

        let validated =
            validate_monitoring_filter(request(&filter), &analog(), None, &types, &aggregates).unwrap();
        let Some(MonitoringFilterResult::Aggregate {
            revised_start_time,
            revised_processing_interval,
            ..
        }) = validated.result
        else {
            panic!("aggregate result expected");
        };
        assert_eq!(revised_processing_interval, 500.0);
        // (5 - 1) * 500 ms window.
        assert!(revised_start_time >= Utc::now() - ChronoDuration::milliseconds(2_100));
    }

    #[test]
    fn test_aggregate_huge_window_keeps_start() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::default();
        let start_time = Utc::now() - ChronoDuration::days(30);
        let filter = MonitoringFilter::Aggregate(AggregateFilter {
            aggregate_type: aggregate_functions::AVERAGE,
            start_time,
            processing_interval: 1.0e13,
            configuration: AggregateConfiguration::default(),
        });
        let mut req = request(&filter);
        req.queue_size = 1000;

        let validated = validate_monitoring_filter(req, &analog(), None, &types, &aggregates).unwrap();
        let Some(MonitoringFilterResult::Aggregate { revised_start_time, .. }) = validated.result else {
            panic!("aggregate result expected");
        };
        assert_eq!(revised_start_time, start_time);
    }

    #[test]
    fn test_window_start_saturates() {
        assert_eq!(window_start(f64::MAX), DateTime::<Utc>::MIN_UTC);
        assert!(window_start(1_000.0) < Utc::now());
    }

    #[test]
    fn test_unsupported_aggregate() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::empty();
        let filter = MonitoringFilter::Aggregate(AggregateFilter {
            aggregate_type: aggregate_functions::COUNT,
            start_time: Utc::now(),
            processing_interval: 1000.0,
            configuration: AggregateConfiguration::default(),
        });

        let err = validate_monitoring_filter(request(&filter), &analog(), None, &types, &aggregates)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BadAggregateNotSupported);
    }

    // ===== Event Filter Tests =====

    #[test]
    fn test_event_filter_rules() {
        let types = InMemoryTypeTree::with_standard_types();
        let aggregates = InMemoryAggregateRegistry::default();
        let filter = MonitoringFilter::Event(EventFilter {
            of_type: Some(data_types::DOUBLE),
            ..EventFilter::standard()
        });
        let mut req = request(&filter);
        req.attribute_id = AttributeId::EventNotifier;

        let err = validate_monitoring_filter(req, &analog(), None, &types, &aggregates).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BadEventFilterInvalid);

        let event = Event::new(object_types::AUDIT_WRITE_UPDATE_EVENT_TYPE, NodeId::numeric(2, 1), "w");
        let audit_only = EventFilter {
            of_type: Some(object_types::AUDIT_EVENT_TYPE),
            ..EventFilter::default()
        };
        assert!(event_matches(Some(&audit_only), &event, &types));
        let low = Event::new(object_types::BASE_EVENT_TYPE, NodeId::numeric(2, 1), "x").with_severity(10);
        assert!(!event_matches(Some(&audit_only), &low, &types));
    }
}
