//! Immutable, read-only catalog of customers, projects, metrics and reports.
//!
//! Constructed once from an already-decoded [`CobaltConfig`](crate::proto::cobalt::config::CobaltConfig)
//! and never mutated afterward; the registry *file format* is
//! explicitly out of scope, so this module starts
//! from the decoded proto rather than parsing anything itself.

use std::collections::HashMap;

use crate::proto::cobalt::config::{
    self as config_proto, AggregationType, CobaltConfig, MetricType, ReportType, TimeZonePolicy,
};
use crate::status::{Status, StatusCode};
use crate::types::AggregationWindow;

/// One declared event-code dimension of a metric.
#[derive(Debug, Clone)]
pub struct MetricDimension {
    pub max_event_code: u32,
    pub named_codes: HashMap<u32, String>,
}

/// RAPPOR privacy parameters for a single report.
#[derive(Debug, Clone)]
pub struct RapporParams {
    pub probability_p: f64,
    pub probability_q: f64,
    pub num_bloom_bits: u32,
    pub num_hashes: u32,
    pub num_cohorts: u32,
    pub categories: Vec<String>,
}

/// Forculus threshold-encryption parameters for a single report.
#[derive(Debug, Clone, Copy)]
pub struct ForculusParams {
    pub threshold: u32,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub id: u32,
    pub name: String,
    pub report_type: ReportType,
    pub aggregation_type: AggregationType,
    pub windows: Vec<AggregationWindow>,
    pub rappor: Option<RapporParams>,
    pub forculus: Option<ForculusParams>,
    pub noise_level: f64,
}

impl Report {
    /// Reports whose form is produced immediately at log time rather than
    /// by the EventAggregator's scheduled pass.
    pub fn is_immediate(&self) -> bool {
        matches!(
            self.report_type,
            ReportType::SimpleOccurrenceCount
                | ReportType::Histogram
                | ReportType::Forculus
                | ReportType::StringRappor
                | ReportType::BasicRappor
        )
    }

    /// Reports whose form accumulates into the local aggregate store and is
    /// emitted later by `EventAggregator::generate_observations`.
    pub fn is_local_aggregate(&self) -> bool {
        matches!(
            self.report_type,
            ReportType::UniqueNDayActives
                | ReportType::PerDeviceCount
                | ReportType::PerDeviceHistogram
                | ReportType::PerDeviceNumericStats
        )
    }
}

#[derive(Debug, Clone)]
pub struct Metric {
    pub id: u32,
    pub name: String,
    pub metric_type: MetricType,
    pub dimensions: Vec<MetricDimension>,
    pub time_zone_policy: TimeZonePolicy,
    pub reports: Vec<Report>,
    pub system_profile_fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: u32,
    pub name: String,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: u32,
    pub name: String,
    pub projects: Vec<Project>,
}

/// Selects a customer, project or metric by either its numeric id or name.
pub enum Selector<'a> {
    Id(u32),
    Name(&'a str),
}

impl<'a> From<u32> for Selector<'a> {
    fn from(id: u32) -> Self {
        Selector::Id(id)
    }
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(name: &'a str) -> Self {
        Selector::Name(name)
    }
}

/// The immutable catalog. Construction validates window bounds and reports
/// `InvalidConfig` rather than panicking on a malformed `CobaltConfig`.
pub struct Registry {
    customers: Vec<Customer>,
}

impl Registry {
    pub fn from_config(config: &CobaltConfig) -> Result<Self, Status> {
        let customers = config
            .customers
            .iter()
            .map(convert_customer)
            .collect::<Result<Vec<_>, Status>>()?;
        Ok(Self { customers })
    }

    pub fn get_customer<'a>(&self, selector: impl Into<Selector<'a>>) -> Result<&Customer, Status> {
        find(&self.customers, selector, |c| c.id, |c| &c.name)
    }

    pub fn get_project<'a>(
        &self,
        customer: &Customer,
        selector: impl Into<Selector<'a>>,
    ) -> Result<&Project, Status> {
        find(&customer.projects, selector, |p| p.id, |p| &p.name)
    }

    pub fn get_metric<'a>(
        &self,
        project: &Project,
        selector: impl Into<Selector<'a>>,
    ) -> Result<&Metric, Status> {
        find(&project.metrics, selector, |m| m.id, |m| &m.name)
    }

    pub fn iter_metrics<'a>(&self, project: &'a Project) -> impl Iterator<Item = &'a Metric> {
        project.metrics.iter()
    }

    pub fn iter_customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.iter()
    }

    /// Resolves a fully-qualified metric by id, for callers (the Logger)
    /// that only have the numeric customer/project/metric ids from a
    /// logging call.
    pub fn find_metric(&self, customer_id: u32, project_id: u32, metric_id: u32) -> Result<&Metric, Status> {
        let customer = self.get_customer(customer_id)?;
        let project = self.get_project(customer, project_id)?;
        self.get_metric(project, metric_id)
    }

    /// Resolves a fully-qualified report by id, for callers (the event
    /// aggregator's generation pass) that only have the numeric key stored
    /// alongside an aggregate and need the `Metric`/`Report` back out.
    pub fn find_report(
        &self,
        customer_id: u32,
        project_id: u32,
        metric_id: u32,
        report_id: u32,
    ) -> Result<(&Metric, &Report), Status> {
        let customer = self.get_customer(customer_id)?;
        let project = self.get_project(customer, project_id)?;
        let metric = self.get_metric(project, metric_id)?;
        let report = metric
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .ok_or_else(|| Status::new(StatusCode::NotFound, "no report matching id"))?;
        Ok((metric, report))
    }
}

fn find<'a, T>(
    items: &'a [T],
    selector: impl Into<Selector<'a>>,
    id_of: impl Fn(&T) -> u32,
    name_of: impl Fn(&T) -> &str,
) -> Result<&'a T, Status> {
    let selector = selector.into();
    let found = items.iter().find(|item| match &selector {
        Selector::Id(id) => id_of(item) == *id,
        Selector::Name(name) => name_of(item) == *name,
    });
    found.ok_or_else(|| Status::new(StatusCode::NotFound, "no entry matching selector"))
}

fn convert_customer(customer: &config_proto::CustomerConfig) -> Result<Customer, Status> {
    Ok(Customer {
        id: customer.customer_id,
        name: customer.customer_name.clone(),
        projects: customer
            .projects
            .iter()
            .map(convert_project)
            .collect::<Result<_, _>>()?,
    })
}

fn convert_project(project: &config_proto::ProjectConfig) -> Result<Project, Status> {
    Ok(Project {
        id: project.project_id,
        name: project.project_name.clone(),
        metrics: project
            .metrics
            .iter()
            .map(convert_metric)
            .collect::<Result<_, _>>()?,
    })
}

fn convert_metric(metric: &config_proto::MetricDefinition) -> Result<Metric, Status> {
    let metric_type = MetricType::try_from(metric.metric_type)
        .map_err(|_| Status::new(StatusCode::InvalidConfig, "unknown metric type"))?;
    let time_zone_policy = TimeZonePolicy::try_from(metric.time_zone_policy)
        .map_err(|_| Status::new(StatusCode::InvalidConfig, "unknown time zone policy"))?;
    Ok(Metric {
        id: metric.id,
        name: metric.name.clone(),
        metric_type,
        dimensions: metric
            .dimensions
            .iter()
            .map(|d| MetricDimension {
                max_event_code: d.max_event_code,
                named_codes: d.named_codes.clone(),
            })
            .collect(),
        time_zone_policy,
        reports: metric
            .reports
            .iter()
            .map(convert_report)
            .collect::<Result<_, _>>()?,
        system_profile_fields: metric.system_profile_fields.clone(),
    })
}

fn convert_report(report: &config_proto::ReportDefinition) -> Result<Report, Status> {
    let report_type = ReportType::try_from(report.report_type)
        .map_err(|_| Status::new(StatusCode::InvalidConfig, "unknown report type"))?;
    let aggregation_type = AggregationType::try_from(report.aggregation_type)
        .map_err(|_| Status::new(StatusCode::InvalidConfig, "unknown aggregation type"))?;
    // Range validation (spec's `AggregationWindowOutOfRange`) happens in the
    // AggregateStore, not here: an out-of-range window on one report must
    // not abort decoding of the whole registry, only that report's
    // generation/GC.
    let mut windows = report
        .windows
        .iter()
        .map(convert_window)
        .collect::<Result<Vec<_>, _>>()?;
    windows.sort();

    Ok(Report {
        id: report.id,
        name: report.name.clone(),
        report_type,
        aggregation_type,
        windows,
        rappor: report.rappor.as_ref().map(|r| RapporParams {
            probability_p: r.probability_p,
            probability_q: r.probability_q,
            num_bloom_bits: r.num_bloom_bits,
            num_hashes: r.num_hashes,
            num_cohorts: r.num_cohorts,
            categories: r.categories.clone(),
        }),
        forculus: report
            .forculus
            .as_ref()
            .map(|f| ForculusParams { threshold: f.threshold }),
        noise_level: report.noise_level,
    })
}

fn convert_window(
    window: &config_proto::OnDeviceAggregationWindow,
) -> Result<AggregationWindow, Status> {
    match &window.unit {
        Some(config_proto::on_device_aggregation_window::Unit::Days(d)) => {
            Ok(AggregationWindow::Days(*d))
        }
        Some(config_proto::on_device_aggregation_window::Unit::Hours(h)) => {
            Ok(AggregationWindow::Hours(*h))
        }
        None => Err(Status::new(
            StatusCode::InvalidConfig,
            "aggregation window missing unit",
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_config() -> CobaltConfig {
        CobaltConfig {
            customers: vec![config_proto::CustomerConfig {
                customer_id: 1,
                customer_name: "fuchsia".into(),
                projects: vec![config_proto::ProjectConfig {
                    project_id: 2,
                    project_name: "ledger".into(),
                    metrics: vec![config_proto::MetricDefinition {
                        id: 3,
                        name: "SingleString".into(),
                        metric_type: MetricType::EventOccurred as i32,
                        dimensions: vec![],
                        time_zone_policy: TimeZonePolicy::Utc as i32,
                        reports: vec![config_proto::ReportDefinition {
                            id: 4,
                            name: "BasicRapporReport".into(),
                            report_type: ReportType::BasicRappor as i32,
                            aggregation_type: AggregationType::Unspecified as i32,
                            windows: vec![],
                            rappor: None,
                            forculus: None,
                            noise_level: 0.0,
                            has_export_config: false,
                        }],
                        system_profile_fields: vec![],
                    }],
                }],
            }],
        }
    }

    #[test_log::test]
    fn lookup_by_id_and_name_both_work() {
        let registry = Registry::from_config(&sample_config()).expect("valid config");
        let customer = registry.get_customer(1).expect("customer exists");
        assert_eq!(customer.name, "fuchsia");
        let customer_by_name = registry.get_customer("fuchsia").expect("customer exists");
        assert_eq!(customer_by_name.id, 1);

        let project = registry.get_project(customer, 2).expect("project exists");
        let metric = registry.get_metric(project, "SingleString").expect("metric exists");
        assert_eq!(metric.reports.len(), 1);
        assert!(metric.reports[0].is_immediate());
    }

    #[test_log::test]
    fn unknown_id_is_not_found() {
        let registry = Registry::from_config(&sample_config()).expect("valid config");
        let err = registry.get_customer(999).unwrap_err();
        assert_eq!(err.code(), StatusCode::NotFound);
    }

    #[test_log::test]
    fn windows_are_sorted_hours_before_days() {
        let mut config = sample_config();
        config.customers[0].projects[0].metrics[0].reports[0].windows = vec![
            config_proto::OnDeviceAggregationWindow {
                unit: Some(config_proto::on_device_aggregation_window::Unit::Days(7)),
            },
            config_proto::OnDeviceAggregationWindow {
                unit: Some(config_proto::on_device_aggregation_window::Unit::Hours(1)),
            },
        ];
        let registry = Registry::from_config(&config).expect("valid config");
        let customer = registry.get_customer(1).unwrap();
        let project = registry.get_project(customer, 2).unwrap();
        let metric = registry.get_metric(project, 3).unwrap();
        assert_eq!(
            metric.reports[0].windows,
            vec![AggregationWindow::Hours(1), AggregationWindow::Days(7)]
        );
    }

    #[test_log::test]
    fn out_of_range_window_does_not_abort_registry_construction() {
        // An out-of-range window is only meaningful to the AggregateStore's
        // generation/GC passes (spec's AggregationWindowOutOfRange); decoding
        // the registry itself must succeed so the rest of the config is
        // usable, including other reports on the same metric.
        let mut config = sample_config();
        config.customers[0].projects[0].metrics[0].reports[0].windows =
            vec![config_proto::OnDeviceAggregationWindow {
                unit: Some(config_proto::on_device_aggregation_window::Unit::Days(400)),
            }];
        let registry = Registry::from_config(&config).expect("registry still decodes");
        let customer = registry.get_customer(1).unwrap();
        let project = registry.get_project(customer, 2).unwrap();
        let metric = registry.get_metric(project, 3).unwrap();
        assert_eq!(metric.reports[0].windows, vec![AggregationWindow::Days(400)]);
    }
}
