//! Engine tests against an in-memory SQLite store.

use std::{future::Future, io, sync::Arc, time::Duration};

use drr_core::{
  geography::{GeoType, Geography, NewGeography},
  geometry::Shape,
  indicator::{Indicator, NewIndicator},
  observation::{NewObservation, Observation},
  period::DataPeriod,
  store::{GeographyFilter, IndicatorFilter, IndicatorStore, ObservationFilter},
};
use drr_store_sqlite::SqliteStore;

use crate::{
  Engine, EngineConfig, Error,
  geo::{GeoFilter, Resolution},
  rank::RankOrder,
  report::Section,
  trend::TrendWindow,
  value::NA,
};

fn p(s: &str) -> DataPeriod { s.parse().unwrap() }

fn square(x0: f64, y0: f64) -> Shape {
  geo::Rect::new((x0, y0), (x0 + 1.0, y0 + 1.0)).to_polygon().into()
}

struct Fixture {
  store: Arc<SqliteStore>,
  state: Geography,
  x:     Geography,
  y:     Geography,
}

impl Fixture {
  fn engine(&self) -> Engine<SqliteStore> { self.engine_with(EngineConfig::default()) }

  fn engine_with(&self, config: EngineConfig) -> Engine<SqliteStore> {
    Engine::new(self.store.clone(), config)
  }
}

/// State A (code 1) with districts X (10) and Y (11). In 2024_06 the risk
/// score is 5 for X and 3 for Y.
async fn fixture() -> Fixture {
  let s = SqliteStore::open_in_memory().await.expect("in-memory store");

  let state = s
    .upsert_geography(NewGeography::new("State A", "1", GeoType::State))
    .await
    .unwrap();
  let x = s
    .upsert_geography(
      NewGeography::new("X", "10", GeoType::District)
        .with_parent(state.id)
        .with_shape(square(91.0, 26.0)),
    )
    .await
    .unwrap();
  let y = s
    .upsert_geography(
      NewGeography::new("Y", "11", GeoType::District)
        .with_parent(state.id)
        .with_shape(square(92.0, 26.0)),
    )
    .await
    .unwrap();

  let pct = s.upsert_unit("percentage", "%").await.unwrap();
  let rupees = s.upsert_unit("rupees", "₹").await.unwrap();

  let ind = |i: NewIndicator| {
    let s = &s;
    async move { s.upsert_indicator(i).await.unwrap() }
  };
  let risk = ind(NewIndicator::new("Risk score", "risk-score")).await;
  let hazard = ind(NewIndicator::new("Flood hazard", "flood-hazard").with_parent(risk.id)).await;
  ind(NewIndicator::new("Exposure", "exposure").with_parent(risk.id)).await;
  ind(NewIndicator::new("Secret", "secret").with_parent(risk.id).hidden()).await;
  let depth = ind(NewIndicator::new("Flood depth", "flood-depth").with_parent(hazard.id)).await;
  let inundation = ind(NewIndicator::new("Inundation", "inundation-pct").with_unit(pct.id)).await;
  let roads = ind(NewIndicator::new("Roads", "roads")).await;
  let bridge = ind(NewIndicator::new("Bridge", "bridge")).await;
  let embankments = ind(NewIndicator::new("Embankments", "embankments-affected")).await;
  let tender = ind(
    NewIndicator::new("Tender value", "total-tender-awarded-value").with_unit(rupees.id),
  )
  .await;

  let june = p("2024_06");
  let obs = |i: &Indicator, g: &Geography, period: DataPeriod, v: f64| {
    NewObservation::new(i.id, g.id, period, Some(v))
  };
  s.replace_observations(vec![
    obs(&risk, &x, june, 5.0),
    obs(&risk, &y, june, 3.0),
    obs(&risk, &x, p("2024_05"), 4.0),
    obs(&risk, &x, p("2024_02"), 1.0),
    obs(&hazard, &x, june, 2.0),
    obs(&hazard, &y, june, 1.0),
    obs(&depth, &x, june, 9.0),
    obs(&inundation, &y, june, 40.0),
    obs(&roads, &x, june, 1.0),
    obs(&bridge, &x, june, 2.0),
    obs(&embankments, &x, june, 3.0),
    obs(&roads, &y, june, 4.0),
    obs(&tender, &x, june, 100.0),
    obs(&tender, &y, june, 50.0),
    obs(&tender, &x, p("2023_11"), 25.0),
  ])
  .await
  .unwrap();

  Fixture { store: Arc::new(s), state, x, y }
}

/// Records a risk score for `geography`.
async fn observe_risk(f: &Fixture, geography: &Geography, period: DataPeriod, value: f64) {
  let risk = f
    .store
    .find_indicators(&IndicatorFilter::by_slugs(["risk-score"]))
    .await
    .unwrap()
    .remove(0);
  f.store
    .replace_observations(vec![NewObservation::new(risk.id, geography.id, period, Some(value))])
    .await
    .unwrap();
}

async fn add_geography(f: &Fixture, input: NewGeography) -> Geography {
  f.store.upsert_geography(input).await.unwrap()
}

fn names<'a>(geographies: impl IntoIterator<Item = &'a Geography>) -> Vec<&'a str> {
  let mut names: Vec<_> = geographies.into_iter().map(|g| g.name.as_str()).collect();
  names.sort();
  names
}

// ─── Geography resolution ────────────────────────────────────────────────────

#[tokio::test]
async fn single_code_resolves_to_self_and_children() {
  let f = fixture().await;
  let resolved = f
    .engine()
    .resolve_geographies(&GeoFilter::code("1"))
    .await
    .unwrap();
  assert_eq!(resolved.resolution, Resolution::Expanded { roots: vec![f.state.id] });
  assert_eq!(names(&resolved.geographies), vec!["State A", "X", "Y"]);
  assert_eq!(resolved.parent_of(&f.x), Some(&f.state.descriptor()));
}

#[tokio::test]
async fn district_code_resolves_to_itself_without_children() {
  let f = fixture().await;
  let resolved = f.engine().resolve_with_children("10").await.unwrap();
  assert_eq!(names(&resolved.geographies), vec!["X"]);
}

#[tokio::test]
async fn unknown_single_code_is_not_found() {
  let f = fixture().await;
  let err = f
    .engine()
    .resolve_geographies(&GeoFilter::code("999"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn several_codes_are_exact() {
  let f = fixture().await;
  let filter = GeoFilter::parse(Some("1,11"), None).unwrap();
  let resolved = f.engine().resolve_geographies(&filter).await.unwrap();
  assert_eq!(resolved.resolution, Resolution::Exact);
  assert_eq!(names(&resolved.geographies), vec!["State A", "Y"]);
  assert_eq!(resolved.parent_of(&f.y), Some(&f.state.descriptor()));
}

#[tokio::test]
async fn no_code_selects_default_level() {
  let f = fixture().await;
  let resolved = f
    .engine()
    .resolve_geographies(&GeoFilter::default())
    .await
    .unwrap();
  assert_eq!(resolved.resolution, Resolution::Typed(GeoType::District));
  assert_eq!(names(&resolved.geographies), vec!["X", "Y"]);

  let states = f
    .engine()
    .resolve_geographies(&GeoFilter { codes: vec![], geo_type: Some(GeoType::State) })
    .await
    .unwrap();
  assert_eq!(names(&states.geographies), vec!["State A"]);
}

// ─── Indicator resolution ────────────────────────────────────────────────────

#[tokio::test]
async fn slug_selects_itself_and_visible_direct_children() {
  let f = fixture().await;
  let selection = f
    .engine()
    .resolve_indicators(Some("risk-score"))
    .await
    .unwrap();
  let slugs: Vec<_> = selection.indicators.iter().map(|i| i.slug.as_str()).collect();
  assert_eq!(slugs, vec!["risk-score", "flood-hazard", "exposure"]);

  let observations = f
    .store
    .find_observations(&ObservationFilter::default())
    .await
    .unwrap();
  let matched: Vec<&Observation> = observations.iter().filter(|o| selection.matches(o)).collect();
  // risk (4 rows) + hazard (2 rows); the flood-depth grandchild is excluded.
  assert_eq!(matched.len(), 6);
}

#[tokio::test]
async fn no_slug_selects_roots_and_their_children() {
  let f = fixture().await;
  let selection = f.engine().resolve_indicators(None).await.unwrap();
  let slugs: Vec<_> = selection.indicators.iter().map(|i| i.slug.as_str()).collect();
  assert!(slugs.contains(&"risk-score"));
  assert!(slugs.contains(&"flood-hazard"));
  assert!(!slugs.contains(&"flood-depth"));
  assert!(!slugs.contains(&"secret"));
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
  let f = fixture().await;
  let err = f
    .engine()
    .resolve_indicators(Some("nope"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn state_code_table_lists_districts_by_score() {
  let f = fixture().await;
  let table = f
    .engine()
    .table(Some("risk-score"), Some(p("2024_06")), &GeoFilter::code("1"))
    .await
    .unwrap();

  let rows: Vec<_> = table.rows.iter().map(|r| r.geography.name.as_str()).collect();
  assert_eq!(rows, vec!["X", "Y"]);
  assert_eq!(table.rows[0].region, Some(f.state.descriptor()));
  assert_eq!(table.rows[0].indicators["risk-score"].display, "5");
  assert_eq!(table.rows[0].indicators["flood-hazard"].value, Some(2.0));
  assert!(!table.rows[0].indicators.contains_key("flood-depth"));
}

#[tokio::test]
async fn aggregation_is_idempotent() {
  let f = fixture().await;
  let engine = f.engine();
  let filter = GeoFilter::code("1");
  let first = engine
    .table(Some("risk-score"), Some(p("2024_06")), &filter)
    .await
    .unwrap();
  let second = engine
    .table(Some("risk-score"), Some(p("2024_06")), &filter)
    .await
    .unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn level_overview_groups_by_parent_with_max() {
  let f = fixture().await;
  let table = f
    .engine()
    .table(Some("risk-score"), Some(p("2024_06")), &GeoFilter::default())
    .await
    .unwrap();
  assert_eq!(table.rows.len(), 1);
  assert_eq!(table.rows[0].geography, f.state.descriptor());
  assert_eq!(table.rows[0].indicators["risk-score"].value, Some(5.0));
}

#[tokio::test]
async fn level_overview_rounds_maximum_to_two_decimals() {
  let f = fixture().await;
  let b = add_geography(&f, NewGeography::new("State B", "2", GeoType::State)).await;
  let high = add_geography(&f, NewGeography::new("P", "20", GeoType::District).with_parent(b.id)).await;
  let low = add_geography(&f, NewGeography::new("Q", "21", GeoType::District).with_parent(b.id)).await;
  observe_risk(&f, &high, p("2024_06"), 4.567).await;
  observe_risk(&f, &low, p("2024_06"), 1.2).await;

  let table = f
    .engine()
    .table(Some("risk-score"), Some(p("2024_06")), &GeoFilter::default())
    .await
    .unwrap();
  let rows: Vec<_> = table
    .rows
    .iter()
    .map(|r| (r.geography.name.as_str(), r.indicators["risk-score"].display.as_str()))
    .collect();
  assert_eq!(rows, vec![("State A", "5"), ("State B", "4.57")]);
  assert_eq!(table.rows[1].indicators["risk-score"].value, Some(4.57));
}

#[tokio::test]
async fn level_overview_merges_parents_sharing_a_name() {
  let f = fixture().await;
  let twin = add_geography(&f, NewGeography::new("State A", "2", GeoType::State)).await;
  let z = add_geography(&f, NewGeography::new("Z", "20", GeoType::District).with_parent(twin.id)).await;
  observe_risk(&f, &z, p("2024_06"), 8.0).await;

  let table = f
    .engine()
    .table(Some("risk-score"), Some(p("2024_06")), &GeoFilter::default())
    .await
    .unwrap();
  assert_eq!(table.rows.len(), 1);
  assert_eq!(table.rows[0].geography.name, "State A");
  assert_eq!(table.rows[0].indicators["risk-score"].value, Some(8.0));
}

#[tokio::test]
async fn code_lists_of_any_length_resolve_exactly() {
  let f = fixture().await;
  let filter = GeoFilter {
    codes:    (0..40_000).map(|n| n.to_string()).collect(),
    geo_type: None,
  };
  let table = f
    .engine()
    .table(Some("risk-score"), Some(p("2024_06")), &filter)
    .await
    .unwrap();
  let rows: Vec<_> = table.rows.iter().map(|r| r.geography.name.as_str()).collect();
  assert_eq!(rows, vec!["X", "Y"]);
  assert_eq!(table.rows[0].region, Some(f.state.descriptor()));
}

#[tokio::test]
async fn unit_shows_in_display_and_missing_rows_drop() {
  let f = fixture().await;
  let table = f
    .engine()
    .table(Some("inundation-pct"), Some(p("2024_06")), &GeoFilter::code("1"))
    .await
    .unwrap();
  assert_eq!(table.rows.len(), 1, "X has no inundation observation");
  assert_eq!(table.rows[0].geography.name, "Y");
  assert_eq!(table.rows[0].indicators["inundation-pct"].display, "40 %");
}

#[tokio::test]
async fn missing_period_falls_back_to_latest() {
  let f = fixture().await;
  let engine = f.engine();
  assert_eq!(engine.resolve_period(None).await.unwrap(), p("2024_06"));
  assert_eq!(engine.resolve_period(Some(p("2024_05"))).await.unwrap(), p("2024_05"));

  let configured = f.engine_with(EngineConfig {
    default_time_period: Some(p("2024_02")),
    ..EngineConfig::default()
  });
  assert_eq!(configured.resolve_period(None).await.unwrap(), p("2024_02"));
}

// ─── Ranking ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn top_at_risk_in_state_scope() {
  let f = fixture().await;
  let engine = f.engine();
  let top = engine
    .top_n_at_risk(p("2024_06"), Some("1"), 5, RankOrder::Descending)
    .await
    .unwrap();
  let ranked: Vec<_> = top.iter().map(|r| (r.geography.name.as_str(), r.value)).collect();
  assert_eq!(ranked, vec![("X", 5.0), ("Y", 3.0)]);

  let one = engine
    .top_n_at_risk(p("2024_06"), Some("1"), 1, RankOrder::Descending)
    .await
    .unwrap();
  assert_eq!(one.len(), 1);

  let lowest = engine
    .top_n_at_risk(p("2024_06"), Some("1"), 5, RankOrder::Ascending)
    .await
    .unwrap();
  assert_eq!(lowest[0].geography.name, "Y");
}

#[tokio::test]
async fn top_at_risk_without_scope_and_empty_period() {
  let f = fixture().await;
  let engine = f.engine();
  let top = engine
    .top_n_at_risk(p("2024_06"), None, 5, RankOrder::Descending)
    .await
    .unwrap();
  assert_eq!(top.len(), 2);
  assert!(top.windows(2).all(|w| w[0].value >= w[1].value));

  let empty = engine
    .top_n_at_risk(p("2019_01"), Some("1"), 5, RankOrder::Descending)
    .await
    .unwrap();
  assert!(empty.is_empty());
}

#[tokio::test]
async fn sub_district_state_ranks_circles() {
  let f = fixture().await;
  let circle = f
    .store
    .upsert_geography(NewGeography::new("Circle", "1001", GeoType::RevenueCircle).with_parent(f.x.id))
    .await
    .unwrap();
  let risk = f
    .store
    .find_indicators(&IndicatorFilter::by_slugs(["risk-score"]))
    .await
    .unwrap()
    .remove(0);
  f.store
    .replace_observations(vec![NewObservation::new(risk.id, circle.id, p("2024_06"), Some(7.0))])
    .await
    .unwrap();

  let engine = f.engine_with(EngineConfig {
    sub_district_states: vec!["1".to_owned()],
    ..EngineConfig::default()
  });
  let top = engine
    .top_n_at_risk(p("2024_06"), Some("1"), 5, RankOrder::Descending)
    .await
    .unwrap();
  let ranked: Vec<_> = top.iter().map(|r| r.geography.name.as_str()).collect();
  assert_eq!(ranked, vec!["Circle"]);
}

#[tokio::test]
async fn ranking_requires_root_composite() {
  let f = fixture().await;
  let engine = f.engine_with(EngineConfig {
    composite_slug: "flood-hazard".to_owned(),
    ..EngineConfig::default()
  });
  let err = engine
    .top_n_at_risk(p("2024_06"), Some("1"), 5, RankOrder::Descending)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AmbiguousFilter(_)));
}

// ─── Map ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn map_layer_for_state_districts() {
  let f = fixture().await;
  let layer = f
    .engine()
    .project_map(GeoType::District, p("2024_06"), "risk-score", Some("1"))
    .await
    .unwrap();
  assert_eq!(layer.features.len(), 2);

  let json = serde_json::to_value(&layer).unwrap();
  assert_eq!(json["type"], "FeatureCollection");
  let x = &json["features"][0];
  assert_eq!(x["properties"]["name"], "X");
  assert_eq!(x["properties"]["risk-score"], 5.0);
  assert_eq!(x["properties"]["state-code"], "1");
  assert_eq!(x["properties"]["bounds"], serde_json::json!([[26.0, 27.0], [91.0, 92.0]]));
}

#[tokio::test]
async fn map_layer_leaves_unobserved_features_bare() {
  let f = fixture().await;
  let layer = f
    .engine()
    .project_map(GeoType::District, p("2024_06"), "inundation-pct", None)
    .await
    .unwrap();
  let x = layer
    .features
    .iter()
    .find(|feat| feat.properties.code == "10")
    .unwrap();
  assert!(x.properties.extra.is_empty());
  assert!(x.properties.bounds.is_none());
  assert!(x.geometry.is_some());
}

// ─── Trend ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_month_trend_has_every_period() {
  let f = fixture().await;
  let trend = f
    .engine()
    .time_trend("risk-score", Some("1"), p("2024_06"), TrendWindow::ThreeMonths)
    .await
    .unwrap();
  let keys: Vec<_> = trend.periods.keys().copied().collect();
  assert_eq!(keys, vec![p("2024_04"), p("2024_05"), p("2024_06")]);
  assert!(trend.periods[&p("2024_04")].is_empty());
  assert_eq!(trend.periods[&p("2024_05")].len(), 1);

  let june: Vec<_> = trend.periods[&p("2024_06")]
    .iter()
    .map(|pt| (pt.geography.name.as_str(), pt.value))
    .collect();
  assert_eq!(june, vec![("X", Some(5.0)), ("Y", Some(3.0))]);
}

#[tokio::test]
async fn all_window_uses_stored_periods() {
  let f = fixture().await;
  let trend = f
    .engine()
    .time_trend("risk-score", None, p("2024_06"), TrendWindow::All)
    .await
    .unwrap();
  let keys: Vec<_> = trend.periods.keys().copied().collect();
  assert_eq!(keys, vec![p("2023_11"), p("2024_02"), p("2024_05"), p("2024_06")]);
}

#[tokio::test]
async fn trend_reaches_grandchildren_of_the_code() {
  let f = fixture().await;
  let circle = add_geography(
    &f,
    NewGeography::new("Circle", "1001", GeoType::RevenueCircle).with_parent(f.x.id),
  )
  .await;
  observe_risk(&f, &circle, p("2024_06"), 7.0).await;

  let trend = f
    .engine()
    .time_trend("risk-score", Some("1"), p("2024_06"), TrendWindow::ThreeMonths)
    .await
    .unwrap();
  let june: Vec<_> = trend.periods[&p("2024_06")]
    .iter()
    .map(|pt| (pt.geography.name.as_str(), pt.value))
    .collect();
  assert_eq!(june, vec![("Circle", Some(7.0)), ("X", Some(5.0)), ("Y", Some(3.0))]);
}

#[tokio::test]
async fn twelve_month_trend_counts_back_from_anchor() {
  let f = fixture().await;
  let trend = f
    .engine()
    .time_trend("risk-score", Some("1"), p("2024_06"), TrendWindow::TwelveMonths)
    .await
    .unwrap();
  assert_eq!(trend.window, TrendWindow::TwelveMonths);

  let keys: Vec<_> = trend.periods.keys().copied().collect();
  assert_eq!(keys.len(), 12);
  assert_eq!(keys.first(), Some(&p("2023_07")));
  assert_eq!(keys.last(), Some(&p("2024_06")));
  assert!(trend.periods[&p("2023_11")].is_empty(), "only tender values in 2023_11");

  let february: Vec<_> = trend.periods[&p("2024_02")]
    .iter()
    .map(|pt| (pt.geography.name.as_str(), pt.value))
    .collect();
  assert_eq!(february, vec![("X", Some(1.0))]);
}

// ─── Report ──────────────────────────────────────────────────────────────────

fn table<'a>(sections: &'a [Section], wanted: &str) -> &'a [Vec<String>] {
  sections
    .iter()
    .find_map(|s| match s {
      Section::Table { title, rows, .. } if title == wanted => Some(rows.as_slice()),
      _ => None,
    })
    .unwrap_or_else(|| panic!("no table {wanted:?}"))
}

fn list<'a>(sections: &'a [Section], wanted: &str) -> &'a [String] {
  sections
    .iter()
    .find_map(|s| match s {
      Section::ListBlock { title, items } if title == wanted => Some(items.as_slice()),
      _ => None,
    })
    .unwrap_or_else(|| panic!("no list {wanted:?}"))
}

#[tokio::test]
async fn report_ranks_and_marks_gaps() {
  let f = fixture().await;
  let report = f
    .engine()
    .build_report_model("1", p("2024_06"))
    .await
    .unwrap();

  assert_eq!(report.title, "State Report: State A | June 2024");
  assert_eq!(report.sections[0], Section::heading(1, "State Report: State A | June 2024"));

  let top = table(&report.sections, "Top vulnerable districts");
  assert_eq!(top, &[vec!["X".to_owned(), "5".to_owned()], vec!["Y".to_owned(), "3".to_owned()]]);

  let major = table(&report.sections, "Major indicators");
  // District, four factors, composite.
  assert_eq!(major[0].len(), 6);
  assert_eq!(major[0][1], "2");
  assert_eq!(major[0][2], NA, "X has no exposure value");
  assert_eq!(major[0][5], "5");

  let highlights = table(&report.sections, "Highlights for June 2024");
  let x = &highlights[0];
  let y = &highlights[1];
  assert_eq!(x[1], NA, "X has no inundation value");
  assert_eq!(y[1], "40 %");
  assert_eq!(x.last().map(String::as_str), Some("6"));
  assert_eq!(y.last().map(String::as_str), Some(NA), "Y lacks bridge and embankments");

  assert_eq!(list(&report.sections, "Least funded"), &["Y: 50 ₹", "X: 100 ₹"]);

  let chart = report.sections.iter().find_map(|s| match s {
    Section::ChartPlaceholder(spec) if spec.x_axis_column == "District" => Some(spec),
    _ => None,
  });
  let chart = chart.expect("bar chart");
  assert_eq!(chart.aggregate_type, "sum");
  assert!(chart.show_legend);
  assert_eq!(chart.data.len(), 2);
}

#[tokio::test]
async fn report_cumulative_values_cover_fiscal_and_trailing_years() {
  let f = fixture().await;
  let report = f
    .engine()
    .build_report_model("1", p("2024_02"))
    .await
    .unwrap();
  let cumulative = table(&report.sections, "Cumulative values for State A");
  let tender = cumulative
    .iter()
    .find(|row| row[0] == "Tender value")
    .expect("tender row");
  // FY 2023-24 holds 2023_11 only; 2022-2024 also holds both June values.
  assert_eq!(tender[1], "25 ₹");
  assert_eq!(tender[2], "175 ₹");
}

#[tokio::test]
async fn failed_section_does_not_sink_the_report() {
  let f = fixture().await;
  let mut config = EngineConfig::default();
  config.report.tender_slug = "missing-indicator".to_owned();
  let report = f
    .engine_with(config)
    .build_report_model("1", p("2024_06"))
    .await
    .unwrap();

  let note = report.sections.iter().any(|s| {
    matches!(s, Section::Paragraph { text } if text.starts_with("Least funded could not be generated"))
  });
  assert!(note);
  assert!(!table(&report.sections, "Top vulnerable districts").is_empty());
}

#[tokio::test]
async fn missing_composite_only_drops_ranked_sections() {
  let f = fixture().await;
  let report = f
    .engine_with(EngineConfig { composite_slug: "missing".to_owned(), ..EngineConfig::default() })
    .build_report_model("1", p("2024_02"))
    .await
    .unwrap();

  for title in ["Top vulnerable districts", "Major indicators", "Highlights", "Risk trend"] {
    let noted = report.sections.iter().any(|s| {
      matches!(s, Section::Paragraph { text } if text.starts_with(&format!("{title} could not be generated")))
    });
    assert!(noted, "{title} should be a note");
  }

  let cumulative = table(&report.sections, "Cumulative values for State A");
  let tender = cumulative
    .iter()
    .find(|row| row[0] == "Tender value")
    .expect("tender row");
  assert_eq!(tender[1], "25 ₹");
  assert_eq!(list(&report.sections, "Least funded").len(), 1);
  assert!(!list(&report.sections, "Insights").is_empty());
}

#[tokio::test]
async fn report_for_unknown_state_is_not_found() {
  let f = fixture().await;
  let err = f
    .engine()
    .build_report_model("404", p("2024_06"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── Timeout ─────────────────────────────────────────────────────────────────

/// A store that never answers in time.
struct SlowStore;

impl SlowStore {
  async fn stall<T>() -> Result<T, io::Error> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Err(io::Error::other("unreachable"))
  }
}

impl IndicatorStore for SlowStore {
  type Error = io::Error;

  fn find_geographies<'a>(
    &'a self,
    _: &'a GeographyFilter,
  ) -> impl Future<Output = Result<Vec<Geography>, io::Error>> + Send + 'a {
    Self::stall()
  }

  fn find_indicators<'a>(
    &'a self,
    _: &'a IndicatorFilter,
  ) -> impl Future<Output = Result<Vec<Indicator>, io::Error>> + Send + 'a {
    Self::stall()
  }

  fn find_observations<'a>(
    &'a self,
    _: &'a ObservationFilter,
  ) -> impl Future<Output = Result<Vec<Observation>, io::Error>> + Send + 'a {
    Self::stall()
  }

  fn distinct_periods(
    &self,
  ) -> impl Future<Output = Result<Vec<DataPeriod>, io::Error>> + Send + '_ {
    Self::stall()
  }
}

#[tokio::test]
async fn slow_store_times_out() {
  let engine = Engine::new(
    Arc::new(SlowStore),
    EngineConfig { query_timeout_secs: 1, ..EngineConfig::default() },
  );
  let err = engine
    .resolve_geographies(&GeoFilter::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(1)));
}
