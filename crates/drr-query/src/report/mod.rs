//! State report: a sectioned narrative of flood risk in one state for one
//! month, assembled from the ranking, aggregation and trend operations.
//!
//! Sections are built independently. A section that fails is replaced by an
//! error note and the others still render. Individual missing values are
//! [`Error::DataQualityGap`]s, shown as `NA`.

mod model;

use std::{
  collections::{BTreeMap, HashMap},
  future::Future,
};

use drr_core::{
  geography::{GeoType, Geography},
  indicator::Indicator,
  period::DataPeriod,
  store::{IndicatorFilter, IndicatorStore, ObservationFilter},
};
use tracing::{debug, warn};

pub use self::model::{ChartDatum, ChartSpec, ChartType, ReportModel, Section};
use crate::{
  Engine, Error, Result,
  aggregate::TableRow,
  geo::{Resolution, ResolvedGeographies},
  indicator::IndicatorSelection,
  rank::{RankOrder, RankedGeography},
  trend::TrendWindow,
  value::{NA, format_number, render},
};

/// Label of the derived infrastructure column.
pub const INFRASTRUCTURE_DAMAGED: &str = "Infrastructure damaged";

// ─── Pure helpers ────────────────────────────────────────────────────────────

/// Sum of the addends, or `None` if any addend is missing.
pub fn infrastructure_damage(addends: &[Option<f64>]) -> Option<f64> {
  addends.iter().copied().sum()
}

/// The twelve periods of the financial year containing `anchor`.
pub fn fiscal_year_window(anchor: DataPeriod) -> Vec<DataPeriod> {
  DataPeriod::fiscal_year_periods(anchor.fiscal_year())
}

/// The stored periods falling in the anchor's calendar year or the
/// `years - 1` years before it.
pub fn trailing_year_window(
  anchor: DataPeriod,
  available: &[DataPeriod],
  years: i32,
) -> Vec<DataPeriod> {
  let first = anchor.year() - (years - 1);
  available
    .iter()
    .copied()
    .filter(|p| (first..=anchor.year()).contains(&p.year()))
    .collect()
}

/// `"FY 2023-24"`.
pub fn fiscal_year_label(fiscal_year: i32) -> String {
  format!("FY {}-{:02}", fiscal_year, (fiscal_year + 1).rem_euclid(100))
}

/// The sections shown in place of one that could not be built.
pub fn error_note(title: &str, error: &Error) -> Vec<Section> {
  vec![
    Section::heading(2, title),
    Section::paragraph(format!("{title} could not be generated: {error}.")),
  ]
}

fn logged_note(title: &str, error: &Error) -> Vec<Section> {
  warn!(section = title, error = %error, "report section failed");
  error_note(title, error)
}

fn section_or_note(title: &str, built: Result<Vec<Section>>) -> Vec<Section> {
  built.unwrap_or_else(|e| logged_note(title, &e))
}

/// Builds a section that needs the composite ranking. A failed ranking
/// yields the note instead.
async fn ranked_section<'a, Fut>(
  title: &str,
  ranking: &'a Result<Ranking>,
  build: impl FnOnce(&'a Ranking) -> Fut,
) -> Vec<Section>
where
  Fut: Future<Output = Result<Vec<Section>>>,
{
  match ranking {
    Ok(ranking) => section_or_note(title, build(ranking).await),
    Err(e) => logged_note(title, e),
  }
}

/// Logs a gap and yields the placeholder.
fn gap_as_na(gap: Error) -> String {
  warn!(%gap, "data quality gap");
  NA.to_owned()
}

const TOP_VULNERABLE: &str = "Top vulnerable districts";
const MAJOR_INDICATORS: &str = "Major indicators";
const HIGHLIGHTS: &str = "Highlights";
const CUMULATIVE: &str = "Cumulative values";
const INSIGHTS: &str = "Insights";
const RISK_TREND: &str = "Risk trend";
const LEAST_FUNDED: &str = "Least funded";

const SECTION_TITLES: [&str; 7] = [
  TOP_VULNERABLE,
  MAJOR_INDICATORS,
  HIGHLIGHTS,
  CUMULATIVE,
  INSIGHTS,
  RISK_TREND,
  LEAST_FUNDED,
];

// ─── Context ─────────────────────────────────────────────────────────────────

/// Facts shared by every section.
struct ReportContext {
  state:      Geography,
  period:     DataPeriod,
  /// Geographies eligible for ranking: the state's districts, or their
  /// sub-units for sub-district states.
  candidates: Vec<Geography>,
  ranking:    Result<Ranking>,
}

/// The candidates ranked by the composite score.
struct Ranking {
  composite: Indicator,
  /// The most vulnerable candidates, highest composite score first.
  top:       Vec<RankedGeography>,
  /// Rows of `top`, same order.
  top_rows:  Vec<Geography>,
}

impl ReportContext {
  fn level(&self) -> GeoType {
    self
      .candidates
      .first()
      .map_or(GeoType::District, |g| g.geo_type)
  }

  fn gap(&self, geography: &Geography, indicator: &str) -> Error {
    Error::DataQualityGap {
      geography: geography.name.clone(),
      indicator: indicator.to_owned(),
      period:    self.period,
    }
  }
}

impl Ranking {
  /// Exactly the top geographies, for a direct aggregation lookup.
  fn top_resolved(&self) -> ResolvedGeographies {
    ResolvedGeographies {
      resolution:  Resolution::Exact,
      geographies: self.top_rows.clone(),
      parents:     HashMap::new(),
    }
  }
}

/// Indicator columns for a set of slugs, in the given order. Slugs missing
/// from the catalog keep their slug as a title.
fn columns<'a>(slugs: &'a [String], selection: &'a IndicatorSelection) -> Vec<(&'a str, String)> {
  slugs
    .iter()
    .map(|slug| {
      let title = selection
        .indicators
        .iter()
        .find(|i| &i.slug == slug)
        .map_or_else(|| slug.clone(), |i| i.name.clone());
      (slug.as_str(), title)
    })
    .collect()
}

fn row_for<'a>(rows: &'a [TableRow], geography: &Geography) -> Option<&'a TableRow> {
  rows
    .iter()
    .find(|r| r.geography.code == geography.code && r.geography.name == geography.name)
}

impl<S: IndicatorStore> Engine<S> {
  /// Builds the report model for the state with `state_code` in `period`.
  pub async fn build_report_model(
    &self,
    state_code: &str,
    period: DataPeriod,
  ) -> Result<ReportModel> {
    self
      .bounded(async {
        let state = self.scope_geography(state_code).await?;
        let title = format!("State Report: {} | {}", state.name, period.label());
        let mut sections = vec![Section::heading(1, title.clone())];

        let (composite, candidates) = tokio::join!(
          self.composite_indicator(),
          self.scope_candidates(Some(state.code.as_str())),
        );
        let candidates = match candidates {
          Ok(candidates) => candidates,
          Err(e) => {
            for section in SECTION_TITLES {
              sections.extend(logged_note(section, &e));
            }
            return Ok(ReportModel { title, state: state.descriptor(), period, sections });
          }
        };
        let ranking = match composite {
          Ok(composite) => self.rank_composite(composite, &candidates, period).await,
          Err(e) => Err(e),
        };
        debug!(
          state = %state.name,
          %period,
          candidates = candidates.len(),
          top = ranking.as_ref().map_or(0, |r| r.top.len()),
          "building state report"
        );

        let ctx = ReportContext { state, period, candidates, ranking };
        let ctx = &ctx;
        let (top, major, highlights, cumulative, insights, trend, funding) = tokio::join!(
          ranked_section(TOP_VULNERABLE, &ctx.ranking, |r| self.top_section(ctx, r)),
          ranked_section(MAJOR_INDICATORS, &ctx.ranking, |r| {
            self.major_indicators_section(ctx, r)
          }),
          ranked_section(HIGHLIGHTS, &ctx.ranking, |r| self.highlights_section(ctx, r)),
          async { section_or_note(CUMULATIVE, self.cumulative_section(ctx).await) },
          async { section_or_note(INSIGHTS, self.insights_section(ctx).await) },
          ranked_section(RISK_TREND, &ctx.ranking, |r| self.trend_section(ctx, r)),
          async { section_or_note(LEAST_FUNDED, self.least_funded_section(ctx).await) },
        );
        for built in [top, major, highlights, cumulative, insights, trend, funding] {
          sections.extend(built);
        }

        Ok(ReportModel { title, state: ctx.state.descriptor(), period, sections })
      })
      .await
  }

  async fn rank_composite(
    &self,
    composite: Indicator,
    candidates: &[Geography],
    period: DataPeriod,
  ) -> Result<Ranking> {
    let top = self
      .rank_geographies(
        &composite,
        period,
        candidates,
        RankOrder::Descending,
        self.config().top_n,
      )
      .await?;
    let top_rows = top
      .iter()
      .filter_map(|r| candidates.iter().find(|g| g.id == r.id).cloned())
      .collect();
    Ok(Ranking { composite, top, top_rows })
  }

  /// Visible indicators with the given slugs, rows for the top geographies.
  async fn top_lookup(
    &self,
    ctx: &ReportContext,
    ranking: &Ranking,
    slugs: &[String],
  ) -> Result<(IndicatorSelection, Vec<TableRow>)> {
    let indicators = self
      .indicators(&IndicatorFilter {
        visible_only: true,
        ..IndicatorFilter::by_slugs(slugs.iter().cloned())
      })
      .await?;
    let selection = IndicatorSelection::new(None, indicators);
    let rows = self
      .aggregate(&ranking.top_resolved(), &selection, ctx.period)
      .await?;
    Ok((selection, rows))
  }

  // ─── Sections ──────────────────────────────────────────────────────────────

  async fn top_section(&self, ctx: &ReportContext, ranking: &Ranking) -> Result<Vec<Section>> {
    let level = ctx.level().label();
    let mut sections = vec![Section::heading(2, TOP_VULNERABLE)];
    if ranking.top.is_empty() {
      sections.push(Section::paragraph(format!(
        "No {} values are recorded for {} in {}.",
        ranking.composite.name,
        ctx.state.name,
        ctx.period.label()
      )));
      return Ok(sections);
    }

    sections.push(Section::paragraph(format!(
      "The {} most vulnerable areas of {} in {}, ranked by {}.",
      ranking.top.len(),
      ctx.state.name,
      ctx.period.label(),
      ranking.composite.name
    )));
    sections.push(Section::Table {
      title:  TOP_VULNERABLE.to_owned(),
      header: vec![level.to_owned(), ranking.composite.name.clone()],
      rows:   ranking
        .top
        .iter()
        .map(|r| vec![r.geography.name.clone(), format_number(r.value)])
        .collect(),
    });
    sections.push(Section::ChartPlaceholder(ChartSpec {
      chart_type:     ChartType::BarVertical,
      title:          format!("{} by {}", ranking.composite.name, level.to_lowercase()),
      x_axis_column:  level.to_owned(),
      y_axis_column:  ranking.composite.name.clone(),
      aggregate_type: "sum".to_owned(),
      show_legend:    true,
      data:           ranking
        .top
        .iter()
        .map(|r| ChartDatum { x: r.geography.name.clone(), y: Some(r.value), series: None })
        .collect(),
    }));
    Ok(sections)
  }

  async fn major_indicators_section(
    &self,
    ctx: &ReportContext,
    ranking: &Ranking,
  ) -> Result<Vec<Section>> {
    let mut slugs = self.config().report.factor_slugs.clone();
    slugs.push(ranking.composite.slug.clone());
    let (selection, rows) = self.top_lookup(ctx, ranking, &slugs).await?;
    let columns = columns(&slugs, &selection);

    let mut header = vec![ctx.level().label().to_owned()];
    header.extend(columns.iter().map(|(_, title)| title.clone()));
    let table_rows = ranking
      .top_rows
      .iter()
      .map(|g| {
        let row = row_for(&rows, g);
        let mut cells = vec![g.name.clone()];
        cells.extend(columns.iter().map(|(slug, _)| {
          row
            .and_then(|r| r.indicators.get(*slug))
            .filter(|c| c.value.is_some())
            .map(|c| c.display.clone())
            .ok_or_else(|| ctx.gap(g, slug))
            .unwrap_or_else(gap_as_na)
        }));
        cells
      })
      .collect();

    Ok(vec![
      Section::heading(2, MAJOR_INDICATORS),
      Section::Table { title: MAJOR_INDICATORS.to_owned(), header, rows: table_rows },
    ])
  }

  async fn highlights_section(
    &self,
    ctx: &ReportContext,
    ranking: &Ranking,
  ) -> Result<Vec<Section>> {
    let report = &self.config().report;
    let mut slugs = report.highlight_slugs.clone();
    slugs.extend(report.infrastructure_slugs.iter().cloned());
    let (selection, rows) = self.top_lookup(ctx, ranking, &slugs).await?;
    let columns = columns(&report.highlight_slugs, &selection);

    let mut header = vec![ctx.level().label().to_owned()];
    header.extend(columns.iter().map(|(_, title)| title.clone()));
    header.push(INFRASTRUCTURE_DAMAGED.to_owned());

    let table_rows = ranking
      .top_rows
      .iter()
      .map(|g| {
        let row = row_for(&rows, g);
        let value = |slug: &str| row.and_then(|r| r.value(slug));
        let mut cells = vec![g.name.clone()];
        cells.extend(columns.iter().map(|(slug, _)| {
          row
            .and_then(|r| r.indicators.get(*slug))
            .filter(|c| c.value.is_some())
            .map(|c| c.display.clone())
            .ok_or_else(|| ctx.gap(g, slug))
            .unwrap_or_else(gap_as_na)
        }));
        let addends: Vec<_> = report.infrastructure_slugs.iter().map(|s| value(s.as_str())).collect();
        cells.push(
          infrastructure_damage(&addends)
            .map(format_number)
            .ok_or_else(|| ctx.gap(g, "infrastructure-damaged"))
            .unwrap_or_else(gap_as_na),
        );
        cells
      })
      .collect();

    Ok(vec![
      Section::heading(2, HIGHLIGHTS),
      Section::Table {
        title:  format!("Highlights for {}", ctx.period.label()),
        header,
        rows:   table_rows,
      },
    ])
  }

  async fn cumulative_section(&self, ctx: &ReportContext) -> Result<Vec<Section>> {
    let slugs = &self.config().report.cumulative_slugs;
    let fiscal = fiscal_year_window(ctx.period);
    let trailing = trailing_year_window(ctx.period, &self.periods().await?, 3);

    let indicators = self
      .indicators(&IndicatorFilter {
        visible_only: true,
        ..IndicatorFilter::by_slugs(slugs.iter().cloned())
      })
      .await?;
    let mut window: Vec<DataPeriod> = fiscal.iter().chain(&trailing).copied().collect();
    window.sort();
    window.dedup();
    let observations = self
      .observations(&ObservationFilter {
        geography_ids: Some(ctx.candidates.iter().map(|g| g.id).collect()),
        indicator_ids: Some(indicators.iter().map(|i| i.id).collect()),
        data_period_in: Some(window),
        ..ObservationFilter::default()
      })
      .await?;

    // indicator id -> (fiscal-year total, trailing total)
    let mut totals: BTreeMap<_, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for obs in &observations {
      let Some(v) = obs.value else { continue };
      let entry = totals.entry(obs.indicator).or_default();
      if fiscal.contains(&obs.data_period) {
        entry.0 = Some(entry.0.unwrap_or(0.0) + v);
      }
      if trailing.contains(&obs.data_period) {
        entry.1 = Some(entry.1.unwrap_or(0.0) + v);
      }
    }

    let fy = ctx.period.fiscal_year();
    let header = vec![
      "Indicator".to_owned(),
      fiscal_year_label(fy),
      format!("{}-{}", ctx.period.year() - 2, ctx.period.year()),
    ];
    let rows = slugs
      .iter()
      .map(|slug| {
        let indicator = indicators.iter().find(|i| &i.slug == slug);
        let (fiscal_total, trailing_total) = indicator
          .and_then(|i| totals.get(&i.id).copied())
          .unwrap_or_default();
        let unit = indicator.and_then(Indicator::unit_label);
        vec![
          indicator.map_or_else(|| slug.clone(), |i| i.name.clone()),
          render(fiscal_total, unit),
          render(trailing_total, unit),
        ]
      })
      .collect();

    Ok(vec![
      Section::heading(2, CUMULATIVE),
      Section::Table { title: format!("Cumulative values for {}", ctx.state.name), header, rows },
    ])
  }

  async fn insights_section(&self, ctx: &ReportContext) -> Result<Vec<Section>> {
    let mut items = Vec::new();
    for slug in &self.config().report.insight_slugs {
      let indicator = match self.indicator(slug).await {
        Ok(indicator) => indicator,
        Err(Error::NotFound(_)) => {
          warn!(%slug, "insight indicator is not in the catalog");
          continue;
        }
        Err(e) => return Err(e),
      };
      let worst = self
        .rank_geographies(&indicator, ctx.period, &ctx.candidates, RankOrder::Descending, 1)
        .await?;
      match worst.first() {
        Some(top) => items.push(format!(
          "{} recorded the highest {} in {} ({}).",
          top.geography.name,
          indicator.name.to_lowercase(),
          ctx.state.name,
          render(Some(top.value), indicator.unit_label())
        )),
        None => warn!(%slug, period = %ctx.period, "no values for insight"),
      }
    }
    if items.is_empty() {
      items.push(format!("No insight data is available for {}.", ctx.period.label()));
    }
    Ok(vec![Section::ListBlock { title: INSIGHTS.to_owned(), items }])
  }

  async fn trend_section(&self, ctx: &ReportContext, ranking: &Ranking) -> Result<Vec<Section>> {
    let trend = self
      .time_trend(
        &ranking.composite.slug,
        Some(ctx.state.code.as_str()),
        ctx.period,
        TrendWindow::TwelveMonths,
      )
      .await?;
    let data = trend
      .periods
      .iter()
      .flat_map(|(period, points)| {
        points
          .iter()
          .filter(|p| ranking.top.iter().any(|t| t.geography == p.geography))
          .map(|p| ChartDatum {
            x:      period.label(),
            y:      p.value,
            series: Some(p.geography.name.clone()),
          })
      })
      .collect();

    Ok(vec![
      Section::heading(2, RISK_TREND),
      Section::ChartPlaceholder(ChartSpec {
        chart_type: ChartType::Line,
        title: format!("{} over the last twelve months", ranking.composite.name),
        x_axis_column: "Period".to_owned(),
        y_axis_column: ranking.composite.name.clone(),
        aggregate_type: "none".to_owned(),
        show_legend: true,
        data,
      }),
    ])
  }

  async fn least_funded_section(&self, ctx: &ReportContext) -> Result<Vec<Section>> {
    let tender = self.indicator(&self.config().report.tender_slug).await?;
    let lowest = self
      .rank_geographies(
        &tender,
        ctx.period,
        &ctx.candidates,
        RankOrder::Ascending,
        self.config().top_n,
      )
      .await?;
    let items = if lowest.is_empty() {
      vec![format!("No {} values are recorded for {}.", tender.name, ctx.period.label())]
    } else {
      lowest
        .iter()
        .map(|r| format!("{}: {}", r.geography.name, render(Some(r.value), tender.unit_label())))
        .collect()
    };
    Ok(vec![Section::ListBlock { title: LEAST_FUNDED.to_owned(), items }])
  }
}
