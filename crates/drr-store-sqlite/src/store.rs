//! [`SqliteStore`] — the SQLite implementation of [`IndicatorStore`].

use std::{collections::HashSet, path::Path, rc::Rc};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, ToSql, types::Value};

use drr_core::{
  geography::{Geography, GeographyId, NewGeography},
  indicator::{Indicator, IndicatorId, NewIndicator, Unit, UnitId},
  observation::{NewObservation, Observation},
  period::DataPeriod,
  store::{GeographyFilter, IndicatorFilter, IndicatorStore, ObservationFilter},
};

use crate::{
  Error, Result,
  encode::{
    RawGeography, RawIndicator, RawObservation, decode_period, encode_dt,
    encode_geo_type, encode_period, encode_shape,
  },
  schema::SCHEMA,
};

// ─── Query building ──────────────────────────────────────────────────────────

/// A positional parameter. A list is bound as a single `rarray(?)` argument,
/// whatever its length.
enum Param {
  One(Value),
  List(Vec<Value>),
}

/// Turns collected parameters into bindable values. `Rc` is not `Send`, so
/// this runs inside `Connection::call`.
fn bind(params: Vec<Param>) -> Vec<Box<dyn ToSql>> {
  params
    .into_iter()
    .map(|p| -> Box<dyn ToSql> {
      match p {
        Param::One(v) => Box::new(v),
        Param::List(vs) => Box::new(Rc::new(vs)),
      }
    })
    .collect()
}

/// `AND`-ed SQL conditions with their positional `?` parameters, in order.
#[derive(Default)]
struct Conditions {
  clauses: Vec<String>,
  params:  Vec<Param>,
}

impl Conditions {
  fn push(&mut self, clause: &str, value: impl Into<Value>) {
    self.clauses.push(clause.to_owned());
    self.params.push(Param::One(value.into()));
  }

  fn push_raw(&mut self, clause: &str) { self.clauses.push(clause.to_owned()); }

  /// `column IN (...)`; an empty list matches nothing, `None` adds nothing.
  fn push_in<T, V>(&mut self, column: &str, values: Option<&[T]>, to_value: impl Fn(&T) -> V)
  where
    V: Into<Value>,
  {
    let Some(values) = values else { return };
    if values.is_empty() {
      self.clauses.push("0".to_owned());
      return;
    }
    self.clauses.push(format!("{column} IN rarray(?)"));
    self.params.push(Param::List(values.iter().map(|v| to_value(v).into()).collect()));
  }

  fn push_null_check(&mut self, column: &str, has_value: Option<bool>) {
    match has_value {
      Some(true) => self.push_raw(&format!("{column} IS NOT NULL")),
      Some(false) => self.push_raw(&format!("{column} IS NULL")),
      None => {}
    }
  }

  fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An indicator store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        rusqlite::vtab::array::load_module(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Ingestion writes ──────────────────────────────────────────────────────

  /// Insert a unit, or update the symbol of the unit with the same name.
  pub async fn upsert_unit(&self, name: &str, symbol: &str) -> Result<Unit> {
    let name   = name.to_owned();
    let symbol = symbol.to_owned();

    let (id, name, symbol) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO units (name, symbol) VALUES (?1, ?2)
           ON CONFLICT (name) DO UPDATE SET symbol = excluded.symbol",
          rusqlite::params![name, symbol],
        )?;
        let id: i64 = conn.query_row(
          "SELECT unit_id FROM units WHERE name = ?1",
          rusqlite::params![name],
          |r| r.get(0),
        )?;
        Ok((id, name, symbol))
      })
      .await?;

    Ok(Unit { id: UnitId(id), name, symbol })
  }

  /// Insert a geography, or update the one with the same `(code, parent)`.
  ///
  /// An update without a shape keeps the stored shape.
  pub async fn upsert_geography(&self, input: NewGeography) -> Result<Geography> {
    let shape_json = input.shape.as_ref().map(encode_shape).transpose()?;
    let geo_type   = encode_geo_type(input.geo_type).to_owned();
    let parent_id  = input.parent.map(|p| p.0);
    let name       = input.name;
    let code       = input.code;

    let id: i64 = self
      .conn
      .call(move |conn| {
        let existing: Option<i64> = conn
          .query_row(
            "SELECT geography_id FROM geographies WHERE code = ?1 AND parent_id IS ?2",
            rusqlite::params![code, parent_id],
            |r| r.get(0),
          )
          .optional()?;

        match existing {
          Some(id) => {
            conn.execute(
              "UPDATE geographies
               SET name = ?1, geo_type = ?2, shape_json = COALESCE(?3, shape_json)
               WHERE geography_id = ?4",
              rusqlite::params![name, geo_type, shape_json, id],
            )?;
            Ok(id)
          }
          None => {
            conn.execute(
              "INSERT INTO geographies (name, code, geo_type, parent_id, shape_json)
               VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![name, code, geo_type, parent_id, shape_json],
            )?;
            Ok(conn.last_insert_rowid())
          }
        }
      })
      .await?;

    let filter = GeographyFilter {
      with_shape: true,
      ..GeographyFilter::by_ids([GeographyId(id)])
    };
    self
      .find_geographies(&filter)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| Error::InvalidRow(format!("geography {id}")))
  }

  /// Insert an indicator, or update the one with the same
  /// `(slug, geography_scope)`.
  pub async fn upsert_indicator(&self, input: NewIndicator) -> Result<Indicator> {
    let id: i64 = self
      .conn
      .call(move |conn| {
        let scope_id  = input.geography_scope.map(|g| g.0);
        let unit_id   = input.unit.map(|u| u.0);
        let parent_id = input.parent.map(|p| p.0);

        let existing: Option<i64> = conn
          .query_row(
            "SELECT indicator_id FROM indicators
             WHERE slug = ?1 AND geography_scope_id IS ?2",
            rusqlite::params![input.slug, scope_id],
            |r| r.get(0),
          )
          .optional()?;

        match existing {
          Some(id) => {
            conn.execute(
              "UPDATE indicators SET
                 name = ?1, long_description = ?2, short_description = ?3,
                 category = ?4, unit_id = ?5, parent_id = ?6,
                 display_order = ?7, is_visible = ?8, data_source = ?9
               WHERE indicator_id = ?10",
              rusqlite::params![
                input.name,
                input.long_description,
                input.short_description,
                input.category,
                unit_id,
                parent_id,
                input.display_order,
                input.is_visible,
                input.data_source,
                id,
              ],
            )?;
            Ok(id)
          }
          None => {
            conn.execute(
              "INSERT INTO indicators (
                 name, slug, long_description, short_description, category,
                 unit_id, geography_scope_id, parent_id,
                 display_order, is_visible, data_source
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
              rusqlite::params![
                input.name,
                input.slug,
                input.long_description,
                input.short_description,
                input.category,
                unit_id,
                scope_id,
                parent_id,
                input.display_order,
                input.is_visible,
                input.data_source,
              ],
            )?;
            Ok(conn.last_insert_rowid())
          }
        }
      })
      .await?;

    let filter = IndicatorFilter {
      ids: Some(vec![IndicatorId(id)]),
      ..IndicatorFilter::default()
    };
    self
      .find_indicators(&filter)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| Error::InvalidRow(format!("indicator {id}")))
  }

  /// Replace observations: each `(indicator, geography, period)` in `batch`
  /// is deleted and re-inserted inside one transaction.
  ///
  /// A batch that names the same triple twice is rejected before anything is
  /// written. Returns the number of rows written.
  pub async fn replace_observations(&self, batch: Vec<NewObservation>) -> Result<usize> {
    let mut seen = HashSet::with_capacity(batch.len());
    for obs in &batch {
      if !seen.insert(obs.key()) {
        return Err(Error::DuplicateObservation {
          indicator: obs.indicator,
          geography: obs.geography,
          period:    obs.data_period,
        });
      }
    }

    let now = encode_dt(Utc::now());
    let rows: Vec<(Option<f64>, i64, i64, String)> = batch
      .iter()
      .map(|o| (o.value, o.indicator.0, o.geography.0, encode_period(o.data_period)))
      .collect();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut delete = tx.prepare(
            "DELETE FROM observations
             WHERE indicator_id = ?1 AND geography_id = ?2 AND data_period = ?3",
          )?;
          let mut insert = tx.prepare(
            "INSERT INTO observations (
               value, indicator_id, geography_id, data_period, added, modified
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          )?;
          for (value, indicator_id, geography_id, period) in &rows {
            delete.execute(rusqlite::params![indicator_id, geography_id, period])?;
            insert.execute(rusqlite::params![
              value,
              indicator_id,
              geography_id,
              period,
              now
            ])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    tracing::debug!(written, "replaced observations");
    Ok(written)
  }
}

// ─── IndicatorStore impl ─────────────────────────────────────────────────────

impl IndicatorStore for SqliteStore {
  type Error = Error;

  async fn find_geographies(&self, filter: &GeographyFilter) -> Result<Vec<Geography>> {
    let mut conds = Conditions::default();
    conds.push_in("g.geography_id", filter.ids.as_deref(), |id| id.0);
    conds.push_in("g.code", filter.codes.as_deref(), String::clone);
    if let Some(t) = filter.geo_type {
      conds.push("g.geo_type = ?", encode_geo_type(t).to_owned());
    }
    conds.push_in("g.parent_id", filter.parent_ids.as_deref(), |id| id.0);
    conds.push_in("p.code", filter.parent_codes.as_deref(), String::clone);
    conds.push_null_check("g.parent_id", filter.has_parent);

    let shape_col    = if filter.with_shape { "g.shape_json" } else { "NULL" };
    let where_clause = conds.where_clause();
    let sql = format!(
      "SELECT g.geography_id, g.name, g.code, g.geo_type, g.parent_id, {shape_col}
       FROM geographies g
       LEFT JOIN geographies p ON p.geography_id = g.parent_id
       {where_clause}
       ORDER BY g.name, g.geography_id"
    );
    let params = conds.params;

    let raws: Vec<RawGeography> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(bind(params)), |row| {
            Ok(RawGeography {
              geography_id: row.get(0)?,
              name:         row.get(1)?,
              code:         row.get(2)?,
              geo_type:     row.get(3)?,
              parent_id:    row.get(4)?,
              shape_json:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGeography::into_geography).collect()
  }

  async fn find_indicators(&self, filter: &IndicatorFilter) -> Result<Vec<Indicator>> {
    let mut conds = Conditions::default();
    conds.push_in("i.indicator_id", filter.ids.as_deref(), |id| id.0);
    conds.push_in("i.slug", filter.slugs.as_deref(), String::clone);
    if filter.visible_only {
      conds.push_raw("i.is_visible = 1");
    }
    conds.push_in("p.slug", filter.parent_slugs.as_deref(), String::clone);
    conds.push_null_check("i.parent_id", filter.has_parent);
    if let Some(scope) = filter.geography_scope {
      conds.push("i.geography_scope_id = ?", scope.0);
    }

    let where_clause = conds.where_clause();
    let sql = format!(
      "SELECT
         i.indicator_id, i.name, i.slug, i.long_description,
         i.short_description, i.category,
         u.unit_id, u.name, u.symbol,
         i.geography_scope_id, i.parent_id, i.display_order,
         i.is_visible, i.data_source
       FROM indicators i
       LEFT JOIN units      u ON u.unit_id      = i.unit_id
       LEFT JOIN indicators p ON p.indicator_id = i.parent_id
       {where_clause}
       ORDER BY i.display_order, i.indicator_id"
    );
    let params = conds.params;

    let raws: Vec<RawIndicator> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(bind(params)), |row| {
            Ok(RawIndicator {
              indicator_id:       row.get(0)?,
              name:               row.get(1)?,
              slug:               row.get(2)?,
              long_description:   row.get(3)?,
              short_description:  row.get(4)?,
              category:           row.get(5)?,
              unit_id:            row.get(6)?,
              unit_name:          row.get(7)?,
              unit_symbol:        row.get(8)?,
              geography_scope_id: row.get(9)?,
              parent_id:          row.get(10)?,
              display_order:      row.get(11)?,
              is_visible:         row.get(12)?,
              data_source:        row.get(13)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawIndicator::into_indicator).collect())
  }

  async fn find_observations(&self, filter: &ObservationFilter) -> Result<Vec<Observation>> {
    let mut conds = Conditions::default();
    conds.push_in("o.geography_id", filter.geography_ids.as_deref(), |id| id.0);
    conds.push_in("o.indicator_id", filter.indicator_ids.as_deref(), |id| id.0);
    if let Some(period) = filter.data_period {
      conds.push("o.data_period = ?", encode_period(period));
    }
    conds.push_in("o.data_period", filter.data_period_in.as_deref(), |p| encode_period(*p));

    let where_clause = conds.where_clause();
    let sql = format!(
      "SELECT
         o.observation_id, o.value, o.indicator_id, o.geography_id,
         o.data_period, o.added, o.modified
       FROM observations o
       {where_clause}
       ORDER BY o.observation_id"
    );
    let params = conds.params;

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(bind(params)), |row| {
            Ok(RawObservation {
              observation_id: row.get(0)?,
              value:          row.get(1)?,
              indicator_id:   row.get(2)?,
              geography_id:   row.get(3)?,
              data_period:    row.get(4)?,
              added:          row.get(5)?,
              modified:       row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  async fn distinct_periods(&self) -> Result<Vec<DataPeriod>> {
    let tokens: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT data_period FROM observations ORDER BY data_period",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    tokens.iter().map(|t| decode_period(t)).collect()
  }
}
