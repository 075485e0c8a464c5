//! Pagination, batch iteration, upserts, soft delete and eager loading,
//! all layered on the ordinary builder

use super::builder::QueryBuilder;
use super::conflict::OnConflict;
use super::pagination::{BatchWindow, Page, PageRequest};
use super::sql_generation::SqlGenerator;
use super::update::UpdateSet;
use crate::errors::QueryError;
use crate::traits::TableMetadata;
use crate::value::{FieldMap, QueryValue};
use crate::{debug_log, trace_log};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::future::Future;

/// A root row with its eager-loaded relations
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub record: T,
    /// Related rows as JSON objects, keyed by relation name
    pub relations: BTreeMap<String, Vec<Value>>,
}

impl<T> Loaded<T> {
    pub fn relation(&self, name: &str) -> &[Value] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<'a, T: TableMetadata> QueryBuilder<'a, T> {
    /// One page of rows plus the total match count
    ///
    /// `page` is clamped to at least 1 and `page_size` to `1..=100`. Runs a
    /// COUNT and then the windowed SELECT under one deadline. Rows are
    /// ordered by primary key unless an ORDER BY was given.
    pub async fn paginate(mut self, page: i64, page_size: i64) -> Result<Page<T>, QueryError> {
        let request = PageRequest::new(page, page_size);
        let ctx = self.context();
        self.state.ensure_stable_order();

        let total = self.fetch_count(&ctx).await?;
        self.state.limit = Some(request.limit());
        self.state.offset = Some(request.offset());
        let data = self.fetch_rows(&ctx).await?;

        Ok(Page {
            data,
            page: request.page,
            page_size: request.page_size,
            total,
        })
    }

    /// Feed matching rows to `f` in batches of `batch_size`
    ///
    /// Stops after the first short batch. Rows are ordered by primary key
    /// unless an ORDER BY was given. A callback error aborts the iteration
    /// and is returned as [`QueryError::Batch`] with the batch's offset.
    /// Returns the number of rows processed.
    pub async fn chunk<F, Fut, E>(mut self, batch_size: u64, mut f: F) -> Result<u64, QueryError>
    where
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.state.ensure_stable_order();
        let ctx = self.context();
        let mut window = BatchWindow::new(batch_size);
        let mut processed = 0u64;

        loop {
            let offset = window.offset();
            self.state.limit = Some(window.batch_size);
            self.state.offset = Some(offset);

            let rows = self.fetch_rows(&ctx).await?;
            let fetched = rows.len();
            trace_log!("batch at offset {} returned {} rows", offset, fetched);
            if fetched == 0 {
                break;
            }

            f(rows).await.map_err(|e| QueryError::Batch {
                offset,
                source: e.into(),
            })?;
            processed += fetched as u64;

            if window.is_last(fetched) {
                break;
            }
            window.advance();
        }

        Ok(processed)
    }

    /// Like [`QueryBuilder::chunk`], one row at a time
    pub async fn batch_process<F, Fut, E>(self, batch_size: u64, mut f: F) -> Result<u64, QueryError>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.chunk(batch_size, |rows| {
            let futures: Vec<Fut> = rows.into_iter().map(&mut f).collect();
            async move {
                for fut in futures {
                    fut.await?;
                }
                Ok::<(), E>(())
            }
        })
        .await
    }

    /// Insert or resolve a conflict on the explicit target
    ///
    /// Returns the stored row, or `None` when `do_nothing` skipped it.
    pub async fn upsert(mut self, record: &T, on_conflict: OnConflict) -> Result<Option<T>, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::insert(
            &self.state.table,
            &[record.to_field_map()],
            Some(&on_conflict),
            true,
        )?;
        Ok(self.run_returning(&ctx, &stmt).await?.into_iter().next())
    }

    /// Multi-row upsert; returns the number of rows inserted or updated
    pub async fn bulk_upsert(mut self, records: &[T], on_conflict: OnConflict) -> Result<u64, QueryError> {
        if records.is_empty() {
            return Ok(0);
        }
        let ctx = self.context();
        let rows: Vec<FieldMap> = records.iter().map(TableMetadata::to_field_map).collect();
        let stmt = SqlGenerator::insert(&self.state.table, &rows, Some(&on_conflict), false)?;
        self.run_statement(&ctx, &stmt).await
    }

    /// Set the soft-delete column to now for the row with this primary key
    pub async fn soft_delete(self, id: impl Into<QueryValue>) -> Result<u64, QueryError> {
        let set = UpdateSet::new().set(T::soft_delete_field(), Utc::now());
        self.where_id(id).update(set).await
    }

    /// Clear the soft-delete column for the row with this primary key
    pub async fn restore(self, id: impl Into<QueryValue>) -> Result<u64, QueryError> {
        let set = UpdateSet::new().set(T::soft_delete_field(), QueryValue::Null);
        self.where_id(id).update(set).await
    }

    /// Matching rows with every relation named by `with_relation` loaded
    ///
    /// Issues the main SELECT, then one query per relation for all root rows.
    pub async fn all_loaded(mut self) -> Result<Vec<Loaded<T>>, QueryError> {
        let relations = self
            .state
            .relations
            .iter()
            .map(|name| {
                T::relation(name).ok_or_else(|| {
                    QueryError::validation(format!(
                        "unknown relation '{}' on {}",
                        name,
                        T::table_name()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = self.context();
        let rows = self.fetch_rows(&ctx).await?;
        let mut loaded: Vec<Loaded<T>> = rows
            .into_iter()
            .map(|record| Loaded {
                record,
                relations: BTreeMap::new(),
            })
            .collect();

        for relation in relations {
            let keys: Vec<QueryValue> = loaded
                .iter()
                .map(|l| relation_key(&l.record, relation.local_key))
                .filter(|k| !k.is_null())
                .collect();

            let related = if keys.is_empty() {
                Vec::new()
            } else {
                let stmt = SqlGenerator::relation_load(relation, &keys)?;
                self.fetch_json(&ctx, &stmt).await?
            };
            debug_log!("relation {} loaded {} rows", relation.name, related.len());

            for entry in &mut loaded {
                let key = relation_key(&entry.record, relation.local_key).to_json();
                let matches: Vec<Value> = related
                    .iter()
                    .filter(|row| !key.is_null() && row.get(relation.foreign_key) == Some(&key))
                    .cloned()
                    .collect();
                entry.relations.insert(relation.name.to_string(), matches);
            }
        }

        Ok(loaded)
    }
}

/// Value of the root row's side of a relation
fn relation_key<T: TableMetadata>(record: &T, local_key: Option<&str>) -> QueryValue {
    match local_key {
        Some(column) => record
            .to_field_map()
            .get(column)
            .cloned()
            .unwrap_or(QueryValue::Null),
        None => record.primary_key_value(),
    }
}
