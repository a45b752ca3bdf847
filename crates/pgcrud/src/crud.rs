//! Single-table CRUD façade over the statement builders.
//!
//! Every operation has a `*_query` form that only builds the statement, and
//! an async form that runs it on any [`GenericClient`] with the tag
//! `"<table>.<operation>"` attached to its log event.
//!
//! ```ignore
//! let articles = Crud::new(&articles_table);
//! let row = articles
//!     .create(&client, RowData::new().with("title", "hello"))
//!     .await?;
//! let all = articles
//!     .retrieve_all(&client, &RetrieveParams::new().condition(Cond::new("author_id", 7)))
//!     .await?;
//! ```

use crate::client::GenericClient;
use crate::entity::TableRef;
use crate::error::{OrmError, OrmResult};
use crate::executor::{DEFAULT_LOG_SQL_MAX_LENGTH, QueryOutcome, execute_tagged};
use crate::qb::{self, BuiltQuery, Conjunction, RawAssignment, WhereGroup, WhereItem};
use crate::row_data::RowData;
use crate::value::Value;
use tokio_postgres::Row;

/// Per-call options of read and write operations.
#[derive(Clone, Debug, Default)]
pub struct RetrieveParams {
    /// Projected fields; all declared fields when `None`.
    pub fields: Option<Vec<String>>,
    /// Structured conditions, ANDed after the row-data id predicate.
    pub conditions: Vec<WhereItem>,
    /// Raw predicate placed before the structured ones.
    pub where_raw: Option<String>,
    /// `RETURNING *` for update / delete / mark-deleted. Off when `None`.
    pub use_returning: Option<bool>,
}

impl RetrieveParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn condition(mut self, item: impl Into<WhereItem>) -> Self {
        self.conditions.push(item.into());
        self
    }

    pub fn where_raw(mut self, text: impl Into<String>) -> Self {
        self.where_raw = Some(text.into());
        self
    }

    pub fn use_returning(mut self, enabled: bool) -> Self {
        self.use_returning = Some(enabled);
        self
    }

    /// Read `__fields`, `__where`, `__whereRaw` and `__useReturning` from a
    /// JSON object. Other keys are ignored.
    pub fn from_json(value: &serde_json::Value) -> OrmResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| OrmError::invalid_where(format!("options must be an object, got {}", value)))?;
        let mut params = Self::new();

        if let Some(fields) = obj.get("__fields") {
            let list = fields
                .as_array()
                .ok_or_else(|| OrmError::invalid_where("__fields must be an array of names"))?;
            let names = list
                .iter()
                .map(|f| {
                    f.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| OrmError::invalid_where(format!("field name must be a string, got {}", f)))
                })
                .collect::<OrmResult<Vec<_>>>()?;
            params.fields = Some(names);
        }
        if let Some(conditions) = obj.get("__where") {
            let group = WhereGroup::from_json(conditions, Conjunction::And)?;
            if !group.is_empty() {
                params.conditions.push(group.into());
            }
        }
        if let Some(raw) = obj.get("__whereRaw").and_then(|v| v.as_str()) {
            params.where_raw = Some(raw.to_string());
        }
        if let Some(flag) = obj.get("__useReturning").and_then(|v| v.as_bool()) {
            params.use_returning = Some(flag);
        }
        Ok(params)
    }

    fn has_predicate(&self) -> bool {
        !self.conditions.is_empty() || self.where_raw.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

macro_rules! apply_params {
    ($builder:expr, $params:expr) => {{
        let mut builder = $builder;
        for item in &$params.conditions {
            builder = match item {
                WhereItem::Cond(cond) => builder.filter(cond.clone()),
                WhereItem::Group(group) => builder.where_group(group.clone()),
            };
        }
        if let Some(raw) = &$params.where_raw {
            builder = builder.where_raw(raw.clone());
        }
        builder
    }};
}

/// CRUD operations on one entity.
#[derive(Clone, Debug)]
pub struct Crud {
    table: TableRef,
    mark_deleted: Vec<RawAssignment>,
    use_returning: Option<bool>,
    log_sql_max_length: usize,
}

impl Crud {
    /// Façade over `table`. Timestamp-enabled tables are marked deleted with
    /// `deleted_at = now()`.
    pub fn new(table: &TableRef) -> Self {
        let options = table.options();
        let mark_deleted = if options.use_timestamp {
            vec![RawAssignment::new(options.deleted_at_field, "now()")]
        } else {
            Vec::new()
        };
        Self {
            table: table.clone(),
            mark_deleted,
            use_returning: None,
            log_sql_max_length: DEFAULT_LOG_SQL_MAX_LENGTH,
        }
    }

    /// Replace the assignments applied by [`mark_deleted`](Self::mark_deleted).
    pub fn mark_deleted_with(mut self, assignments: impl IntoIterator<Item = RawAssignment>) -> Self {
        self.mark_deleted = assignments.into_iter().collect();
        self
    }

    /// `RETURNING *` on create. Defaults to the entity's `use_returning` option.
    pub fn use_returning(mut self, enabled: bool) -> Self {
        self.use_returning = Some(enabled);
        self
    }

    pub fn log_sql_max_length(mut self, len: usize) -> Self {
        self.log_sql_max_length = len;
        self
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    fn id_field(&self) -> String {
        self.table.options().id_field
    }

    /// Coerce values of fields that carry metadata.
    fn prepare(&self, data: RowData) -> RowData {
        let Some(named) = self.table.as_named() else {
            return data;
        };
        data.iter()
            .map(|(field, value)| {
                let value = match named.meta(field) {
                    Some(meta) => meta.fix_value(value.clone()),
                    None => value.clone(),
                };
                (field.to_string(), value)
            })
            .collect()
    }

    async fn run(&self, conn: &impl GenericClient, query: &BuiltQuery, op: &str) -> QueryOutcome {
        let tag = format!("{}.{}", self.table.name().unwrap_or("derived"), op);
        execute_tagged(conn, query, Some(&tag), self.log_sql_max_length).await
    }

    // ==================== Create ====================

    /// INSERT, or `None` when no declared field is present.
    pub fn create_query(&self, data: RowData) -> Option<BuiltQuery> {
        qb::insert(&self.table, "")
            .row_data(&self.table, self.prepare(data))
            .returning(
                self.use_returning
                    .unwrap_or_else(|| self.table.options().use_returning),
            )
            .build()
    }

    /// Insert `data`. The created row comes back only when `RETURNING *` is on.
    pub async fn create(&self, conn: &impl GenericClient, data: RowData) -> OrmResult<Option<Row>> {
        match self.create_query(data) {
            Some(query) => self.run(conn, &query, "create").await.into_first(),
            None => Ok(None),
        }
    }

    // ==================== Retrieve ====================

    /// SELECT by id.
    pub fn retrieve_query(&self, id: impl Into<Value>) -> BuiltQuery {
        qb::select(&self.table, "")
            .where_eq(&self.table, self.id_field(), id)
            .build()
    }

    /// SELECT with explicit fields and conditions.
    pub fn retrieve_with_query(&self, params: &RetrieveParams) -> BuiltQuery {
        let mut select = qb::select(&self.table, "");
        if let Some(fields) = &params.fields {
            select = select.select_fields(&self.table, fields.iter().cloned());
        }
        apply_params!(select, params).build()
    }

    pub async fn retrieve(&self, conn: &impl GenericClient, id: impl Into<Value>) -> OrmResult<Option<Row>> {
        let query = self.retrieve_query(id);
        self.run(conn, &query, "retrieve").await.into_first()
    }

    pub async fn retrieve_with(&self, conn: &impl GenericClient, params: &RetrieveParams) -> OrmResult<Option<Row>> {
        let query = self.retrieve_with_query(params);
        self.run(conn, &query, "retrieve").await.into_first()
    }

    pub async fn retrieve_all(&self, conn: &impl GenericClient, params: &RetrieveParams) -> OrmResult<Vec<Row>> {
        let query = self.retrieve_with_query(params);
        self.run(conn, &query, "retrieve_all").await.into_rows()
    }

    // ==================== Update ====================

    /// UPDATE of the declared fields in `data`, keyed by its id.
    pub fn update_query(&self, data: RowData, params: &RetrieveParams) -> Option<BuiltQuery> {
        let update = qb::update(&self.table, "")
            .row_data(&self.table, self.prepare(data))
            .returning(params.use_returning.unwrap_or(false));
        apply_params!(update, params).build()
    }

    /// Update and return the first returned row. With nothing to assign the
    /// row is read back by id instead.
    pub async fn update(&self, conn: &impl GenericClient, data: RowData, params: &RetrieveParams) -> OrmResult<Option<Row>> {
        let id = data.get(&self.id_field()).filter(|v| !v.is_empty()).cloned();
        match self.update_query(data, params) {
            Some(query) => self.run(conn, &query, "update").await.into_first(),
            None => match id {
                Some(id) => self.retrieve(conn, id).await,
                None => Ok(None),
            },
        }
    }

    /// UPDATE of the fields that differ between `previous` and `current`.
    ///
    /// The id is taken from `current`, else from `previous`.
    pub fn update_changes_query(
        &self,
        previous: &RowData,
        current: &RowData,
        params: &RetrieveParams,
    ) -> Option<BuiltQuery> {
        self.update_query(self.changes(previous, current), params)
    }

    pub async fn update_changes(
        &self,
        conn: &impl GenericClient,
        previous: &RowData,
        current: &RowData,
        params: &RetrieveParams,
    ) -> OrmResult<Option<Row>> {
        self.update(conn, self.changes(previous, current), params).await
    }

    fn changes(&self, previous: &RowData, current: &RowData) -> RowData {
        let id_field = self.id_field();
        let mut diff = current.changes_from(previous);
        if let Some(id) = current.get(&id_field).or_else(|| previous.get(&id_field)) {
            diff.set(id_field, id.clone());
        }
        diff
    }

    // ==================== Delete ====================

    /// DELETE keyed by the id in `data` and the conditions in `params`.
    ///
    /// Fails when neither supplies a predicate.
    pub fn delete_query(&self, data: RowData, params: &RetrieveParams) -> OrmResult<BuiltQuery> {
        let id_field = self.id_field();
        let keyed = data.get(&id_field).is_some_and(|v| !v.is_empty());
        if !keyed && !params.has_predicate() {
            return Err(OrmError::invalid_where(format!(
                "refusing to delete from {} without a predicate",
                self.table.name().unwrap_or("derived")
            )));
        }
        let delete = qb::delete(&self.table, "")
            .row_data(&self.table, data)
            .returning(params.use_returning.unwrap_or(false));
        Ok(apply_params!(delete, params).build())
    }

    pub async fn delete(&self, conn: &impl GenericClient, data: RowData, params: &RetrieveParams) -> OrmResult<Option<Row>> {
        let query = self.delete_query(data, params)?;
        self.run(conn, &query, "delete").await.into_first()
    }

    /// UPDATE applying the mark-deleted assignments, plus any fields in `data`.
    pub fn mark_deleted_query(&self, data: RowData, params: &RetrieveParams) -> Option<BuiltQuery> {
        let update = qb::update(&self.table, "")
            .row_data(&self.table, self.prepare(data))
            .raw_values(self.mark_deleted.iter().cloned())
            .returning(params.use_returning.unwrap_or(false));
        apply_params!(update, params).build()
    }

    pub async fn mark_deleted(&self, conn: &impl GenericClient, data: RowData, params: &RetrieveParams) -> OrmResult<Option<Row>> {
        match self.mark_deleted_query(data, params) {
            Some(query) => self.run(conn, &query, "mark_deleted").await.into_first(),
            None => Ok(None),
        }
    }
}
