//! Grid pipeline.
//!
//! A grid runs its stages once, in order: select, total count, filters,
//! filtered count, sort, pagination, hydration. Each stage mutates the query
//! and records what it derived in [`Parameters`]. Stages may be driven one by
//! one, but never repeated or run backwards. Attribute discovery belongs to
//! source validation and runs before all of them.

use std::sync::Arc;

use grid_core::{
    calculate_pages, calculate_pagination, AppliedFilter, FilterParser, PaginationMethod,
    Parameters, RequestProvider,
};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::attributes::AttributeStore;
use crate::hydrate::shape_row;
use crate::predicate::PredicateCompiler;
use crate::settings::Settings;
use crate::sort::SortCompiler;
use crate::source::{DataSource, GridQuery, Row, SelectItem, SqlQuery};
use crate::{GridError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    SourceValidated,
    Selected,
    TotalCounted,
    Filtered,
    Counted,
    Sorted,
    Paginated,
    Hydrated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip to return every filtered row.
    pub paginate: bool,
    /// Hard cap on fetched rows; overrides the page size when set.
    pub max_results: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            paginate: true,
            max_results: None,
        }
    }
}

/// Final output: derived parameters plus the rows of the current page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridResult {
    pub parameters: Parameters,
    pub rows: Vec<Row>,
}

pub struct DataGrid<Q, P> {
    query: Q,
    settings: Settings,
    request: P,
    attributes: Option<Arc<dyn AttributeStore>>,
    parameters: Parameters,
    rows: Vec<Row>,
    stage: Stage,
}

impl<C, P> DataGrid<SqlQuery<C>, P>
where
    C: ConnectionTrait + Send + Sync,
    P: RequestProvider + Send + Sync,
{
    /// Validates `source` and prepares a grid over it.
    pub fn new(source: DataSource<C>, settings: Settings, request: P) -> Result<Self> {
        let query = source.validate()?;
        debug!(kind = ?query.kind(), table = query.table_name(), "grid source validated");
        Ok(Self::from_query(query, settings, request))
    }
}

impl<Q, P> DataGrid<Q, P>
where
    Q: GridQuery,
    P: RequestProvider + Send + Sync,
{
    /// Grid over an already validated query.
    pub fn from_query(query: Q, settings: Settings, request: P) -> Self {
        Self {
            query,
            settings,
            request,
            attributes: None,
            parameters: Parameters::default(),
            rows: Vec::new(),
            stage: Stage::SourceValidated,
        }
    }

    /// Store used to discover EAV attribute keys and resolve attribute filters.
    pub fn with_attribute_store(mut self, store: Arc<dyn AttributeStore>) -> Self {
        self.attributes = Some(store);
        self
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Q {
        &mut self.query
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) -> Result<()> {
        if stage <= self.stage {
            return Err(GridError::StageOrder {
                stage,
                current: self.stage,
            });
        }
        self.stage = stage;
        Ok(())
    }

    /// Merges the attribute keys the store defines for the model's entity type
    /// into the model, so they are neither selected nor filtered as columns.
    ///
    /// Part of source validation: it has to run before the select stage.
    /// Without a store or a model there is nothing to discover.
    pub async fn prepare_attributes(&mut self) -> Result<()> {
        if self.stage > Stage::SourceValidated {
            return Err(GridError::StageOrder {
                stage: Stage::SourceValidated,
                current: self.stage,
            });
        }
        let (Some(store), Some(entity_type)) = (
            self.attributes.as_ref(),
            self.query.model().map(|m| m.entity_type.clone()),
        ) else {
            return Ok(());
        };

        let keys = store.available_attributes(&entity_type).await?;
        debug!(entity_type = %entity_type, keys = keys.len(), "attributes discovered");
        if let Some(model) = self.query.model_mut() {
            model.merge_attributes(keys);
        }
        Ok(())
    }

    /// Adds configured columns to the select list, skipping names that only
    /// exist on the model (appends, EAV attributes) and relation paths.
    pub fn prepare_select(&mut self) -> Result<()> {
        self.advance(Stage::Selected)?;

        let model = self.query.model();
        let items: Vec<SelectItem> = self
            .settings
            .columns
            .iter()
            .filter(|entry| !entry.column.contains(".."))
            .filter(|entry| {
                let exposed = entry.exposed();
                !model.is_some_and(|m| m.is_append(exposed) || m.is_attribute(exposed))
            })
            .map(|entry| SelectItem {
                column: entry.column.clone(),
                alias: entry.alias.clone(),
            })
            .collect();

        debug!(columns = items.len(), "select prepared");
        self.query.add_select(&items);
        Ok(())
    }

    pub async fn prepare_total_count(&mut self) -> Result<()> {
        self.advance(Stage::TotalCounted)?;
        self.parameters.total = self.query.count().await?;
        debug!(total = self.parameters.total, "total counted");
        Ok(())
    }

    pub async fn prepare_filters(&mut self) -> Result<()> {
        self.advance(Stage::Filtered)?;

        let raw = self.request.filters();
        let parsed =
            FilterParser::new(&self.settings.columns, self.query.supports_regex()).parse(&raw);
        let compiler = PredicateCompiler::new(
            self.query.backend(),
            &self.settings.columns,
            self.query.model(),
        )
        .with_attributes(self.attributes.clone());

        let mut applied = Vec::with_capacity(parsed.columns.len() + parsed.globals.len());

        for filter in &parsed.columns {
            match self.settings.custom_filter(&filter.column) {
                Some(custom) => custom(self.query.statement_mut(), filter.operator, &filter.value),
                None => compiler.apply(&mut self.query, filter).await?,
            }
            applied.push(AppliedFilter::from(filter));
        }

        for filter in &parsed.globals {
            match &self.settings.global {
                Some(custom) => custom(self.query.statement_mut(), filter.operator, &filter.value),
                None => compiler.apply_global(&mut self.query, filter).await?,
            }
            applied.push(AppliedFilter::from(filter));
        }

        debug!(
            columns = parsed.columns.len(),
            globals = parsed.globals.len(),
            "filters applied"
        );
        self.parameters.filters = applied;
        Ok(())
    }

    /// Recounts only when a filter was applied.
    pub async fn prepare_filtered_count(&mut self) -> Result<()> {
        self.advance(Stage::Counted)?;
        self.parameters.filtered = if self.parameters.filters.is_empty() {
            self.parameters.total
        } else {
            self.query.count().await?
        };
        debug!(filtered = self.parameters.filtered, "filtered counted");
        Ok(())
    }

    pub fn prepare_sort(&mut self) -> Result<()> {
        self.advance(Stage::Sorted)?;
        let sorter = SortCompiler::new(&self.settings);
        let sorts = sorter.effective(self.request.sort());
        self.parameters.sort = sorter.apply(&mut self.query, &sorts)?;
        Ok(())
    }

    /// Computes the page layout and limits the query to the requested page.
    ///
    /// Nothing happens for an empty result or when `paginate` is false.
    pub fn prepare_pagination(&mut self, paginate: bool) -> Result<()> {
        self.advance(Stage::Paginated)?;

        let filtered = self.parameters.filtered;
        if filtered == 0 || !paginate {
            return Ok(());
        }

        let method = self.resolve_method();
        let throttle = self
            .request
            .throttle()
            .or(self.settings.throttle)
            .unwrap_or_else(|| self.request.default_throttle());
        let threshold = self
            .request
            .threshold()
            .or(self.settings.threshold)
            .unwrap_or_else(|| self.request.default_threshold());
        let page = self.request.page().unwrap_or(1);

        let layout = calculate_pagination(filtered, method, threshold, throttle)?;
        let window = calculate_pages(filtered, page.min(layout.pages), layout.per_page);

        debug!(
            %method,
            pages = layout.pages,
            per_page = layout.per_page,
            page = window.page,
            "pagination prepared"
        );

        self.query.for_page(window.page, layout.per_page);
        self.parameters.set_pagination(layout, window);
        self.parameters.method = Some(method);
        self.parameters.throttle = Some(throttle);
        self.parameters.threshold = Some(threshold);
        Ok(())
    }

    fn resolve_method(&self) -> PaginationMethod {
        match self.request.method() {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(method = %raw, "unknown pagination method, using single");
                PaginationMethod::Single
            }),
            None => self
                .settings
                .method
                .unwrap_or_else(|| self.request.default_method()),
        }
    }

    /// Fetches rows and shapes them with the transformer or the default shaping.
    pub async fn hydrate(&mut self, max_results: Option<u64>) -> Result<()> {
        self.advance(Stage::Hydrated)?;

        if let Some(max) = max_results.filter(|m| *m > 0) {
            self.query.limit(max);
        }

        let rows = self.query.fetch().await?;
        let hidden = self
            .query
            .model()
            .map(|m| m.hidden.clone())
            .unwrap_or_default();

        self.rows = match &self.settings.transformer {
            Some(transform) => rows.into_iter().map(|row| transform(row)).collect(),
            None => rows.into_iter().map(|row| shape_row(row, &hidden)).collect(),
        };
        debug!(rows = self.rows.len(), "rows hydrated");
        Ok(())
    }

    pub async fn run(self) -> Result<GridResult> {
        self.run_with(RunOptions::default()).await
    }

    #[instrument(
        name = "datagrid.run",
        skip_all,
        fields(paginate = options.paginate, max_results = ?options.max_results)
    )]
    pub async fn run_with(mut self, options: RunOptions) -> Result<GridResult> {
        self.prepare_attributes().await?;
        self.prepare_select()?;
        self.prepare_total_count().await?;
        self.prepare_filters().await?;
        self.prepare_filtered_count().await?;
        self.prepare_sort()?;
        self.prepare_pagination(options.paginate)?;
        self.hydrate(options.max_results).await?;
        Ok(self.into_result())
    }

    pub fn into_result(self) -> GridResult {
        GridResult {
            parameters: self.parameters,
            rows: self.rows,
        }
    }
}
