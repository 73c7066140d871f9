use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_select::FilterSelect;
use super::filter_where::FilterWhere;
use super::operators::translate_operators;
use super::pagination::Pagination;
use super::params::QueryParams;
use super::types::{FieldDef, FilterOrderInfo, FilterPredicate, Projection};
use crate::config::QueryConfig;

/// A compiled list query: predicate, projection, order and page window.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    where_data: FilterPredicate,
    projection: Projection,
    order_data: Vec<FilterOrderInfo>,
    pagination: Pagination,
}

impl Filter {
    /// Compile a raw URL query string against a resource's field catalog.
    pub fn from_query(
        raw: Option<&str>,
        fields: &[FieldDef],
        config: &QueryConfig,
    ) -> Result<Self, FilterError> {
        let params = QueryParams::parse(raw.unwrap_or_default(), config.max_nested_depth)?;
        Self::from_params(params, fields, config)
    }

    pub fn from_params(
        params: QueryParams,
        fields: &[FieldDef],
        config: &QueryConfig,
    ) -> Result<Self, FilterError> {
        let (candidates, reserved) = params.split_reserved()?;
        let where_data = FilterWhere::build(translate_operators(candidates)?, fields)?;
        let projection = FilterSelect::parse(reserved.select.as_deref(), fields)?;
        let order_data = FilterOrder::parse(reserved.sort.as_deref(), fields)?;
        let pagination =
            Pagination::from_params(reserved.page.as_deref(), reserved.limit.as_deref(), config);

        if config.debug_logging {
            tracing::debug!(
                conditions = where_data.conditions.len(),
                select = ?projection.fields,
                page = pagination.page(),
                limit = pagination.limit(),
                "compiled list query"
            );
        }

        Ok(Self {
            where_data,
            projection,
            order_data,
            pagination,
        })
    }

    pub fn predicate(&self) -> &FilterPredicate {
        &self.where_data
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn order(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }
}
