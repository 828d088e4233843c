use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub sort_order: Option<SortOrder>,
}

/// Query strings are flat; list queries carry their own page fields.
pub trait Paged {
    fn page_fields(&self) -> (Option<i64>, Option<i64>);

    fn pagination(&self) -> Pagination {
        let (page, per_page) = self.page_fields();
        Pagination { page, per_page }
    }
}

impl Paged for ProductQuery {
    fn page_fields(&self) -> (Option<i64>, Option<i64>) {
        (self.page, self.per_page)
    }
}

impl Paged for OrderListQuery {
    fn page_fields(&self) -> (Option<i64>, Option<i64>) {
        (self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { page: Some(0), per_page: Some(500) };
        assert_eq!(p.normalize(), (1, 100, 0));
        let p = Pagination { page: Some(3), per_page: None };
        assert_eq!(p.normalize(), (3, 20, 40));
    }

    #[test]
    fn flat_query_string_parses() {
        let uri: axum::http::Uri = "/api/products?page=2&per_page=5&min_price=100&sort_by=price"
            .parse()
            .unwrap();
        let axum::extract::Query(q) =
            axum::extract::Query::<ProductQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.pagination().normalize(), (2, 5, 5));
        assert_eq!(q.min_price, Some(100));
        assert!(matches!(q.sort_by, Some(ProductSortBy::Price)));
    }
}
