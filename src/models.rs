use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters of list endpoints.
///
/// # Filtering
/// Any other query key filters on a field of the same name:
/// - **Equality:** `?housing=true`
/// - **Comparison:** `?averageCost[lte]=10000`, with `gt`, `gte`, `lt` or `lte`
/// - **Membership:** `?careers[in]=Business,UI/UX`
/// - **Nested fields:** `?location.state=MA`
///
/// Values are converted to the field's declared type; a value that does not
/// convert is rejected with 400.
///
/// # Pagination
/// `page` is 1-based. The response's `pagination.next`/`pagination.prev`
/// give the neighbouring pages when they exist.
///
/// # Sorting
/// Comma separated fields, `-` prefix for descending:
/// ```text
/// sort=-averageCost,name
/// ```
#[derive(Debug, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Comma separated fields to return. The `id` is always included.
    #[param(example = "name,description")]
    pub select: Option<String>,
    /// Sort order; defaults to newest first (`-createdAt`).
    #[param(example = "-averageCost,name")]
    pub sort: Option<String>,
    /// Page number (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Page size, capped by the server's maximum.
    #[param(example = 25)]
    pub limit: Option<u64>,
}

/// Path of the radius search.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct RadiusParams {
    /// Address or postal code at the center of the search.
    #[param(example = "02118")]
    pub zipcode: String,
    /// Radius, in the server's configured distance unit.
    #[param(example = "10")]
    pub distance: String,
}
