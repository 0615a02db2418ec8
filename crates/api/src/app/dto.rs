use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use akademi_core::{PageParams, Paginated};

/// Raw pagination query params. Kept as strings so garbage coerces to the
/// defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

/// `{message, data}` envelope for single-resource responses.
pub fn data_response(
    status: StatusCode,
    message: &str,
    data: impl Serialize,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

/// `{message, data, paginate}` envelope for list responses.
pub fn list_response(message: &str, page: Paginated<impl Serialize>) -> axum::response::Response {
    (
        StatusCode::OK,
        axum::Json(json!({
            "message": message,
            "data": page.items,
            "paginate": {
                "page": page.page,
                "limit": page.limit,
                "total_data": page.total_data,
                "total_pages": page.total_pages,
            },
        })),
    )
        .into_response()
}
