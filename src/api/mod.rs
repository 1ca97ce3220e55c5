mod handlers;
mod routes;

pub use handlers::{
    AppState, CohortRequest, CohortResponse, ErrorResponse, RatesRequest, RatesResponse,
    ReportQuery,
};
pub use routes::create_api_router;
