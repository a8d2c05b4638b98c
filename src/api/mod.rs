//! HTTP API module for the Tariff Engine.
//!
//! This module provides the REST API endpoints for computing parking fees
//! against configured or inline tariffs.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{FeeRequest, HolidayRequest};
pub use response::{ApiError, TariffListResponse, TariffSummary};
pub use state::AppState;
