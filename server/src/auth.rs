//! HTTP Basic authentication for every backend route. The credential pair
//! comes from the environment-backed server config.

use actix_web::dev::ServiceRequest;
use actix_web::error::ErrorUnauthorized;
use actix_web::{web, Error};
use actix_web_httpauth::extractors::basic::BasicAuth;
use log::warn;

use crate::server::AppState;

pub async fn validate_basic_auth(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let state = match req.app_data::<web::Data<AppState>>() {
        Some(state) => state,
        None => {
            return Err((ErrorUnauthorized("missing server state"), req));
        }
    };

    let expected_user = state.config.basic_auth_username.as_str();
    let expected_password = state.config.basic_auth_password.as_str();

    let authorized = credentials.user_id() == expected_user
        && credentials.password() == Some(expected_password);

    if authorized {
        Ok(req)
    } else {
        warn!("Rejected request with invalid credentials");
        Err((ErrorUnauthorized("invalid credentials"), req))
    }
}
