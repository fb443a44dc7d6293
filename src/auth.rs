use actix_web::{dev::Payload, Error as ActixWebError, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Request-scoped identity of the caller, resolved from the `X-User-Id`
/// header set by the authentication layer in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

fn user_id_from_request(req: &HttpRequest) -> Result<Uuid, ActixWebError> {
    let header_value = req.headers().get(USER_ID_HEADER).ok_or_else(|| {
        log::warn!("{} header was NOT found in request headers.", USER_ID_HEADER);
        actix_web::error::ErrorUnauthorized(format!(
            "Missing {} header. Authentication required.",
            USER_ID_HEADER
        ))
    })?;

    let raw = header_value.to_str().map_err(|_| {
        log::warn!("{} header is not valid UTF-8.", USER_ID_HEADER);
        actix_web::error::ErrorBadRequest(format!(
            "{} header contains invalid characters.",
            USER_ID_HEADER
        ))
    })?;

    if raw.is_empty() {
        log::warn!("{} header is present but empty.", USER_ID_HEADER);
        return Err(actix_web::error::ErrorBadRequest(format!(
            "{} header cannot be empty.",
            USER_ID_HEADER
        )));
    }

    Uuid::parse_str(raw).map_err(|parse_err| {
        log::warn!("Failed to parse {} '{}' to UUID: {}", USER_ID_HEADER, raw, parse_err);
        actix_web::error::ErrorBadRequest(format!(
            "Invalid {} header format (not a valid UUID).",
            USER_ID_HEADER
        ))
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixWebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(user_id_from_request(req).map(|id| AuthenticatedUser { id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn valid_header_yields_user() {
        let uid = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, uid.to_string()))
            .to_http_request();

        let user = AuthenticatedUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(user.id, uid);
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();

        let err = AuthenticatedUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn malformed_uuid_is_bad_request() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();

        let err = AuthenticatedUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn empty_header_is_bad_request() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, ""))
            .to_http_request();

        let err = AuthenticatedUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
