use super::*;

#[derive(Clone)]
pub(super) struct ApiSecurity {
    pub required_token: Option<String>,
    pub rate_limit_per_sec: u32,
    pub buckets: Arc<Mutex<HashMap<String, RateBucket>>>,
}

#[derive(Clone)]
pub(super) struct RateBucket {
    pub window_start: std::time::Instant,
    pub count: u32,
}

impl ApiSecurity {
    pub(super) fn from_settings(settings: &ApiSettings) -> Self {
        Self {
            required_token: settings.token.clone(),
            rate_limit_per_sec: settings.rate_limit_per_sec.max(1),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub(super) async fn api_guard(
    State(security): State<ApiSecurity>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    if let Some(expected_token) = security.required_token.as_deref() {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .unwrap_or("")
        };
        let auth_header = header("authorization");
        let api_key_header = header("x-api-key");
        let bearer = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .unwrap_or(auth_header);

        if bearer != expected_token && api_key_header != expected_token {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::err(
                    "Unauthorized: send Authorization: Bearer <ONBOARD_API_TOKEN>",
                )),
            )
                .into_response();
        }
    }

    let key = req
        .headers()
        .get("x-forwarded-for")
        .or_else(|| req.headers().get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("local")
        .to_string();

    {
        let mut buckets = security
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = std::time::Instant::now();
        let entry = buckets.entry(key).or_insert(RateBucket {
            window_start: now,
            count: 0,
        });
        if now.duration_since(entry.window_start).as_secs_f32() >= 1.0 {
            entry.window_start = now;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        if entry.count > security.rate_limit_per_sec {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiResponse::err("Rate limit exceeded")),
            )
                .into_response();
        }

        if buckets.len() > 4096 {
            buckets.retain(|_, v| now.duration_since(v.window_start).as_secs_f32() < 10.0);
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::Request as HttpRequest, routing::get};
    use tower::util::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn guarded(token: Option<&str>, rate: u32) -> Router {
        let security = ApiSecurity::from_settings(&ApiSettings {
            enabled: true,
            addr: ([127, 0, 0, 1], 0).into(),
            token: token.map(str::to_string),
            rate_limit_per_sec: rate,
        });
        Router::new()
            .route("/", get(ok_handler))
            .layer(middleware::from_fn_with_state(security, api_guard))
    }

    fn request(header: Option<(&str, &str)>) -> HttpRequest<axum::body::Body> {
        let mut builder = HttpRequest::builder().uri("/").header("x-real-ip", "10.0.0.7");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(axum::body::Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn token_is_required_when_configured() {
        let app = guarded(Some("secret"), 100);
        let res = app.clone().oneshot(request(None)).await.expect("response");
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .clone()
            .oneshot(request(Some(("authorization", "Bearer nope"))))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .oneshot(request(Some(("x-api-key", "secret"))))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn requests_past_the_rate_limit_are_rejected() {
        let app = guarded(None, 1);
        let first = app.clone().oneshot(request(None)).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.oneshot(request(None)).await.expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
