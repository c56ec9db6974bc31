pub mod admin;
pub mod ai;
pub mod applications;
pub mod auth;
pub mod chat;
pub mod escrow;
pub mod jobs;
pub mod kyc;
pub mod ratings;
pub mod reports;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::Request,
        http::{Method, StatusCode},
        middleware::{self, Next},
        Extension, Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{middleware::SessionAuth, models::usermodel::User, AppState};

    /// Mounts `router` with a test AppState (lazy pool, no providers) and,
    /// when given, an already-authenticated user.
    pub fn mount(router: Router, user: Option<User>) -> Router {
        let app_state = Arc::new(AppState::for_tests());

        let router = match user {
            Some(user) => {
                let session = SessionAuth {
                    user,
                    session_id: Uuid::new_v4(),
                };
                router.layer(middleware::from_fn(move |mut req: Request, next: Next| {
                    let session = session.clone();
                    async move {
                        req.extensions_mut().insert(session);
                        next.run(req).await
                    }
                }))
            }
            None => router,
        };

        router.layer(Extension(app_state))
    }

    pub async fn send_json(
        app: Router,
        method: Method,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}
