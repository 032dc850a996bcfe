pub mod models;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::services::TaskRepository;
use crate::Result;

pub struct AppState {
    pub repository: TaskRepository,
}

pub fn router(repository: TaskRepository) -> Router {
    let app_state = AppState { repository };

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/tasks", get(routes::list_tasks).post(routes::create_task))
        .route(
            "/api/tasks/:id",
            get(routes::get_task)
                .patch(routes::update_task)
                .delete(routes::delete_task),
        )
        .route("/api/tasks/:id/toggle", post(routes::toggle_task))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(app_state))
}

pub async fn serve(addr: SocketAddr, repository: TaskRepository) -> Result<()> {
    let app = router(repository);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
