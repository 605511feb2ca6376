use tracing::info;
use warp::{Filter, Rejection, Reply};

use crate::{
    auth::Auth,
    config::ServerConfig,
    routes::{build_api_route_filter, handle_auth_errors},
};

/// Assembles the full route tree.
///
/// The auth routes and the caller's `protected` routes are mounted under `/api`, the upload
/// directory under `/upload`. Auth errors are recovered into JSON, CORS only admits the
/// configured origins, and every request runs inside a tracing span.
pub fn routes<P>(
    auth: &Auth,
    config: &ServerConfig,
    protected: P,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone
where
    P: Filter<Error = Rejection> + Clone + Send + Sync + 'static,
    P::Extract: Reply + Send,
{
    let api = warp::path("api").and(build_api_route_filter(auth).or(protected));

    let upload = warp::path("upload").and(warp::fs::dir(config.upload_dir.clone()));

    let cors = warp::cors()
        .allow_origins(config.allowed_origins.iter().map(String::as_str))
        .allow_credentials(true)
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allow_headers(vec!["authorization", "content-type"]);

    api.or(upload)
        .recover(handle_auth_errors)
        .with(cors)
        .with(warp::trace::request())
}

pub async fn serve<F>(routes: F, port: u16)
where
    F: Filter<Error = Rejection> + Clone + Send + Sync + 'static,
    F::Extract: Reply,
{
    info!(port, "server listening");

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}
