use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Request, Response, Server, StatusCode};
use log::{debug, error, info};
use mnist_serve::{Context, Handler, RequestItem, Timer};
use std::convert::Infallible;
use std::env;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

fn respond(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

fn bind_addr(raw: Option<String>) -> Result<SocketAddr, std::net::AddrParseError> {
    raw.as_deref().unwrap_or(DEFAULT_BIND_ADDR).parse()
}

async fn handle(
    req: Request<Body>,
    handler: Arc<Handler>,
    ctx: Arc<Context>,
) -> Result<Response<Body>, Infallible> {
    let raw = match body::to_bytes(req.into_body()).await {
        Ok(raw) => raw,
        Err(err) => {
            return Ok(respond(
                StatusCode::BAD_REQUEST,
                format!("Could not read request body: '{}'", err),
            ))
        }
    };

    let mut t = Timer::new_start("Handling request");

    let result = tokio::task::spawn_blocking(move || {
        let request = [RequestItem::body(raw.to_vec())];
        handler.handle(Some(&request[..]), &ctx)
    })
    .await;

    t.stop();

    let response = match result {
        Err(err) => {
            error!("Handler task failed: {}", err);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Handler task failed: '{}'", err),
            )
        }
        Ok(Err(err)) => respond(
            StatusCode::BAD_REQUEST,
            format!("Classification failure: '{}'", err),
        ),
        Ok(Ok(prediction)) => match serde_json::to_string(&prediction) {
            Ok(json) => respond(StatusCode::OK, json),
            Err(err) => respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Could not render prediction: '{}'", err),
            ),
        },
    };

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let ctx = Arc::new(Context::from_env()?);
    let handler = Arc::new(Handler::new());
    handler.initialize(&ctx)?;

    debug!("Loaded model in memory");

    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let handler = Arc::clone(&handler);
        let ctx = Arc::clone(&ctx);

        let service = service_fn(move |req| handle(req, handler.clone(), ctx.clone()));

        async move { Ok::<_, Infallible>(service) }
    });

    let addr = bind_addr(env::var("BIND_ADDR").ok())?;
    info!("Listening on {}", addr);

    Server::bind(&addr).serve(make_service).await?;

    Ok(())
}
