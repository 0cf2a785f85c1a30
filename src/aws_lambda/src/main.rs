use lambda_http::{
    handler,
    lambda_runtime::{self, Context, Error},
    IntoResponse, Request, Response,
};

use log::debug;
use mnist_serve::{Context as ServeContext, Handler, RequestItem};

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let serve_ctx = ServeContext::from_env()?;
    let classifier = Handler::new();
    classifier.initialize(&serve_ctx)?;

    debug!("Loaded model in memory");

    let classifier_ref = &classifier;
    let serve_ctx_ref = &serve_ctx;

    let handler_closure = move |event: Request, ctx: Context| async move {
        handle_request(event, ctx, classifier_ref, serve_ctx_ref)
    };

    debug!("Dispatching handler");
    lambda_runtime::run(handler(handler_closure)).await?;

    Ok(())
}

fn handle_request(
    event: Request,
    _ctx: Context,
    classifier: &Handler,
    serve_ctx: &ServeContext,
) -> Result<impl IntoResponse, Error> {
    debug!("Received request: {:#?}", event);

    let mut t = mnist_serve::Timer::new_start("Handling request");
    let response = classify_event(&event, classifier, serve_ctx)?;
    t.stop();

    Ok(response)
}

fn classify_event(
    event: &Request,
    classifier: &Handler,
    serve_ctx: &ServeContext,
) -> Result<Response<String>, Error> {
    let request = [RequestItem::data(event.body().to_vec())];

    let response = match classifier.handle(Some(&request[..]), serve_ctx) {
        Err(err) => Response::builder()
            .status(400)
            .body(format!("Classification failure: '{}'", err))?,
        Ok(prediction) => Response::builder()
            .status(200)
            .body(serde_json::to_string(&prediction)?)?,
    };

    Ok(response)
}
