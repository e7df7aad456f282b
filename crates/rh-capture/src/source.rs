use std::future::IntoFuture;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, info};

use rh_fabric::{print_fatal, Control, FanOut, QuitReason};

use crate::error::{CaptureError, CaptureResult};

/// An endpoint that turns inbound traffic into request events.
pub trait CaptureSource: Send + Sync {
    /// Scheme shown to the operator, `http` or `ws`.
    fn protocol(&self) -> &'static str;

    /// `host:port` to bind.
    fn bind_addr(&self) -> String;

    /// Router that publishes every captured unit of work through `fan_out`.
    fn router(&self, fan_out: FanOut) -> Router;
}

/// Bind the source's address and serve it until the run quits.
///
/// A bind failure is terminal: it prints a diagnostic, broadcasts quit to
/// every sink and returns the error. There are no retries.
pub async fn start(
    source: &dyn CaptureSource,
    fan_out: FanOut,
    control: Control,
) -> CaptureResult<()> {
    let addr = source.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            let err = CaptureError::Bind { addr, source: err };
            print_fatal(&err);
            control
                .quit_switch()
                .trip(QuitReason::BindFailed(err.to_string()));
            return Err(err);
        }
    };
    serve(listener, source, fan_out, control).await
}

/// Serve an already bound listener.
///
/// Runs until the first sink fault, which broadcasts quit and stops the
/// listener. If the listener stops first, quit is broadcast for it instead.
pub async fn serve(
    listener: TcpListener,
    source: &dyn CaptureSource,
    fan_out: FanOut,
    control: Control,
) -> CaptureResult<()> {
    let local = listener.local_addr()?;
    let quit = control.quit_switch();
    let app = source.router(fan_out);
    info!(protocol = source.protocol(), addr = %local, "capture listening");

    tokio::select! {
        served = axum::serve(listener, app).into_future() => {
            match served {
                Ok(()) => {
                    quit.trip(QuitReason::CaptureStopped);
                    Ok(())
                }
                Err(err) => {
                    print_fatal(&err);
                    quit.trip(QuitReason::BindFailed(err.to_string()));
                    Err(CaptureError::Serve(err))
                }
            }
        }
        reason = control.supervise() => {
            debug!(?reason, "capture stopping");
            Ok(())
        }
    }
}
