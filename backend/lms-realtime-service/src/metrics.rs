use std::rc::Rc;
use std::time::{Duration, Instant};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "lms_realtime_http_requests_total",
            "Total HTTP requests handled by lms-realtime-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create lms_realtime_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register lms_realtime_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "lms_realtime_http_request_duration_seconds",
            "HTTP request latency for lms-realtime-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path", "status"],
    )
    .expect("failed to create lms_realtime_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register lms_realtime_http_request_duration_seconds");
    histogram
});

static REGISTERED_USERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "lms_realtime_registered_users",
        "Users with a registered realtime connection",
    )
    .expect("failed to create lms_realtime_registered_users");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register lms_realtime_registered_users");
    gauge
});

static OPEN_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "lms_realtime_open_connections",
        "Open WebSocket connections, registered or not",
    )
    .expect("failed to create lms_realtime_open_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register lms_realtime_open_connections");
    gauge
});

static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "lms_realtime_events_total",
            "Realtime events emitted, by scope and outcome",
        ),
        &["scope", "outcome"],
    )
    .expect("failed to create lms_realtime_events_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register lms_realtime_events_total");
    counter
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub fn set_registered_users(count: usize) {
    REGISTERED_USERS.set(count as i64);
}

pub fn connection_opened() {
    OPEN_CONNECTIONS.inc();
}

pub fn connection_closed() {
    OPEN_CONNECTIONS.dec();
}

pub fn open_connections() -> i64 {
    OPEN_CONNECTIONS.get()
}

/// `scope` is `user` or `broadcast`; `outcome` is the delivery result
pub fn record_event(scope: &str, outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[scope, outcome]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

/// Records request count and latency per route pattern
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        // Route pattern keeps user ids out of label values
        let path = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(response) => {
                    observe_http_request(&method, &path, response.status().as_u16(), elapsed);
                }
                Err(err) => {
                    let status = err.as_response_error().status_code().as_u16();
                    observe_http_request(&method, &path, status, elapsed);
                }
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, test, web, App};

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_realtime_series() {
        record_event("user", "offline");
        set_registered_users(0);

        let app = test::init_service(
            App::new()
                .wrap(MetricsMiddleware)
                .route("/metrics", web::get().to(serve_metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body = to_bytes(resp.into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("lms_realtime_events_total"));
        assert!(text.contains("lms_realtime_registered_users"));
    }
}
