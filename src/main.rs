use anyhow::{Context, Result};
use clap::Parser;
use kube::api::Api;
use kube_runtime::reflector;
use managed_certificate_controller::config::ControllerArgs;
use managed_certificate_controller::controller::dispatcher::{Dispatcher, PrometheusStatusMetrics};
use managed_certificate_controller::controller::lister::StoreLister;
use managed_certificate_controller::controller::rate_limiter::ItemExponentialRateLimiter;
use managed_certificate_controller::controller::reconciler::{
    KubeManagedCertificateApi, Reconciler,
};
use managed_certificate_controller::controller::status_mapping::CertificateStatusConfig;
use managed_certificate_controller::crd::ManagedCertificate;
use managed_certificate_controller::provider::gcp::SslCertificatesREST;
use managed_certificate_controller::runtime::{initialize, run_watch_loop, InitializationResult};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ControllerArgs::parse();

    let InitializationResult {
        client,
        config,
        gce,
        server_state,
    } = initialize(&args).await?;

    let ssl = SslCertificatesREST::new(&gce, config.cloud_timeout())
        .context("Failed to create Compute Engine client")?;
    let reconciler = Reconciler::new(
        Arc::new(KubeManagedCertificateApi::new(client.clone())),
        Arc::new(ssl),
        CertificateStatusConfig::default(),
    );

    // Watch all namespaces
    let mcrts: Api<ManagedCertificate> = Api::all(client);
    let (reader, writer) = reflector::store();

    let dispatcher = Arc::new(Dispatcher::new(
        reconciler,
        Arc::new(StoreLister::new(reader)),
        Arc::new(PrometheusStatusMetrics),
        Arc::new(ItemExponentialRateLimiter::new(
            config.backoff_base(),
            config.backoff_max(),
        )),
    ));

    run_watch_loop(mcrts, writer, dispatcher, &config, server_state).await
}
