//! Reconciler tests against in-memory Kubernetes and Compute Engine fakes.

use super::*;
use crate::constants::MANAGED_CERTIFICATE_FINALIZER;
use crate::controller::resource_id::ResourceId;
use crate::controller::status_mapping::CertificateStatusConfig;
use crate::crd::{CertificateStatus, DomainStatus, ManagedCertificate, ManagedCertificateStatus};
use crate::provider::{
    ManagedSslCertificate, SslCertificate, SslCertificateError, SslCertificateProvider,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeKube {
    objects: Mutex<BTreeMap<ResourceId, ManagedCertificate>>,
    status_patches: AtomicUsize,
}

impl FakeKube {
    fn with(mcrt: ManagedCertificate) -> Arc<Self> {
        let fake = Self::default();
        let id = ResourceId::from_object(&mcrt).unwrap();
        fake.objects.lock().unwrap().insert(id, mcrt);
        Arc::new(fake)
    }

    fn object(&self, id: &ResourceId) -> ManagedCertificate {
        self.objects.lock().unwrap()[id].clone()
    }

    fn status(&self, id: &ResourceId) -> ManagedCertificateStatus {
        self.object(id).status.unwrap_or_default()
    }
}

#[async_trait]
impl ManagedCertificateApi for FakeKube {
    async fn get(&self, id: &ResourceId) -> Result<Option<ManagedCertificate>, kube::Error> {
        Ok(self.objects.lock().unwrap().get(id).cloned())
    }

    async fn patch_status(
        &self,
        id: &ResourceId,
        status: &ManagedCertificateStatus,
    ) -> Result<(), kube::Error> {
        self.status_patches.fetch_add(1, Ordering::SeqCst);
        if let Some(obj) = self.objects.lock().unwrap().get_mut(id) {
            obj.status = Some(status.clone());
        }
        Ok(())
    }

    async fn add_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), kube::Error> {
        if let Some(obj) = self.objects.lock().unwrap().get_mut(id) {
            let finalizers = obj.metadata.finalizers.get_or_insert_with(Vec::new);
            if !finalizers.iter().any(|f| f == finalizer) {
                finalizers.push(finalizer.to_string());
            }
        }
        Ok(())
    }

    async fn remove_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), kube::Error> {
        if let Some(obj) = self.objects.lock().unwrap().get_mut(id) {
            if let Some(finalizers) = obj.metadata.finalizers.as_mut() {
                finalizers.retain(|f| f != finalizer);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeSsl {
    certificates: Mutex<HashMap<String, SslCertificate>>,
    /// Create stores the certificate and still reports a failure
    fail_after_create: AtomicBool,
    /// Create fails without storing anything
    reject_create: AtomicBool,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeSsl {
    fn set_status(&self, name: &str, status: &str, domain_status: &[(&str, &str)]) {
        let mut certificates = self.certificates.lock().unwrap();
        let managed = certificates
            .get_mut(name)
            .and_then(|c| c.managed.as_mut())
            .unwrap();
        managed.status = status.to_string();
        managed.domain_status = domain_status
            .iter()
            .map(|(d, s)| ((*d).to_string(), (*s).to_string()))
            .collect();
    }

    fn names(&self) -> Vec<String> {
        self.certificates.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl SslCertificateProvider for FakeSsl {
    async fn create(&self, name: &str, domains: &[String]) -> Result<(), SslCertificateError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.reject_create.load(Ordering::SeqCst) {
            return Err(SslCertificateError::Api {
                code: 403,
                status: "PERMISSION_DENIED".to_string(),
                message: "quota exceeded".to_string(),
            });
        }

        self.certificates.lock().unwrap().insert(
            name.to_string(),
            SslCertificate {
                name: name.to_string(),
                certificate_type: "MANAGED".to_string(),
                managed: Some(ManagedSslCertificate {
                    domains: domains.to_vec(),
                    status: "PROVISIONING".to_string(),
                    domain_status: domains
                        .iter()
                        .map(|d| (d.clone(), "PROVISIONING".to_string()))
                        .collect(),
                }),
                ..Default::default()
            },
        );

        if self.fail_after_create.load(Ordering::SeqCst) {
            return Err(SslCertificateError::Api {
                code: 504,
                status: "DEADLINE_EXCEEDED".to_string(),
                message: "timeout".to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), SslCertificateError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match self.certificates.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(SslCertificateError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn get(&self, name: &str) -> Result<SslCertificate, SslCertificateError> {
        self.certificates
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| SslCertificateError::NotFound {
                name: name.to_string(),
            })
    }
}

fn managed_certificate(value: serde_json::Value) -> ManagedCertificate {
    let mut obj = json!({
        "apiVersion": "networking.gke.io/v1",
        "kind": "ManagedCertificate",
        "metadata": {"name": "site", "namespace": "default"},
        "spec": {"domains": ["example.com"]}
    });
    merge(&mut obj, value);
    serde_json::from_value(obj).unwrap()
}

fn merge(target: &mut serde_json::Value, patch: serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (k, v) in patch {
                merge(target.entry(k).or_insert(serde_json::Value::Null), v);
            }
        }
        (target, patch) => *target = patch,
    }
}

fn reconciler(kube: &Arc<FakeKube>, ssl: &Arc<FakeSsl>) -> Reconciler {
    Reconciler::new(
        Arc::clone(kube) as Arc<dyn ManagedCertificateApi>,
        Arc::clone(ssl) as Arc<dyn SslCertificateProvider>,
        CertificateStatusConfig::default(),
    )
}

fn site() -> ResourceId {
    ResourceId::new("default", "site")
}

#[tokio::test]
async fn test_missing_resource_is_success() {
    let kube = Arc::new(FakeKube::default());
    let ssl = Arc::new(FakeSsl::default());

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    assert_eq!(ssl.creates.load(Ordering::SeqCst), 0);
    assert_eq!(kube.status_patches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_new_resource_gets_finalizer_certificate_and_status() {
    let kube = FakeKube::with(managed_certificate(json!({
        "spec": {"domains": ["b.example.com", "a.example.com"]}
    })));
    let ssl = Arc::new(FakeSsl::default());

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    let obj = kube.object(&site());
    assert_eq!(
        obj.metadata.finalizers,
        Some(vec![MANAGED_CERTIFICATE_FINALIZER.to_string()])
    );

    let status = obj.status.unwrap();
    let name = status.certificate_name.clone().unwrap();
    assert!(name.starts_with("mcrt-"));
    assert_eq!(ssl.names(), vec![name.clone()]);
    assert_eq!(
        ssl.get(&name).await.unwrap().domains(),
        ["b.example.com".to_string(), "a.example.com".to_string()]
    );
    assert_eq!(status.certificate_status, Some(CertificateStatus::Provisioning));
    assert_eq!(status.domain_status.len(), 2);
    // Ordered by domain
    assert_eq!(status.domain_status[0].domain, "a.example.com");
}

#[tokio::test]
async fn test_cloud_statuses_are_translated() {
    let kube = FakeKube::with(managed_certificate(json!({
        "status": {"certificateName": "mcrt-existing"}
    })));
    let ssl = Arc::new(FakeSsl::default());
    ssl.create("mcrt-existing", &["example.com".to_string()])
        .await
        .unwrap();
    ssl.set_status(
        "mcrt-existing",
        "PROVISIONING",
        &[("example.com", "FAILED_CAA_CHECKING")],
    );

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    let status = kube.status(&site());
    assert_eq!(status.certificate_name.as_deref(), Some("mcrt-existing"));
    assert_eq!(status.certificate_status, Some(CertificateStatus::Provisioning));
    assert_eq!(
        status.domain("example.com"),
        Some(DomainStatus::FailedCaaChecking)
    );
    // No second certificate was created
    assert_eq!(ssl.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_reconciliation_reuses_certificate() {
    let kube = FakeKube::with(managed_certificate(json!({})));
    let ssl = Arc::new(FakeSsl::default());
    let ctx = reconciler(&kube, &ssl);

    reconcile(&ctx, &site()).await.unwrap();
    let first = kube.status(&site()).certificate_name;
    reconcile(&ctx, &site()).await.unwrap();
    reconcile(&ctx, &site()).await.unwrap();

    assert_eq!(kube.status(&site()).certificate_name, first);
    assert_eq!(ssl.creates.load(Ordering::SeqCst), 1);
    assert_eq!(ssl.names().len(), 1);
}

#[tokio::test]
async fn test_unchanged_status_is_not_patched() {
    let kube = FakeKube::with(managed_certificate(json!({})));
    let ssl = Arc::new(FakeSsl::default());
    let ctx = reconciler(&kube, &ssl);

    reconcile(&ctx, &site()).await.unwrap();
    let patches = kube.status_patches.load(Ordering::SeqCst);
    reconcile(&ctx, &site()).await.unwrap();

    assert_eq!(kube.status_patches.load(Ordering::SeqCst), patches);
}

#[tokio::test]
async fn test_failed_create_of_existing_certificate_is_success() {
    let kube = FakeKube::with(managed_certificate(json!({})));
    let ssl = Arc::new(FakeSsl::default());
    ssl.fail_after_create.store(true, Ordering::SeqCst);

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    assert_eq!(
        kube.status(&site()).certificate_status,
        Some(CertificateStatus::Provisioning)
    );
}

#[tokio::test]
async fn test_failed_create_is_retryable_error() {
    let kube = FakeKube::with(managed_certificate(json!({})));
    let ssl = Arc::new(FakeSsl::default());
    ssl.reject_create.store(true, Ordering::SeqCst);
    let ctx = reconciler(&kube, &ssl);

    let err = reconcile(&ctx, &site()).await.unwrap_err();
    assert!(matches!(err, ReconcilerError::SslCertificate(_)));

    // The assigned name survives for the retry
    let name = kube.status(&site()).certificate_name.unwrap();
    ssl.reject_create.store(false, Ordering::SeqCst);
    reconcile(&ctx, &site()).await.unwrap();
    assert_eq!(ssl.names(), vec![name]);
}

#[tokio::test]
async fn test_changed_domains_recreate_certificate() {
    let kube = FakeKube::with(managed_certificate(json!({
        "spec": {"domains": ["new.example.com"]},
        "status": {"certificateName": "mcrt-old"}
    })));
    let ssl = Arc::new(FakeSsl::default());
    ssl.create("mcrt-old", &["old.example.com".to_string()])
        .await
        .unwrap();
    let ctx = reconciler(&kube, &ssl);

    let err = reconcile(&ctx, &site()).await.unwrap_err();
    assert!(matches!(err, ReconcilerError::DomainsChanged { .. }));
    assert!(ssl.names().is_empty());
    assert_eq!(kube.status(&site()).certificate_name, None);

    reconcile(&ctx, &site()).await.unwrap();
    let names = ssl.names();
    assert_eq!(names.len(), 1);
    assert_ne!(names[0], "mcrt-old");
    assert_eq!(
        ssl.get(&names[0]).await.unwrap().domains(),
        ["new.example.com".to_string()]
    );
}

#[tokio::test]
async fn test_deleted_resource_releases_certificate_and_finalizer() {
    let kube = FakeKube::with(managed_certificate(json!({
        "metadata": {
            "deletionTimestamp": "2024-01-01T00:00:00Z",
            "finalizers": [MANAGED_CERTIFICATE_FINALIZER, "other/finalizer"]
        },
        "status": {"certificateName": "mcrt-doomed"}
    })));
    let ssl = Arc::new(FakeSsl::default());
    ssl.create("mcrt-doomed", &["example.com".to_string()])
        .await
        .unwrap();

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    assert!(ssl.names().is_empty());
    assert_eq!(
        kube.object(&site()).metadata.finalizers,
        Some(vec!["other/finalizer".to_string()])
    );
}

#[tokio::test]
async fn test_deleted_resource_without_certificate() {
    let kube = FakeKube::with(managed_certificate(json!({
        "metadata": {
            "deletionTimestamp": "2024-01-01T00:00:00Z",
            "finalizers": [MANAGED_CERTIFICATE_FINALIZER]
        },
        "status": {"certificateName": "mcrt-never-created"}
    })));
    let ssl = Arc::new(FakeSsl::default());

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    assert_eq!(ssl.deletes.load(Ordering::SeqCst), 0);
    assert_eq!(kube.object(&site()).metadata.finalizers, Some(vec![]));
}

#[tokio::test]
async fn test_unknown_cloud_status_fails_loudly() {
    let kube = FakeKube::with(managed_certificate(json!({
        "status": {"certificateName": "mcrt-odd", "certificateStatus": "Active"}
    })));
    let ssl = Arc::new(FakeSsl::default());
    ssl.create("mcrt-odd", &["example.com".to_string()])
        .await
        .unwrap();
    ssl.set_status("mcrt-odd", "SOMETHING_NEW", &[("example.com", "ACTIVE")]);

    let err = reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap_err();

    assert!(matches!(err, ReconcilerError::Translation(_)));
    // Status is left untouched
    assert_eq!(
        kube.status(&site()).certificate_status,
        Some(CertificateStatus::Active)
    );
}

#[tokio::test]
async fn test_active_certificate_reports_expire_time() {
    let kube = FakeKube::with(managed_certificate(json!({
        "status": {"certificateName": "mcrt-live"}
    })));
    let ssl = Arc::new(FakeSsl::default());
    ssl.create("mcrt-live", &["example.com".to_string()])
        .await
        .unwrap();
    ssl.set_status("mcrt-live", "ACTIVE", &[("example.com", "ACTIVE")]);
    ssl.certificates
        .lock()
        .unwrap()
        .get_mut("mcrt-live")
        .unwrap()
        .expire_time = Some("2025-01-01T00:00:00Z".to_string());

    reconcile(&reconciler(&kube, &ssl), &site()).await.unwrap();

    let status = kube.status(&site());
    assert_eq!(status.certificate_status, Some(CertificateStatus::Active));
    assert_eq!(status.domain("example.com"), Some(DomainStatus::Active));
    assert_eq!(status.expire_time.as_deref(), Some("2025-01-01T00:00:00Z"));
}
