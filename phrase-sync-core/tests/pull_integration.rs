use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;

use phrase_sync_core::config::Config;
use phrase_sync_core::contract::{
    Download, DownloadRequest, Locale, MockTranslationService, RateLimit, ServiceError, Tag,
    TranslationService, UploadRequest,
};
use phrase_sync_core::error::{SyncError, UnitError};
use phrase_sync_core::formats::FormatRegistry;
use phrase_sync_core::pull::{DownloadSpec, LocaleOutcome, PullOrchestrator, MAX_CONCURRENT_DOWNLOADS};

/// Service that records how many downloads overlap.
struct InstrumentedService {
    locales: Vec<Locale>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl InstrumentedService {
    fn with_locales(names: &[&str]) -> Self {
        InstrumentedService {
            locales: names.iter().map(|name| Locale::named(*name)).collect(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TranslationService for InstrumentedService {
    async fn list_locales(&self) -> Result<Vec<Locale>, ServiceError> {
        Ok(self.locales.clone())
    }

    async fn download_translations(&self, req: &DownloadRequest) -> Result<Download, ServiceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.requested.lock().unwrap().push(req.locale.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Download {
            content: format!("{}: translated", req.locale).into_bytes(),
            rate_limit: RateLimit::default(),
        })
    }

    async fn upload_file(&self, _req: &UploadRequest) -> Result<(), ServiceError> {
        Err("not used".into())
    }

    async fn create_locale(&self, _name: &str) -> Result<Locale, ServiceError> {
        Err("not used".into())
    }

    async fn make_default_locale(&self, _name: &str) -> Result<Locale, ServiceError> {
        Err("not used".into())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError> {
        Err("not used".into())
    }
}

fn yml_config(target: &std::path::Path) -> Config {
    Config {
        format: "yml".into(),
        target_directory: target.to_string_lossy().into_owned(),
        ..Config::default()
    }
    .with_defaults()
}

fn ok_download(content: &str) -> Download {
    Download {
        content: content.as_bytes().to_vec(),
        rate_limit: RateLimit {
            limit: Some(1000),
            remaining: Some(999),
            reset_at: Some(1_700_000_000),
        },
    }
}

#[tokio::test]
async fn test_pull_never_runs_more_than_two_downloads_at_once() {
    let dir = tempdir().unwrap();
    let config = yml_config(dir.path());
    let registry = FormatRegistry::standard();
    let service = InstrumentedService::with_locales(&["de", "en", "fr", "it", "nl"]);

    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .expect("pull should succeed");

    assert_eq!(report.locales.len(), 5);
    assert_eq!(report.downloaded().count(), 5);
    assert!(report.skipped.is_empty());
    let max = service.max_in_flight.load(Ordering::SeqCst);
    assert_eq!(max, MAX_CONCURRENT_DOWNLOADS, "saw {max} concurrent downloads");
    assert_eq!(service.requested.lock().unwrap().len(), 5);

    for name in ["de", "en", "fr", "it", "nl"] {
        let path = dir.path().join(format!("phrase.{name}.yml"));
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("{} should exist: {e}", path.display()));
        assert_eq!(content, format!("{name}: translated"));
    }
}

#[tokio::test]
async fn test_pull_skips_unknown_locales() {
    let dir = tempdir().unwrap();
    let config = yml_config(dir.path());
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service
        .expect_list_locales()
        .times(1)
        .returning(|| Ok(vec![Locale::named("en"), Locale::named("ms")]));
    service
        .expect_download_translations()
        .withf(|req: &DownloadRequest| req.format == "yml" && req.locale != "unknown")
        .times(2)
        .returning(|req| Ok(ok_download(&format!("{}: {{}}", req.locale))));

    let requested = vec!["en".to_string(), "ms".to_string(), "unknown".to_string()];
    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &requested)
        .await
        .expect("unknown locales are not fatal");

    assert_eq!(report.skipped, vec!["unknown".to_string()]);
    let pulled: Vec<_> = report.locales.iter().map(|unit| unit.locale.as_str()).collect();
    assert_eq!(pulled, vec!["en", "ms"]);
    assert_eq!(report.downloaded().count(), 2);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("phrase.ms.yml")).unwrap(),
        "ms: {}"
    );
}

#[tokio::test]
async fn test_pull_passes_download_options() {
    let dir = tempdir().unwrap();
    let config = Config {
        encoding: "UTF-8".into(),
        ..yml_config(dir.path())
    };
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service
        .expect_list_locales()
        .returning(|| Ok(vec![Locale::named("de")]));
    service
        .expect_download_translations()
        .withf(|req: &DownloadRequest| {
            req.tag.as_deref() == Some("release-1.0")
                && req.updated_since.as_deref() == Some("20240102030405")
                && req.encoding.as_deref() == Some("UTF-8")
                && req.include_empty_translations
                && req.convert_emoji
                && !req.keep_notranslate_tags
                && !req.skip_unverified_translations
        })
        .times(1)
        .returning(|_| Ok(ok_download("de: {}")));

    let spec = DownloadSpec {
        tag: Some("release-1.0".into()),
        updated_since: Some("20240102030405".into()),
        include_empty_translations: true,
        convert_emoji: true,
        ..DownloadSpec::default()
    };
    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&spec, &[])
        .await
        .unwrap();
    assert_eq!(report.downloaded().count(), 1);
}

#[tokio::test]
async fn test_pull_unknown_format_fails_before_contacting_service() {
    let dir = tempdir().unwrap();
    let config = Config {
        format: "docx".into(),
        ..yml_config(dir.path())
    };
    let registry = FormatRegistry::standard();
    // No expectations: any call would panic.
    let service = MockTranslationService::new();

    let err = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::UnknownFormat(ref id) if id == "docx"));
}

#[tokio::test]
async fn test_pull_locale_listing_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let config = yml_config(dir.path());
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service
        .expect_list_locales()
        .returning(|| Err("401 Unauthorized".into()));
    service.expect_download_translations().times(0);

    let err = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ListLocales(_)));
    assert!(err.to_string().contains("401 Unauthorized"));
}

#[tokio::test]
async fn test_pull_reports_rate_limit_and_keeps_file() {
    let dir = tempdir().unwrap();
    let config = yml_config(dir.path());
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service
        .expect_list_locales()
        .returning(|| Ok(vec![Locale::named("de")]));
    service.expect_download_translations().returning(|_| {
        Ok(Download {
            content: b"de: {}".to_vec(),
            rate_limit: RateLimit {
                limit: Some(1000),
                remaining: Some(0),
                reset_at: Some(1_700_000_600),
            },
        })
    });

    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .unwrap();

    assert_eq!(report.downloaded().count(), 0);
    match &report.locales[0].outcome {
        LocaleOutcome::RateLimited { path, reset_at } => {
            assert_eq!(*reset_at, Some(1_700_000_600));
            assert_eq!(std::fs::read_to_string(path).unwrap(), "de: {}");
        }
        other => panic!("expected rate limited outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pull_rate_limit_does_not_stop_other_locales() {
    let dir = tempdir().unwrap();
    let config = yml_config(dir.path());
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service.expect_list_locales().returning(|| {
        Ok(vec![
            Locale::named("de"),
            Locale::named("en"),
            Locale::named("fr"),
            Locale::named("it"),
        ])
    });
    service
        .expect_download_translations()
        .times(4)
        .returning(|req| {
            if req.locale == "de" {
                Ok(Download {
                    content: b"de: {}".to_vec(),
                    rate_limit: RateLimit {
                        limit: Some(1000),
                        remaining: Some(0),
                        reset_at: Some(1_700_000_600),
                    },
                })
            } else {
                Ok(ok_download(&format!("{}: {{}}", req.locale)))
            }
        });

    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .unwrap();

    assert_eq!(report.locales.len(), 4);
    let limited: Vec<_> = report
        .locales
        .iter()
        .filter(|unit| matches!(unit.outcome, LocaleOutcome::RateLimited { .. }))
        .map(|unit| unit.locale.as_str())
        .collect();
    assert_eq!(limited, vec!["de"]);
    assert_eq!(report.downloaded().count(), 3);
    for name in ["de", "en", "fr", "it"] {
        assert_eq!(
            std::fs::read_to_string(dir.path().join(format!("phrase.{name}.yml"))).unwrap(),
            format!("{name}: {{}}")
        );
    }
}

#[tokio::test]
async fn test_pull_failed_locale_does_not_affect_siblings() {
    let dir = tempdir().unwrap();
    let config = yml_config(dir.path());
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service
        .expect_list_locales()
        .returning(|| Ok(vec![Locale::named("de"), Locale::named("fr"), Locale::named("it")]));
    service
        .expect_download_translations()
        .times(3)
        .returning(|req| {
            if req.locale == "fr" {
                Err("500 Internal Server Error".into())
            } else {
                Ok(ok_download("ok"))
            }
        });

    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .unwrap();

    assert_eq!(report.downloaded().count(), 2);
    let failed = report
        .locales
        .iter()
        .find(|unit| unit.locale == "fr")
        .unwrap();
    assert!(matches!(
        failed.outcome,
        LocaleOutcome::Failed { error: UnitError::Service(_) }
    ));
    assert!(dir.path().join("phrase.de.yml").is_file());
    assert!(dir.path().join("phrase.it.yml").is_file());
}

#[tokio::test]
async fn test_pull_folder_creation_failure_is_reported_per_locale() {
    let dir = tempdir().unwrap();
    // A regular file where the target directory should be.
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();
    let config = yml_config(&blocker);
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service
        .expect_list_locales()
        .returning(|| Ok(vec![Locale::named("de")]));
    service.expect_download_translations().times(0);

    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .expect("io failures stay inside the unit");

    assert!(matches!(
        report.locales[0].outcome,
        LocaleOutcome::Failed { error: UnitError::Io { .. } }
    ));
}

#[tokio::test]
async fn test_pull_writes_android_layout() {
    let dir = tempdir().unwrap();
    let config = Config {
        format: "xml".into(),
        ..yml_config(dir.path())
    };
    let registry = FormatRegistry::standard();

    let mut service = MockTranslationService::new();
    service.expect_list_locales().returning(|| {
        Ok(vec![
            Locale {
                name: "en".into(),
                code: "en".into(),
                is_default: true,
                ..Locale::default()
            },
            Locale {
                name: "German".into(),
                code: "de-DE".into(),
                ..Locale::default()
            },
        ])
    });
    service
        .expect_download_translations()
        .returning(|req| Ok(ok_download(&format!("<resources locale=\"{}\"/>", req.locale))));

    let report = PullOrchestrator::new(&service, &registry, &config)
        .pull(&DownloadSpec::default(), &[])
        .await
        .unwrap();

    assert_eq!(report.downloaded().count(), 2);
    assert!(dir.path().join("values/strings.xml").is_file());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("values-de-rDE/strings.xml")).unwrap(),
        "<resources locale=\"German\"/>"
    );
}
