use super::common::*;
use std::sync::Arc;

use chrono::Utc;

use crate::registry::dispatcher::{
    ChannelOutcome, DeliveryError, NoticeKind, NotificationDispatcher, SkipReason, StatusNotice,
};
use crate::registry::domain::{
    Application, ApplicationId, ApplicationStatus, NotificationKind, ReferenceNumber,
};
use crate::registry::memory::InMemoryRegistryStore;
use crate::registry::repository::NotificationRepository;
use crate::registry::sms::SmsClient;

fn application(fixture: &Fixture, status: ApplicationStatus) -> Application {
    let now = Utc::now();
    Application {
        id: ApplicationId::new(),
        reference_number: ReferenceNumber("JA-7Q2M9XK4TB".to_string()),
        applicant: fixture.applicant.id,
        document_type: fixture.document_type.id,
        branch: fixture.branch.id,
        status,
        rejection_reason: None,
        qr_code: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn transition_notice_uses_status_template() {
    let store = Arc::new(InMemoryRegistryStore::default());
    let fixture = seed(&store);
    let sms = Arc::new(RecordingSms::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), sms.clone(), SMS_TIMEOUT, "263");
    let application = application(&fixture, ApplicationStatus::Ready);

    let report = dispatcher
        .dispatch_status(
            &fixture.applicant,
            StatusNotice {
                application: &application,
                document_type: &fixture.document_type,
                branch: Some(&fixture.branch),
            },
            NoticeKind::Transition,
        )
        .await;

    assert!(report.in_app.is_delivered());
    assert!(report.sms.is_delivered());
    let stored = store.notifications_for(&fixture.applicant.id).expect("listed");
    assert_eq!(stored[0].kind, NotificationKind::ApplicationReady);
    assert_eq!(stored[0].title, "Ready for Collection");
    let (to, body) = &sms.sent()[0];
    assert_eq!(to, "+263772123456");
    assert!(body.starts_with("READY FOR COLLECTION"));
    assert!(body.contains("Ref: JA-7Q2M9XK4TB"));
    assert!(body.ends_with("Civil Registry System"));
}

#[tokio::test]
async fn invalid_phone_number_fails_only_the_sms_channel() {
    let store = Arc::new(InMemoryRegistryStore::default());
    let mut fixture = seed(&store);
    fixture.applicant.phone_number = Some("ext. 12".to_string());
    let sms = Arc::new(RecordingSms::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), sms.clone(), SMS_TIMEOUT, "263");
    let application = application(&fixture, ApplicationStatus::Approved);

    let report = dispatcher
        .dispatch_status(
            &fixture.applicant,
            StatusNotice {
                application: &application,
                document_type: &fixture.document_type,
                branch: None,
            },
            NoticeKind::Transition,
        )
        .await;

    assert!(report.in_app.is_delivered());
    assert!(matches!(
        report.sms,
        ChannelOutcome::Failed {
            error: DeliveryError::InvalidPhoneNumber(_)
        }
    ));
    assert!(sms.sent().is_empty());
}

#[tokio::test]
async fn notification_outage_still_attempts_sms() {
    let inner = InMemoryRegistryStore::default();
    let fixture = seed(&inner);
    let sms = Arc::new(RecordingSms::default());
    let dispatcher = NotificationDispatcher::new(
        Arc::new(NotificationOutage(inner)),
        sms.clone(),
        SMS_TIMEOUT,
        "263",
    );
    let application = application(&fixture, ApplicationStatus::Collected);

    let report = dispatcher
        .dispatch_status(
            &fixture.applicant,
            StatusNotice {
                application: &application,
                document_type: &fixture.document_type,
                branch: Some(&fixture.branch),
            },
            NoticeKind::Transition,
        )
        .await;

    assert!(matches!(
        report.in_app,
        ChannelOutcome::Failed {
            error: DeliveryError::Storage(_)
        }
    ));
    assert!(report.sms.is_delivered());
    assert_eq!(sms.sent().len(), 1);
}

#[tokio::test]
async fn disabled_client_reports_not_configured() {
    let store = Arc::new(InMemoryRegistryStore::default());
    let fixture = seed(&store);
    let dispatcher = NotificationDispatcher::new(
        store.clone(),
        Arc::new(SmsClient::Disabled),
        SMS_TIMEOUT,
        "263",
    );

    let report = dispatcher.dispatch_welcome(&fixture.applicant).await;

    assert!(report.in_app.is_delivered());
    assert_eq!(
        report.sms,
        ChannelOutcome::Failed {
            error: DeliveryError::NotConfigured
        }
    );
}

#[tokio::test]
async fn welcome_without_phone_is_in_app_only() {
    let store = Arc::new(InMemoryRegistryStore::default());
    let fixture = seed(&store);
    let sms = Arc::new(RecordingSms::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), sms.clone(), SMS_TIMEOUT, "263");

    let report = dispatcher.dispatch_welcome(&fixture.staff).await;

    assert_eq!(
        report.sms,
        ChannelOutcome::Skipped {
            reason: SkipReason::NoPhoneNumber
        }
    );
    let stored = store.notifications_for(&fixture.staff.id).expect("listed");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationKind::System);
    assert!(sms.sent().is_empty());
}

#[test]
fn dispatch_report_serializes_with_outcome_tags() {
    let report = crate::registry::dispatcher::DispatchReport {
        in_app: ChannelOutcome::Delivered {
            reference: "n-1".to_string(),
        },
        sms: ChannelOutcome::Failed {
            error: DeliveryError::TimedOut { seconds: 10 },
        },
    };

    let value = serde_json::to_value(&report).expect("serializes");
    assert_eq!(value["in_app"]["outcome"], "delivered");
    assert_eq!(value["sms"]["outcome"], "failed");
    assert_eq!(value["sms"]["error"]["kind"], "timed_out");
    assert_eq!(value["sms"]["error"]["detail"]["seconds"], 10);
}
