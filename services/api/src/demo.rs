use crate::infra::seed_catalog;
use civil_registry::config::{RegistryConfig, SmsConfig};
use civil_registry::error::AppError;
use civil_registry::registry::templates::{self, MessageContext};
use civil_registry::registry::{
    ApplicationStatus, Branch, BranchId, ChannelOutcome, DispatchReport, InMemoryRegistryStore,
    LocalBlobStore, NewApplication, NewUser, RegistryService, ServiceError, SmsClient,
    StatusUpdate,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Full name of the demo applicant; its first two letters prefix the reference.
    #[arg(long, default_value = "Jane Doe")]
    pub(crate) applicant: String,
    /// Applicant phone number. SMS stays disabled unless gateway credentials are set.
    #[arg(long)]
    pub(crate) phone: Option<String>,
    /// Reject the application with this reason instead of taking it to collection.
    #[arg(long)]
    pub(crate) reject: Option<String>,
    /// Where QR codes are written (defaults to a folder under the system temp dir).
    #[arg(long)]
    pub(crate) media_root: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Status label to render, e.g. `approved` or any free-form label
    #[arg(long)]
    pub(crate) status: String,
    #[arg(long, default_value = "JA-7Q2M9XK4TB")]
    pub(crate) reference: String,
    #[arg(long, default_value = "Birth Certificate")]
    pub(crate) document_type: String,
    /// Branch name to include in the SMS
    #[arg(long)]
    pub(crate) branch: Option<String>,
    /// Rejection reason
    #[arg(long)]
    pub(crate) reason: Option<String>,
}

fn describe(outcome: &ChannelOutcome) -> String {
    match outcome {
        ChannelOutcome::Delivered { reference } => format!("delivered ({reference})"),
        ChannelOutcome::Skipped { reason } => format!("skipped ({reason:?})"),
        ChannelOutcome::Failed { error } => format!("failed ({error})"),
    }
}

fn print_dispatch(report: &DispatchReport) {
    println!(
        "  in-app: {} | sms: {}",
        describe(&report.in_app),
        describe(&report.sms)
    );
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        applicant,
        phone,
        reject,
        media_root,
    } = args;

    let media_root =
        media_root.unwrap_or_else(|| std::env::temp_dir().join("civil-registry-demo"));
    std::fs::create_dir_all(&media_root)?;

    let store = Arc::new(InMemoryRegistryStore::default());
    seed_catalog(&store).map_err(ServiceError::from)?;
    let sms_config = SmsConfig::default();
    let service = RegistryService::new(
        store.clone(),
        Arc::new(LocalBlobStore::new(
            media_root.clone(),
            format!("file://{}", media_root.display()),
        )),
        Arc::new(SmsClient::Disabled),
        &sms_config,
        RegistryConfig::default(),
    );

    println!("Civil registry demo");
    let username = applicant.to_ascii_lowercase().replace(' ', ".");
    let registration = service
        .register_user(NewUser {
            username: username.clone(),
            email: format!("{username}@example.org"),
            full_name: Some(applicant),
            phone_number: phone,
        })
        .await?;
    let citizen = registration.user;
    println!(
        "- Registered {} (phone {})",
        citizen.display_name(),
        citizen.phone_number.as_deref().unwrap_or("none")
    );
    print_dispatch(&registration.dispatch);

    let document_type = store
        .document_types()
        .map_err(ServiceError::from)?
        .into_iter()
        .next()
        .ok_or(ServiceError::NotFound("document type"))?;
    let branch = store
        .branches()
        .map_err(ServiceError::from)?
        .into_iter()
        .next()
        .ok_or(ServiceError::NotFound("branch"))?;

    let submission = service
        .create_application(
            &citizen.id,
            NewApplication {
                document_type: document_type.id,
                branch: branch.id,
            },
        )
        .await?;
    let application = submission.application;
    println!(
        "- Submitted {} at {} -> reference {}",
        document_type.name, branch.name, application.reference_number
    );
    if let Some(qr) = &application.qr_code {
        println!("  QR code: {}", media_root.join(&qr.key).display());
    }
    print_dispatch(&submission.dispatch);

    let steps: Vec<StatusUpdate> = match reject {
        Some(reason) => vec![
            StatusUpdate {
                status: ApplicationStatus::Review,
                rejection_reason: None,
            },
            StatusUpdate {
                status: ApplicationStatus::Rejected,
                rejection_reason: Some(reason),
            },
        ],
        None => [
            ApplicationStatus::Review,
            ApplicationStatus::Approved,
            ApplicationStatus::Printed,
            ApplicationStatus::Ready,
            ApplicationStatus::Collected,
        ]
        .into_iter()
        .map(|status| StatusUpdate {
            status,
            rejection_reason: None,
        })
        .collect(),
    };

    for step in steps {
        let change = service.update_status(&application.id, step).await?;
        println!(
            "- {} -> {}",
            change.previous.label(),
            change.application.status.label()
        );
        if let Some(report) = &change.dispatch {
            print_dispatch(report);
        }
    }

    if let Some(view) = service.track(application.reference_number.as_str())? {
        println!("\nPublic tracking view");
        println!(
            "{}",
            serde_json::to_string_pretty(&view).unwrap_or_else(|err| err.to_string())
        );
    }

    let notifications = service.list_notifications(&citizen.id)?;
    println!("\nNotifications ({})", notifications.len());
    for notification in notifications {
        println!(
            "- [{}] {}",
            notification.created_at.format("%Y-%m-%d %H:%M:%S"),
            notification.title
        );
    }

    Ok(())
}

pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let branch = args.branch.map(|name| Branch {
        id: BranchId::new(),
        name,
        address: String::new(),
        phone: None,
        email: None,
        is_active: true,
    });
    let ctx = MessageContext {
        reference: &args.reference,
        document_type: &args.document_type,
        rejection_reason: args.reason.as_deref(),
        branch: branch.as_ref(),
        qr_reference: None,
    };

    println!("SMS\n---\n{}", templates::compose_for_label(&args.status, &ctx));
    if let Ok(status) = args.status.parse::<ApplicationStatus>() {
        let message = templates::in_app(status, &ctx);
        println!("\nIn-app\n------\n{}\n\n{}", message.title, message.message);
    }
    Ok(())
}
