//! Approval Workflow Engine CLI
//!
//! A thin harness around [`approval_workflow_engine::runtime::WorkflowEngine`]
//! for driving the purchase-approval and delegation workflows from the
//! command line. Ports are wired to in-memory fakes seeded from a small
//! demo directory, in the spirit of `knhk-workflow`'s own CLI, which talks
//! to the library rather than re-implementing orchestration logic itself.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use approval_workflow_engine::model::{ApprovalDecision, UserId};
use approval_workflow_engine::ports::{CatalogEntry, UserProfile};
use approval_workflow_engine::runtime::{EnginePorts, StateStore, WorkflowEngine};
use approval_workflow_engine::testing::{
    InMemoryAuditLog, InMemoryCatalog, InMemoryDelegationStore, InMemoryNotificationSink,
    InMemoryPurchaseGateway, InMemoryUserDirectory,
};
use approval_workflow_engine::EngineConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[derive(Parser)]
#[command(name = "approval-workflow-cli")]
#[command(about = "Purchase approval and delegation workflow engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// History store path.
    #[arg(long, default_value = "./approval_workflow_db")]
    state_store: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a purchase request for a fixed demo employee and catalog,
    /// then poll `getStatus` until the workflow reaches a terminal state
    /// or the poll budget is exhausted.
    Demo {
        /// How many status polls to attempt before giving up.
        #[arg(long, default_value = "20")]
        polls: u32,
    },
}

fn seed_ports() -> EnginePorts {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.seed(
        "widget-1",
        CatalogEntry {
            product_id: "widget-1".to_string(),
            title: "Standard Widget".to_string(),
            price: 4_999,
            currency: "USD".to_string(),
            image_ref: None,
        },
    );

    let users = Arc::new(InMemoryUserDirectory::new());
    users.seed(UserProfile {
        id: UserId::from("employee@co"),
        role: "employee".to_string(),
        manager_id: Some(UserId::from("manager@co")),
        supervisor_id: Some(UserId::from("supervisor@co")),
        approval_limit: 0,
    });
    users.seed(UserProfile {
        id: UserId::from("manager@co"),
        role: "manager".to_string(),
        manager_id: None,
        supervisor_id: None,
        approval_limit: 100_000_00,
    });

    EnginePorts {
        catalog,
        users,
        delegations: Arc::new(InMemoryDelegationStore::new()),
        purchases: Arc::new(InMemoryPurchaseGateway::new()),
        notifications: Arc::new(InMemoryNotificationSink::new()),
        audit: Arc::new(InMemoryAuditLog::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let state = StateStore::open(&cli.state_store).map_err(|e| format!("failed to open state store: {e}"))?;
    let ports = seed_ports();
    let engine = WorkflowEngine::new(ports, EngineConfig::default(), state);

    match cli.command {
        Commands::Demo { polls } => {
            let request_id = engine.submit_request(
                UserId::from("employee@co"),
                vec!["widget-1".to_string()],
                "new monitor for home office".to_string(),
                "remote".to_string(),
            );
            println!("submitted request {request_id}");

            for _ in 0..polls {
                tokio::time::sleep(StdDuration::from_millis(50)).await;
                let request = engine
                    .query_status(request_id)
                    .map_err(|e| format!("failed to query status: {e}"))?;
                println!("status: {:?}", request.status);

                if !request.approval_flow.required_approvers.is_empty()
                    && request.approval_flow.approved_by.len() < request.approval_flow.required_approvers.len()
                {
                    for approver in request.approval_flow.required_approvers.clone() {
                        engine
                            .send_approval_decision(
                                request_id,
                                ApprovalDecision {
                                    request_id,
                                    responsible_id: approver,
                                    approved: true,
                                    reason: None,
                                    modified_cart: None,
                                    at: chrono::Utc::now(),
                                },
                            )
                            .map_err(|e| format!("failed to send approval decision: {e}"))?;
                    }
                }

                if request.status.is_terminal() {
                    let json = serde_json::to_string_pretty(&request)?;
                    println!("{json}");
                    break;
                }
            }
        }
    }

    Ok(())
}
