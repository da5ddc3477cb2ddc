//! Shared test fixture: in-memory ports + a simulated clock, wired into
//! `ApprovalDeps`/`DelegationDeps`. AAA-style helpers in the teacher's
//! `WorkflowTestFixture` idiom, generalized to this crate's two workflows.

use approval_workflow_engine::config::EngineConfig;
use approval_workflow_engine::engine::{CancellationToken, Ctx, History, SignalBox, SimulatedTimebase};
use approval_workflow_engine::model::UserId;
use approval_workflow_engine::ports::{CatalogEntry, UserProfile};
use approval_workflow_engine::testing::{
    InMemoryAuditLog, InMemoryCatalog, InMemoryDelegationStore, InMemoryNotificationSink,
    InMemoryPurchaseGateway, InMemoryUserDirectory,
};
use approval_workflow_engine::workflows::{ApprovalDeps, DelegationDeps};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid fixed timestamp")
}

pub struct Fixture {
    pub catalog: Arc<InMemoryCatalog>,
    pub users: Arc<InMemoryUserDirectory>,
    pub delegations: Arc<InMemoryDelegationStore>,
    pub purchases: Arc<InMemoryPurchaseGateway>,
    pub notifications: Arc<InMemoryNotificationSink>,
    pub audit: Arc<InMemoryAuditLog>,
    pub clock: Arc<SimulatedTimebase>,
    pub config: EngineConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserDirectory::new());
        users.seed(UserProfile {
            id: UserId::from("e@co"),
            role: "employee".to_string(),
            manager_id: Some(UserId::from("m@co")),
            supervisor_id: Some(UserId::from("m@co")),
            approval_limit: 0,
        });
        users.seed(UserProfile {
            id: UserId::from("m@co"),
            role: "manager".to_string(),
            manager_id: None,
            supervisor_id: None,
            approval_limit: 2_000,
        });
        users.seed(UserProfile {
            id: UserId::from("s@co"),
            role: "manager".to_string(),
            manager_id: None,
            supervisor_id: None,
            approval_limit: 2_000,
        });

        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.seed(
            "REF-A",
            CatalogEntry {
                product_id: "P1".to_string(),
                title: "Headset".to_string(),
                price: 120,
                currency: "EUR".to_string(),
                image_ref: None,
            },
        );
        catalog.seed(
            "REF-X",
            CatalogEntry {
                product_id: "P2".to_string(),
                title: "Combat Weapon Accessory".to_string(),
                price: 50,
                currency: "EUR".to_string(),
                image_ref: None,
            },
        );

        Self {
            catalog,
            users,
            delegations: Arc::new(InMemoryDelegationStore::new()),
            purchases: Arc::new(InMemoryPurchaseGateway::new()),
            notifications: Arc::new(InMemoryNotificationSink::new()),
            audit: Arc::new(InMemoryAuditLog::new()),
            clock: Arc::new(SimulatedTimebase::new(epoch())),
            config: EngineConfig::default(),
        }
    }

    pub fn approval_deps(&self) -> ApprovalDeps {
        ApprovalDeps {
            catalog: self.catalog.clone(),
            users: self.users.clone(),
            delegations: self.delegations.clone(),
            purchases: self.purchases.clone(),
            notifications: self.notifications.clone(),
            audit: self.audit.clone(),
            config: self.config.clone(),
        }
    }

    pub fn delegation_deps(&self) -> DelegationDeps {
        DelegationDeps {
            users: self.users.clone(),
            store: self.delegations.clone(),
            audit: self.audit.clone(),
            config: self.config.clone(),
        }
    }

    /// A fresh `Ctx` over this fixture's clock, paired with the `SignalBox`
    /// and `CancellationToken` the caller needs to drive the workflow.
    pub fn ctx(&self, instance_id: impl Into<String>) -> (Ctx, SignalBox, CancellationToken) {
        let signals = SignalBox::new();
        let cancellation = CancellationToken::new();
        let ctx = Ctx::new(
            History::new(),
            self.clock.clone(),
            signals.clone(),
            cancellation.clone(),
            instance_id,
        );
        (ctx, signals, cancellation)
    }
}
