//! # campus-runtime
//!
//! The services behind every admin action.
//!
//! - [`PersonProvisioner`] keeps a person's identity-provider account and local
//!   row consistent across create, update and delete, compensating a failed
//!   create by deleting the account it just made.
//! - [`RecordService`] performs single-table mutations for the other school
//!   entities behind a [`campus_policy::ScopePolicy`].
//!
//! Both depend only on the [`IdentityProvider`], [`PersonStore`] and
//! [`RecordStore`] traits; [`memory`] provides in-process implementations.

pub mod audit;
pub mod identity;
pub mod memory;
pub mod provisioner;
pub mod records;
pub mod store;
pub mod translate;

pub use audit::{AuditSink, MemoryAuditSink, NullAuditSink, ProvisionEvent, ProvisionStage, TracingAuditSink};
pub use identity::{Account, AccountPatch, IdentityError, IdentityProvider, NewAccount, ProviderMessage};
pub use memory::{InMemoryDirectory, InMemoryStore};
pub use provisioner::PersonProvisioner;
pub use records::RecordService;
pub use store::{ClassOccupancy, PersonStore, RecordStore, StoreError};
