//! Business logic services.

pub mod business_bridge;
pub mod child_fanout;
pub mod enrichment;
pub mod field_codec;
pub mod name_mapper;
pub mod notifications;
pub mod question_catalog;
pub mod synchronizer;
pub mod workflow;

pub use business_bridge::BusinessRecordBridge;
pub use child_fanout::{ChildFanoutManager, FanoutResult};
pub use enrichment::{EnrichmentLookup, HttpEnrichmentClient};
pub use field_codec::FieldCodec;
pub use name_mapper::NameMapper;
pub use notifications::{LoggingNotifier, Notification, NotificationKind, NotificationQueue, Notifier};
pub use question_catalog::{HttpQuestionCatalog, QuestionCatalog};
pub use synchronizer::DualStoreSynchronizer;
pub use workflow::{SaveOptions, WorkflowStateMachine};
