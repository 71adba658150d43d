pub mod audit;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod graph;
pub mod pricing;
pub mod quote;
pub mod session;
pub mod traversal;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use builder::{CalculationType, QuoteBuilder, QuotePlan};
pub use catalog::{InMemoryCatalog, PriceCatalogPort, PriceEntry};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{
    AuthoringError, CatalogError, ConfigurationError, DomainError, EngineError, ValidationError,
};
pub use graph::authoring::{load_service_definition, parse_service_definition, ServiceDefinition};
pub use graph::{AnswerType, Question, QuestionGraph, QuestionId};
pub use pricing::{Adjustment, AdjustmentKind, AppliedAdjustment, Predicate};
pub use quote::{Quote, QuoteId, QuoteStatus};
pub use session::{AnswerRecord, AnswerStore};
pub use traversal::{TraversalEngine, TraversalState};
