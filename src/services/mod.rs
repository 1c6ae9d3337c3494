pub mod comment_parser;
pub mod context;
pub mod dispatcher;
pub mod event_parser;
pub mod handler_registry;
pub mod handlers;
pub mod metrics;
pub mod result_ingestor;
pub mod target_reconciler;
pub mod urls;

pub use comment_parser::{parse_commands, CommandKeyword, ParsedCommand};
pub use context::ServiceContext;
pub use dispatcher::JobDispatcher;
pub use event_parser::{Classification, EventParser};
pub use handler_registry::{HandlerMatch, HandlerPredicate, HandlerRegistration, HandlerRegistry};
pub use metrics::{Metrics, MetricsSnapshot};
pub use result_ingestor::ResultIngestor;
pub use target_reconciler::{ReconcilePlan, ReconcileRequest, TargetReconciler};
pub use urls::DashboardUrls;
