//! Thecus NAS query engine - health checks against the device web UI
//!
//! The engine turns the undocumented, per-model JSON endpoints of Thecus
//! devices into one monitoring verdict:
//! - session-authenticated requests with cookie persistence and one re-login
//! - endpoint fallback across firmware generations
//! - status aggregation with a monotonic severity
//! - check routines (health, cpu, memory, disk-usage, uptime)

pub mod aggregator;
pub mod checks;
pub mod device;
pub mod endpoints;
pub mod error;
pub mod model;
pub mod resolver;
pub mod session;
pub mod severity;
pub mod thresholds;
pub mod transport;

pub use aggregator::{AggregateResult, PartialStatus, StatusAggregator};
pub use checks::{run_check, CheckSettings, CheckType};
pub use device::DeviceResponse;
pub use error::{CheckError, Result};
pub use resolver::{DeviceSource, EndpointFallbackResolver, EndpointQuery, Resolved};
pub use session::{Credentials, FileSessionStore, MemorySessionStore, SessionClient, SessionStore};
pub use severity::Severity;
pub use thresholds::{PerfMetric, ThresholdKind, ThresholdPair, Thresholds};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
