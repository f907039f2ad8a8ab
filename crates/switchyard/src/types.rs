//! Common types for sinks and the directory.

use serde::{Deserialize, Serialize};

/// Sink id carried by sinks that do not occupy a directory slot.
pub const NA_SINK_ID: i32 = -1;

/// System id carried by sinks that belong to no system.
pub const NA_SYSTEM_ID: i32 = -1;

/// Category tag of the service behind a sink.
///
/// `Null` marks an unset slot; a stable reference bound to a `Null` sink may be
/// rebound to a sink of any type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    /// Unset slot
    #[default]
    Null,
    /// Administrative service owning the directory
    Admin,
    /// Reference data
    RefData,
    /// Order management and execution
    OrderManagementAndExecution,
    /// Market data
    MarketData,
    /// Market data snapshots
    MarketDataSnapshot,
    /// Latency and throughput monitoring
    Performance,
    /// Trading strategy
    Strategy,
    /// Persistence
    Persist,
    /// Dead letter mailbox
    DeadLetter,
    /// Portfolio and risk
    PortfolioAndRisk,
    /// Order and trade snapshots
    OrderAndTradeSnapshot,
    /// Self-test harness used in warmup mode
    Warmup,
    /// Notifications
    Notification,
    /// Pricing
    Pricing,
    /// Dashboard
    Dashboard,
    /// Stand-alone web dashboard
    DashboardStandAloneWeb,
    /// Scoreboard
    ScoreBoard,
    /// Client gateway
    Client,
    /// Exchange simulator
    Exchange,
    /// Exchange line handler
    LineHandler,
    /// Echo service
    Echo,
}

impl ServiceType {
    /// Every service type, in declaration order.
    pub const ALL: [ServiceType; 22] = [
        ServiceType::Null,
        ServiceType::Admin,
        ServiceType::RefData,
        ServiceType::OrderManagementAndExecution,
        ServiceType::MarketData,
        ServiceType::MarketDataSnapshot,
        ServiceType::Performance,
        ServiceType::Strategy,
        ServiceType::Persist,
        ServiceType::DeadLetter,
        ServiceType::PortfolioAndRisk,
        ServiceType::OrderAndTradeSnapshot,
        ServiceType::Warmup,
        ServiceType::Notification,
        ServiceType::Pricing,
        ServiceType::Dashboard,
        ServiceType::DashboardStandAloneWeb,
        ServiceType::ScoreBoard,
        ServiceType::Client,
        ServiceType::Exchange,
        ServiceType::LineHandler,
        ServiceType::Echo,
    ];

    /// Stable kebab-case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Null => "null",
            ServiceType::Admin => "admin",
            ServiceType::RefData => "ref-data",
            ServiceType::OrderManagementAndExecution => "order-management-and-execution",
            ServiceType::MarketData => "market-data",
            ServiceType::MarketDataSnapshot => "market-data-snapshot",
            ServiceType::Performance => "performance",
            ServiceType::Strategy => "strategy",
            ServiceType::Persist => "persist",
            ServiceType::DeadLetter => "dead-letter",
            ServiceType::PortfolioAndRisk => "portfolio-and-risk",
            ServiceType::OrderAndTradeSnapshot => "order-and-trade-snapshot",
            ServiceType::Warmup => "warmup",
            ServiceType::Notification => "notification",
            ServiceType::Pricing => "pricing",
            ServiceType::Dashboard => "dashboard",
            ServiceType::DashboardStandAloneWeb => "dashboard-stand-alone-web",
            ServiceType::ScoreBoard => "score-board",
            ServiceType::Client => "client",
            ServiceType::Exchange => "exchange",
            ServiceType::LineHandler => "line-handler",
            ServiceType::Echo => "echo",
        }
    }

    /// Parse a kebab-case service type name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Check if this is the unset placeholder type.
    pub fn is_null(&self) -> bool {
        matches!(self, ServiceType::Null)
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a publish or claim, with a stable numeric code.
///
/// | code | name |
/// |-----:|------|
/// | 0 | `OK` |
/// | -1 | `INSUFFICIENT_SPACE` |
/// | -2 | `FAILURE` |
/// | -3 | `LENGTH_EXCEEDS_MESSAGE_SIZE` |
/// | -4 | `LENGTH_EXCEEDS_FRAME_SIZE` |
/// | -5 | `EXCEEDS_MAX_SUBSCRIBER_SIZE` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
#[must_use]
pub enum PublishResult {
    /// The message was accepted
    Ok = 0,
    /// Capacity exhausted right now (queue or transport buffer full)
    InsufficientSpace = -1,
    /// Peer unreachable or transport closed
    Failure = -2,
    /// Payload larger than a queue slot
    LengthExceedsMessageSize = -3,
    /// Payload larger than a transport frame
    LengthExceedsFrameSize = -4,
    /// Too many subscribers for the destination
    ExceedsMaxSubscriberSize = -5,
}

impl PublishResult {
    /// Numeric result code.
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Map a numeric code back to a result.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            -1 => Some(Self::InsufficientSpace),
            -2 => Some(Self::Failure),
            -3 => Some(Self::LengthExceedsMessageSize),
            -4 => Some(Self::LengthExceedsFrameSize),
            -5 => Some(Self::ExceedsMaxSubscriberSize),
            _ => None,
        }
    }

    /// Stable upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InsufficientSpace => "INSUFFICIENT_SPACE",
            Self::Failure => "FAILURE",
            Self::LengthExceedsMessageSize => "LENGTH_EXCEEDS_MESSAGE_SIZE",
            Self::LengthExceedsFrameSize => "LENGTH_EXCEEDS_FRAME_SIZE",
            Self::ExceedsMaxSubscriberSize => "EXCEEDS_MAX_SUBSCRIBER_SIZE",
        }
    }

    /// Check if the message was accepted.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for PublishResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name for an arbitrary numeric result code, `UNKNOWN_RESULT` if not in the table.
pub fn describe_result_code(code: i64) -> &'static str {
    PublishResult::from_code(code).map_or("UNKNOWN_RESULT", PublishResult::name)
}

/// Fixed identity of a sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SinkIdentity {
    /// Process/host the destination lives in
    pub system_id: i32,
    /// Dense id, unique per system; indexes the directory slot array
    pub sink_id: i32,
    /// Category of the destination service
    pub service_type: ServiceType,
    /// Human readable name
    pub name: String,
}

impl SinkIdentity {
    /// Create a new sink identity.
    pub fn new(
        system_id: i32,
        sink_id: i32,
        service_type: ServiceType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            system_id,
            sink_id,
            service_type,
            name: name.into(),
        }
    }

    /// Identity for sinks that occupy no slot and belong to no system.
    pub fn not_applicable(name: impl Into<String>) -> Self {
        Self::new(NA_SYSTEM_ID, NA_SINK_ID, ServiceType::Null, name)
    }
}

impl std::fmt::Display for SinkIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[name:{}, systemId:{}, sinkId:{}, serviceType:{}]",
            self.name, self.system_id, self.sink_id, self.service_type
        )
    }
}

/// Whether a reference currently reaches a live destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkStatus {
    /// Backed by a transport
    Up,
    /// Backed by an inert placeholder
    Down,
}

impl std::fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkStatus::Up => write!(f, "up"),
            SinkStatus::Down => write!(f, "down"),
        }
    }
}
