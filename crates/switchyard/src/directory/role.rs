use serde::{Deserialize, Serialize};

use crate::types::ServiceType;

/// Singleton service roles tracked by the directory.
///
/// Strategies are not a role; any number of them may be registered and they
/// are kept in their own list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    OrderManagement,
    RefData,
    MarketData,
    MarketDataSnapshot,
    Performance,
    Persist,
    DeadLetter,
    Risk,
    OrderAndTradeSnapshot,
    Warmup,
    Notification,
    Pricing,
    Dashboard,
    DashboardWeb,
    ScoreBoard,
}

impl Role {
    pub const COUNT: usize = 16;

    pub const ALL: [Role; Role::COUNT] = [
        Role::Admin,
        Role::OrderManagement,
        Role::RefData,
        Role::MarketData,
        Role::MarketDataSnapshot,
        Role::Performance,
        Role::Persist,
        Role::DeadLetter,
        Role::Risk,
        Role::OrderAndTradeSnapshot,
        Role::Warmup,
        Role::Notification,
        Role::Pricing,
        Role::Dashboard,
        Role::DashboardWeb,
        Role::ScoreBoard,
    ];

    /// Slot index in the directory's role table.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Short name given to the role's reference.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::OrderManagement => "omes",
            Role::RefData => "rds",
            Role::MarketData => "mds",
            Role::MarketDataSnapshot => "mdsss",
            Role::Performance => "perf",
            Role::Persist => "persi",
            Role::DeadLetter => "dl",
            Role::Risk => "risk",
            Role::OrderAndTradeSnapshot => "otss",
            Role::Warmup => "warmup",
            Role::Notification => "notify",
            Role::Pricing => "pricing",
            Role::Dashboard => "dashboard",
            Role::DashboardWeb => "dashboardweb",
            Role::ScoreBoard => "scoreboard",
        }
    }

    /// Service type of sinks that fill this role.
    pub fn service_type(self) -> ServiceType {
        match self {
            Role::Admin => ServiceType::Admin,
            Role::OrderManagement => ServiceType::OrderManagementAndExecution,
            Role::RefData => ServiceType::RefData,
            Role::MarketData => ServiceType::MarketData,
            Role::MarketDataSnapshot => ServiceType::MarketDataSnapshot,
            Role::Performance => ServiceType::Performance,
            Role::Persist => ServiceType::Persist,
            Role::DeadLetter => ServiceType::DeadLetter,
            Role::Risk => ServiceType::PortfolioAndRisk,
            Role::OrderAndTradeSnapshot => ServiceType::OrderAndTradeSnapshot,
            Role::Warmup => ServiceType::Warmup,
            Role::Notification => ServiceType::Notification,
            Role::Pricing => ServiceType::Pricing,
            Role::Dashboard => ServiceType::Dashboard,
            Role::DashboardWeb => ServiceType::DashboardStandAloneWeb,
            Role::ScoreBoard => ServiceType::ScoreBoard,
        }
    }

    /// Role filled by sinks of `service_type`, if any.
    pub fn for_service_type(service_type: ServiceType) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| role.service_type() == service_type)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_indices_are_dense() {
        for (i, role) in Role::ALL.into_iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }

    #[test]
    fn test_role_service_type_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::for_service_type(role.service_type()), Some(role));
        }
    }

    #[test]
    fn test_types_without_role() {
        for service_type in [
            ServiceType::Null,
            ServiceType::Strategy,
            ServiceType::Client,
            ServiceType::Exchange,
            ServiceType::LineHandler,
            ServiceType::Echo,
        ] {
            assert_eq!(Role::for_service_type(service_type), None);
        }
    }
}
