use rust_decimal::Decimal;

use super::domain::PlanSnapshot;

/// Plans offered to agents. Purchases copy the plan onto the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    plans: Vec<PlanSnapshot>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<PlanSnapshot>) -> Self {
        Self { plans }
    }

    pub fn standard() -> Self {
        fn plan(code: &str, name: &str, price: i64, duration_days: i64, features: &[&str]) -> PlanSnapshot {
            PlanSnapshot {
                code: code.to_string(),
                name: name.to_string(),
                price: Decimal::new(price, 0),
                duration_days,
                features: features.iter().map(|feature| feature.to_string()).collect(),
            }
        }

        Self::new(vec![
            plan(
                "basic-monthly",
                "Basic",
                25_000,
                30,
                &["deal site", "10 active listings"],
            ),
            plan(
                "pro-monthly",
                "Pro",
                60_000,
                30,
                &["deal site", "unlimited listings", "custom domain"],
            ),
            plan(
                "pro-yearly",
                "Pro (yearly)",
                600_000,
                365,
                &["deal site", "unlimited listings", "custom domain", "priority support"],
            ),
        ])
    }

    pub fn find(&self, code: &str) -> Option<&PlanSnapshot> {
        self.plans.iter().find(|plan| plan.code == code)
    }

    pub fn plans(&self) -> &[PlanSnapshot] {
        &self.plans
    }
}
