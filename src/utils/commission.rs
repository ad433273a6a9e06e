use serde::Serialize;

/// Share of a task price paid to the agent who completed it.
pub const AGENT_RATE: f64 = 0.30;
/// Share of the agent commission paid to the agent's manager.
pub const MANAGER_RATE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSplit {
    pub price: f64,
    pub agent_commission: f64,
    pub manager_commission: f64,
    pub platform_revenue: f64,
}

pub fn agent_commission(price: f64) -> f64 {
    (price * AGENT_RATE).round()
}

pub fn manager_commission(agent_commission: f64) -> f64 {
    (agent_commission * MANAGER_RATE).round()
}

pub fn split(price: f64) -> CommissionSplit {
    let agent = agent_commission(price);
    let manager = manager_commission(agent);
    CommissionSplit {
        price,
        agent_commission: agent,
        manager_commission: manager,
        platform_revenue: price - agent - manager,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionTotals {
    pub task_count: usize,
    pub gross: f64,
    pub agent_commission: f64,
    pub manager_commission: f64,
    pub platform_revenue: f64,
}

/// Sum the splits of a set of task prices.
pub fn totals<I: IntoIterator<Item = f64>>(prices: I) -> CommissionTotals {
    prices.into_iter().map(split).fold(CommissionTotals::default(), |mut acc, s| {
        acc.task_count += 1;
        acc.gross += s.price;
        acc.agent_commission += s.agent_commission;
        acc.manager_commission += s.manager_commission;
        acc.platform_revenue += s.platform_revenue;
        acc
    })
}
