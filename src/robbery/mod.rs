use crate::common::PEER_QUERY_CONCURRENCY;
use crate::config::NodeConfig;
use crate::core::Money;
use crate::net::{group_request_bounded, HostScanner, PeerProxy};
use crate::protocol::{parse_value_response, Verb};
use std::collections::HashMap;
use std::net::Ipv4Addr;


/// What a peer reported about itself. `None` means the value could not be
/// obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankNodeSnapshot {
    pub ip: Ipv4Addr,
    pub total_amount: Option<Money>,
    pub client_count: Option<u64>,
}

/// A peer that answered both `BA` and `BN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankNode {
    pub ip: Ipv4Addr,
    pub amount: Money,
    pub clients: u64,
}

impl BankNodeSnapshot {
    pub fn known(&self) -> Option<BankNode> {
        Some(BankNode {
            ip: self.ip,
            amount: self.total_amount?,
            clients: self.client_count?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobberyState {
    pub money: Money,
    pub path: Vec<Ipv4Addr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobberyPlan {
    pub ips: Vec<Ipv4Addr>,
    pub money: Money,
    pub clients: u64,
}

/// Picks the set of nodes holding at least `target` that affects the
/// fewest clients. Each node is used at most once; among plans with the
/// same client count the richer one wins.
pub fn plan_robbery(nodes: &[BankNode], target: Money) -> Option<RobberyPlan> {
    let mut states: HashMap<u64, RobberyState> = HashMap::new();
    states.insert(
        0,
        RobberyState {
            money: 0,
            path: Vec::new(),
        },
    );

    for node in nodes {
        // Iterate over the states as they were before this node so it is
        // never added twice.
        let snapshot = states.clone();
        for (weight, state) in snapshot {
            let new_weight = weight.saturating_add(node.clients);
            let new_money = state.money.saturating_add(node.amount);
            let improves = states
                .get(&new_weight)
                .map(|existing| new_money > existing.money)
                .unwrap_or(true);
            if improves {
                let mut path = state.path;
                path.push(node.ip);
                states.insert(
                    new_weight,
                    RobberyState {
                        money: new_money,
                        path,
                    },
                );
            }
        }
    }

    states
        .into_iter()
        .filter(|(_, state)| state.money >= target)
        .min_by(|(wa, a), (wb, b)| wa.cmp(wb).then(b.money.cmp(&a.money)))
        .map(|(clients, state)| RobberyPlan {
            ips: state.path,
            money: state.money,
            clients,
        })
}

pub fn format_plan(target: Money, plan: &RobberyPlan) -> String {
    format!(
        "RP To obtain {} you will need to rob {} affecting {} clients.",
        target,
        plan.ips
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(","),
        plan.clients
    )
}

pub const NO_PEERS_RESPONSE: &str = "ER no other bank nodes were found";
pub const INSUFFICIENT_FUNDS_RESPONSE: &str = "RP Plan will fail: Insufficient funds in the network";

pub struct RobberyPlanner<'a> {
    config: &'a NodeConfig,
}

impl<'a> RobberyPlanner<'a> {
    pub fn new(config: &'a NodeConfig) -> Self {
        Self { config }
    }

    pub async fn execute_robbery_plan(&self, target: Money) -> String {
        log::info!("Planning a robbery of {}", target);
        let nodes = self.collect_network_data().await;
        if nodes.is_empty() {
            log::warn!("No other bank nodes were found");
            return NO_PEERS_RESPONSE.into();
        }
        match plan_robbery(&nodes, target) {
            Some(plan) => {
                log::info!(
                    "Robbery plan: {} nodes, {} money, {} clients",
                    plan.ips.len(),
                    plan.money,
                    plan.clients
                );
                format_plan(target, &plan)
            }
            None => INSUFFICIENT_FUNDS_RESPONSE.into(),
        }
    }

    /// Scans the network and asks every other host for its totals, a few
    /// hosts at a time. Nodes come back in scan order no matter which one
    /// answers first.
    pub async fn collect_network_data(&self) -> Vec<BankNode> {
        let peers = HostScanner::new(self.config)
            .scan_network()
            .await
            .into_iter()
            .filter(|ip| *ip != self.config.ip)
            .collect::<Vec<_>>();

        group_request_bounded(&peers, PEER_QUERY_CONCURRENCY, |ip| {
            self.get_remote_bank_stats(ip)
        })
            .await
            .into_iter()
            .filter_map(|(ip, snapshot)| {
                let node = snapshot.known();
                if node.is_none() {
                    log::debug!("Skipping {}: bank stats unavailable", ip);
                }
                node
            })
            .collect()
    }

    async fn get_remote_bank_stats(&self, ip: Ipv4Addr) -> BankNodeSnapshot {
        let proxy = PeerProxy::connect(ip, self.config).await;
        if proxy.port().is_none() {
            return BankNodeSnapshot {
                ip,
                total_amount: None,
                client_count: None,
            };
        }
        let total_amount = parse_value_response(
            &proxy.forward_request(Verb::BankAmount.code()).await,
            Verb::BankAmount,
        );
        let client_count = parse_value_response(
            &proxy.forward_request(Verb::BankNumber.code()).await,
            Verb::BankNumber,
        );
        BankNodeSnapshot {
            ip,
            total_amount,
            client_count,
        }
    }
}
