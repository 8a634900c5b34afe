//! Topic routing: first topic to decoder, destination table and emitter rule.

use super::{erc20, leo, seawater, thirdweb, DecodeError, DecodedEvent, EventAbis, Provenance};
use crate::datasource::RawLog;
use crate::domain::Address;
use ethabi::ethereum_types::H256;
use std::fmt;
use tracing::{debug, warn};

type DecodeFn = fn(&EventAbis, &RawLog) -> Result<DecodedEvent, DecodeError>;

/// Which emitters a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterRule {
    /// Any contract may emit the event.
    Any,
    /// Only the configured contract; other emitters are skipped.
    MustEqual(Address),
}

impl EmitterRule {
    pub fn accepts(&self, emitter: &Address) -> bool {
        match self {
            EmitterRule::Any => true,
            EmitterRule::MustEqual(expected) => expected == emitter,
        }
    }
}

/// One router entry.
#[derive(Clone)]
pub struct Route {
    pub name: &'static str,
    pub topic: H256,
    pub table: &'static str,
    pub emitter: EmitterRule,
    decode: DecodeFn,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("topic", &self.topic)
            .field("table", &self.table)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

/// Contracts whose events are scoped to a single emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedContracts {
    pub seawater: Address,
    pub thirdweb_factory: Address,
    pub leo: Address,
}

/// Result of routing one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Decoded and provenance-tagged, ready for `table`.
    Decoded {
        table: &'static str,
        event: DecodedEvent,
    },
    /// Emitted by a contract the route does not accept.
    Skipped {
        name: &'static str,
        emitter: Address,
    },
}

/// Maps a log's first topic to exactly one decoder.
#[derive(Debug, Clone)]
pub struct TopicRouter {
    abis: EventAbis,
    routes: Vec<Route>,
}

impl TopicRouter {
    pub fn new(abis: EventAbis, contracts: &TrackedContracts) -> Self {
        let seawater_only = EmitterRule::MustEqual(contracts.seawater.clone());
        let thirdweb_only = EmitterRule::MustEqual(contracts.thirdweb_factory.clone());
        let leo_only = EmitterRule::MustEqual(contracts.leo.clone());

        let routes = vec![
            Route {
                name: "Transfer",
                topic: abis.transfer.signature(),
                table: "events_erc20_transfer",
                emitter: EmitterRule::Any,
                decode: |a, l| erc20::decode_transfer(a, l).map(DecodedEvent::Transfer),
            },
            Route {
                name: "AccountCreated",
                topic: abis.account_created.signature(),
                table: "events_thirdweb_accountcreated",
                emitter: thirdweb_only,
                decode: |a, l| {
                    thirdweb::decode_account_created(a, l).map(DecodedEvent::AccountCreated)
                },
            },
            Route {
                name: "CampaignBalanceUpdated",
                topic: abis.campaign_balance_updated.signature(),
                table: "events_leo_campaignbalanceupdated",
                emitter: leo_only.clone(),
                decode: |a, l| {
                    leo::decode_campaign_balance_updated(a, l)
                        .map(DecodedEvent::CampaignBalanceUpdated)
                },
            },
            Route {
                name: "CampaignCreated",
                topic: abis.campaign_created.signature(),
                table: "events_leo_campaigncreated",
                emitter: leo_only.clone(),
                decode: |a, l| leo::decode_campaign_created(a, l).map(DecodedEvent::CampaignCreated),
            },
            Route {
                name: "CampaignUpdated",
                topic: abis.campaign_updated.signature(),
                table: "events_leo_campaignupdated",
                emitter: leo_only,
                decode: |a, l| leo::decode_campaign_updated(a, l).map(DecodedEvent::CampaignUpdated),
            },
            Route {
                name: "MintPosition",
                topic: abis.mint_position.signature(),
                table: "events_seawater_mintposition",
                emitter: seawater_only.clone(),
                decode: |a, l| seawater::decode_mint_position(a, l).map(DecodedEvent::MintPosition),
            },
            Route {
                name: "BurnPosition",
                topic: abis.burn_position.signature(),
                table: "events_seawater_burnposition",
                emitter: seawater_only.clone(),
                decode: |a, l| seawater::decode_burn_position(a, l).map(DecodedEvent::BurnPosition),
            },
            Route {
                name: "TransferPosition",
                topic: abis.transfer_position.signature(),
                table: "events_seawater_transferposition",
                emitter: seawater_only.clone(),
                decode: |a, l| {
                    seawater::decode_transfer_position(a, l).map(DecodedEvent::TransferPosition)
                },
            },
            Route {
                name: "UpdatePositionLiquidity",
                topic: abis.update_position_liquidity.signature(),
                table: "events_seawater_updatepositionliquidity",
                emitter: seawater_only.clone(),
                decode: |a, l| {
                    seawater::decode_update_position_liquidity(a, l)
                        .map(DecodedEvent::UpdatePositionLiquidity)
                },
            },
            Route {
                name: "CollectFees",
                topic: abis.collect_fees.signature(),
                table: "events_seawater_collectfees",
                emitter: seawater_only.clone(),
                decode: |a, l| seawater::decode_collect_fees(a, l).map(DecodedEvent::CollectFees),
            },
            Route {
                name: "NewPool",
                topic: abis.new_pool.signature(),
                table: "events_seawater_newpool",
                emitter: seawater_only.clone(),
                decode: |a, l| seawater::decode_new_pool(a, l).map(DecodedEvent::NewPool),
            },
            Route {
                name: "CollectProtocolFees",
                topic: abis.collect_protocol_fees.signature(),
                table: "events_seawater_collectprotocolfees",
                emitter: seawater_only.clone(),
                decode: |a, l| {
                    seawater::decode_collect_protocol_fees(a, l)
                        .map(DecodedEvent::CollectProtocolFees)
                },
            },
            Route {
                name: "Swap2",
                topic: abis.swap2.signature(),
                table: "events_seawater_swap2",
                emitter: seawater_only.clone(),
                decode: |a, l| seawater::decode_swap2(a, l).map(DecodedEvent::Swap2),
            },
            Route {
                name: "Swap1",
                topic: abis.swap1.signature(),
                table: "events_seawater_swap1",
                emitter: seawater_only,
                decode: |a, l| seawater::decode_swap1(a, l).map(DecodedEvent::Swap1),
            },
        ];

        TopicRouter { abis, routes }
    }

    /// First-topic filter matching every routed event, in route order.
    pub fn topics(&self) -> Vec<H256> {
        self.routes.iter().map(|r| r.topic).collect()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route, validate and decode one log.
    ///
    /// # Errors
    /// Returns an error when no route matches the first topic or the payload
    /// fails to decode. An emitter mismatch is not an error.
    pub fn route(&self, log: &RawLog) -> Result<RouteOutcome, DecodeError> {
        let topic0 = *log.topics.first().ok_or(DecodeError::EmptyTopics)?;
        let route = self
            .routes
            .iter()
            .find(|r| r.topic == topic0)
            .ok_or(DecodeError::UnknownTopic(topic0))?;

        if !route.emitter.accepts(&log.address) {
            warn!(
                event = route.name,
                emitter = %log.address,
                transaction_hash = %hex::encode(log.transaction_hash.as_bytes()),
                "Ignoring log from an unexpected emitter"
            );
            return Ok(RouteOutcome::Skipped {
                name: route.name,
                emitter: log.address.clone(),
            });
        }

        let mut event = (route.decode)(&self.abis, log)?;
        event.set_provenance(Provenance::from_log(log));

        debug!(
            event = route.name,
            block_number = log.block_number,
            emitter = %log.address,
            table = route.table,
            "Event identified"
        );

        Ok(RouteOutcome::Decoded {
            table: route.table,
            event,
        })
    }
}
