use {
    crate::scheduler::Schedule,
    alloy::primitives::{Address, B256},
    anyhow::{Context, Result},
    composable::{
        ConditionalOrder,
        Multiplexer,
        OrderCatalog,
        PollParams,
        PollResult,
        chain::ChainRead,
        conditional_order::leaf_to_id,
        order_book::OrderBookApi,
    },
    std::{path::PathBuf, sync::Arc},
};

/// Reads serialized multiplexers from disk.
pub fn load_multiplexers(paths: &[PathBuf], catalog: &OrderCatalog) -> Result<Vec<Multiplexer>> {
    paths
        .iter()
        .map(|path| {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Multiplexer::from_json(&json, catalog)
                .with_context(|| format!("deserializing {}", path.display()))
        })
        .collect()
}

/// Polls every order of an owner's multiplexers as often as their last poll
/// result allows.
pub struct Watchtower {
    owner: Address,
    chain_id: u64,
    chain: Arc<dyn ChainRead>,
    order_book: Arc<dyn OrderBookApi>,
    multiplexers: Vec<Multiplexer>,
    schedule: Schedule,
}

impl Watchtower {
    pub fn new(
        owner: Address,
        chain_id: u64,
        chain: Arc<dyn ChainRead>,
        order_book: Arc<dyn OrderBookApi>,
        multiplexers: Vec<Multiplexer>,
    ) -> Result<Self> {
        for multiplexer in &multiplexers {
            anyhow::ensure!(
                multiplexer.chain() == chain_id,
                "multiplexer for chain {} but connected to chain {chain_id}",
                multiplexer.chain()
            );
        }
        Ok(Self {
            owner,
            chain_id,
            chain,
            order_book,
            multiplexers,
            schedule: Schedule::default(),
        })
    }

    /// Warns about multiplexers whose root is not the one committed on chain.
    /// Their orders fail authorization until the root is set.
    pub async fn check_roots(&self) -> Result<()> {
        let committed = self.chain.root(self.owner).await.context("root")?;
        for multiplexer in &self.multiplexers {
            let root = multiplexer.root()?;
            if root != committed {
                tracing::warn!(%root, %committed, "multiplexer root is not committed on chain");
            }
        }
        Ok(())
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Polls all orders that are due at the latest block.
    pub async fn single_run(&mut self) -> Result<Vec<(B256, PollResult)>> {
        let block = self
            .chain
            .latest_block()
            .await
            .context("latest block")?;

        let mut due = Vec::new();
        for multiplexer in &self.multiplexers {
            for proof in multiplexer.get_proofs(None)? {
                let id = leaf_to_id(&proof.params);
                if self.schedule.is_due(&id, &block) {
                    due.push((id, multiplexer.get_by_id(id)?, proof.proof));
                }
            }
        }
        tracing::debug!(block = block.block_number, due = due.len(), "polling orders");

        let (owner, chain_id) = (self.owner, self.chain_id);
        let (chain, order_book) = (self.chain.as_ref(), self.order_book.as_ref());
        let polls = due.into_iter().map(|(id, order, proof)| async move {
            let params = PollParams {
                owner,
                chain_id,
                chain,
                order_book,
                proof: Some(proof),
                off_chain_input: None,
                block_info: Some(block),
            };
            (id, order.poll(&params).await)
        });
        let results = futures::future::join_all(polls).await;

        for (id, result) in &results {
            match result {
                PollResult::Success { order, .. } => tracing::info!(
                    %id,
                    sell_amount = %order.sellAmount,
                    buy_amount = %order.buyAmount,
                    valid_to = order.validTo,
                    "order is tradeable"
                ),
                PollResult::UnexpectedError { reason, error } => {
                    tracing::warn!(%id, ?reason, ?error, "unexpected error polling order")
                }
                _ => tracing::debug!(%id, code = result.code(), reason = ?result.reason(), "order not tradeable"),
            }
            self.schedule.record(*id, result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::scheduler::Next,
        alloy::primitives::{Bytes, I256, U256, address},
        composable::{
            Twap,
            chain::{MockChainRead, TradeableOrder},
            contracts::GPv2Order,
            order_book::MockOrderBookApi,
            order_types::twap::{DurationOfPart, StartTime, TwapData},
            poll::BlockInfo,
        },
        model::order::{BuyTokenDestination, Marker, OrderKind, SellTokenSource},
        std::io::Write,
    };

    const OWNER: Address = address!("1111111111111111111111111111111111111111");
    const START: u64 = 1700000000;

    fn twap(salt: u8, start: u64) -> Twap {
        Twap::with_salt(
            TwapData {
                sell_token: address!("6810e776880c02933d47db1b9fc05908e5386b96"),
                buy_token: address!("dae5f1590db13e3b40423b5b5c5fbf175515910b"),
                receiver: Address::ZERO,
                sell_amount: I256::try_from(1_000_000).unwrap(),
                buy_amount: I256::try_from(10_000).unwrap(),
                start_time: StartTime::AtEpoch {
                    epoch: I256::try_from(start).unwrap(),
                },
                number_of_parts: I256::try_from(10).unwrap(),
                time_between_parts: I256::try_from(100).unwrap(),
                duration_of_part: DurationOfPart::Auto,
                app_data: B256::ZERO,
            },
            B256::repeat_byte(salt),
        )
    }

    fn multiplexer() -> Multiplexer {
        let mut multiplexer = Multiplexer::empty(1);
        multiplexer.add(twap(1, START)).unwrap();
        multiplexer.add(twap(2, START + 500)).unwrap();
        multiplexer
    }

    fn tradeable() -> TradeableOrder {
        TradeableOrder {
            order: GPv2Order::Data {
                sellToken: address!("6810e776880c02933d47db1b9fc05908e5386b96"),
                buyToken: address!("dae5f1590db13e3b40423b5b5c5fbf175515910b"),
                receiver: Address::ZERO,
                sellAmount: U256::from(100_000),
                buyAmount: U256::from(1000),
                validTo: 1700000099,
                appData: B256::ZERO,
                feeAmount: U256::ZERO,
                kind: OrderKind::Sell.hash(),
                partiallyFillable: false,
                sellTokenBalance: SellTokenSource::Erc20.hash(),
                buyTokenBalance: BuyTokenDestination::Erc20.hash(),
            },
            signature: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn polls_due_orders_only() {
        observe::tracing::initialize_reentrant("watchtower=debug,composable=debug");
        let multiplexer = multiplexer();
        let root = multiplexer.root().unwrap();
        let first = twap(1, START).id();
        let second = twap(2, START + 500).id();

        let mut chain = MockChainRead::new();
        chain.expect_latest_block().times(2).returning(|| {
            Ok(BlockInfo {
                block_number: 10,
                block_timestamp: START,
            })
        });
        chain.expect_root().with(mockall::predicate::eq(OWNER)).returning(move |_| Ok(root));
        chain
            .expect_tradeable_order()
            .times(2)
            .returning(|_, _, _, _| Ok(tradeable()));
        let mut order_book = MockOrderBookApi::new();
        let mut posted = false;
        order_book
            .expect_order_exists()
            .times(2)
            .returning(move |_| Ok(std::mem::replace(&mut posted, true)));

        let mut watchtower = Watchtower::new(
            OWNER,
            1,
            Arc::new(chain),
            Arc::new(order_book),
            vec![multiplexer],
        )
        .unwrap();
        watchtower.check_roots().await.unwrap();

        let results = watchtower.single_run().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, first);
        assert_eq!(results[0].1.code(), "SUCCESS");
        assert_eq!(results[1].0, second);
        assert_eq!(
            results[1].1,
            PollResult::TryAtEpoch {
                epoch: START + 500,
                reason: "TWAP hasn't started yet. Starts at 1700000500 (2023-11-14T22:21:40.000Z)"
                    .into(),
            }
        );
        assert_eq!(watchtower.schedule().next(&second), Some(Next::Epoch(START + 500)));

        // The first order is polled again, finds its part in the order book and
        // waits for the next part. The second one is not due yet.
        let results = watchtower.single_run().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, first);
        assert_eq!(
            watchtower.schedule().next(&first),
            Some(Next::Epoch(START + 100))
        );
    }

    #[test]
    fn rejects_multiplexers_of_other_chains() {
        let result = Watchtower::new(
            OWNER,
            100,
            Arc::new(MockChainRead::new()),
            Arc::new(MockOrderBookApi::new()),
            vec![multiplexer()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn loads_multiplexers_from_files() {
        let multiplexer = multiplexer();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(multiplexer.to_json().unwrap().as_bytes())
            .unwrap();

        let loaded =
            load_multiplexers(&[file.path().to_path_buf()], &OrderCatalog::default()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].root().unwrap(), multiplexer.root().unwrap());

        let error = load_multiplexers(&[file.path().to_path_buf()], &OrderCatalog::empty())
            .unwrap_err();
        assert!(format!("{error:#}").contains("Unknown order type: twap"));

        assert!(
            load_multiplexers(&[PathBuf::from("/does/not/exist.json")], &OrderCatalog::default())
                .is_err()
        );
    }
}
