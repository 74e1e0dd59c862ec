use std::sync::Arc;

use proptest::prelude::*;

use llm_router::cache::{CacheSettings, MemoryCache};
use llm_router::context::RequestContext;
use llm_router::usage::{Dimension, RpmTpmManager};

#[derive(Debug, Clone, Copy)]
enum Op {
    Reserve(u64),
    Confirm(u64),
    Release(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..50).prop_map(Op::Reserve),
        (1u64..50).prop_map(Op::Confirm),
        (1u64..50).prop_map(Op::Release),
    ]
}

/// Reference model of one usage record under the manager's arithmetic:
/// confirm and release saturate, and both no-op before the first reserve.
#[derive(Default)]
struct Model {
    exists: bool,
    used: u64,
    occupying: u64,
}

impl Model {
    fn apply(&mut self, op: Op) {
        match op {
            Op::Reserve(amount) => {
                self.exists = true;
                self.occupying += amount;
            }
            Op::Confirm(amount) if self.exists => {
                self.used += amount;
                self.occupying = self.occupying.saturating_sub(amount);
            }
            Op::Release(amount) if self.exists => {
                self.occupying = self.occupying.saturating_sub(amount);
            }
            _ => {}
        }
    }

    fn total(&self) -> u64 {
        self.used + self.occupying
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// For any operation sequence, the manager's observable total matches
    /// the reference model, and in particular never underflows.
    #[test]
    fn usage_follows_the_reference_model(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let manager = RpmTpmManager::new(Arc::new(MemoryCache::new(
                CacheSettings::default(),
            )));
            let ctx = RequestContext::new("g", 0);
            let mut model = Model::default();

            for op in &ops {
                match *op {
                    Op::Reserve(amount) => {
                        manager.reserve(&ctx, Dimension::Tpm, "g", "p", amount).await;
                    }
                    Op::Confirm(amount) => {
                        manager.confirm(&ctx, Dimension::Tpm, "g", "p", amount).await;
                    }
                    Op::Release(amount) => {
                        manager.release(&ctx, Dimension::Tpm, "g", "p", amount).await;
                    }
                }
                model.apply(*op);

                let observed = manager.usage(&ctx, Dimension::Tpm, "g", "p").await;
                prop_assert_eq!(observed, model.total());
            }
            Ok(())
        })?;
    }

    /// Balanced attempt lifecycles (reserve then confirm-or-release of the
    /// same amount) leave `occupying` at zero: the total equals the sum of
    /// confirmed amounts.
    #[test]
    fn balanced_lifecycles_leave_only_confirmed_usage(
        attempts in prop::collection::vec((1u64..100, prop::bool::ANY), 1..30),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let manager = RpmTpmManager::new(Arc::new(MemoryCache::new(
                CacheSettings::default(),
            )));
            let ctx = RequestContext::new("g", 0);
            let mut confirmed_sum = 0u64;

            for (amount, succeed) in &attempts {
                manager.reserve(&ctx, Dimension::Tpm, "g", "p", *amount).await;
                if *succeed {
                    manager.confirm(&ctx, Dimension::Tpm, "g", "p", *amount).await;
                    confirmed_sum += amount;
                } else {
                    manager.release(&ctx, Dimension::Tpm, "g", "p", *amount).await;
                }
            }

            let observed = manager.usage(&ctx, Dimension::Tpm, "g", "p").await;
            prop_assert_eq!(observed, confirmed_sum);
            Ok(())
        })?;
    }
}
