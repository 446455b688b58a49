use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::{SchedulerConfig, TradingConfig};
use crate::error::Error;
use crate::execution::engine::ExecutionSource;
use crate::execution::scheduler::SCHEDULER_TASK;
use crate::execution::service::TradingService;
use crate::interfaces::Stores;
use crate::orders::order::{OrderStatus, OrderType};
use crate::price_infra::{InMemoryPriceOracle, Instrument, MockPriceOracle};
use crate::settlement::ledger::EntryType;
use crate::storage::in_memory_stores;
use crate::types::balance::Balance;
use crate::types::ids::UserId;
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;
use crate::types::timestamp::ManualClock;
use crate::utils::TaskSupervisor;

struct Harness {
    service: Arc<TradingService>,
    oracle: Arc<InMemoryPriceOracle>,
    stores: Stores,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let oracle = Arc::new(InMemoryPriceOracle::with_clock(clock.clone()));
    oracle.register(Ticker::from("AAPL"), "Apple Inc.");
    oracle.register(Ticker::from("TSLA"), "Tesla, Inc.");

    let stores = in_memory_stores();
    let service = Arc::new(TradingService::new(
        stores.clone(),
        oracle.clone(),
        clock,
        TradingConfig::default(),
    ));
    Harness { service, oracle, stores }
}

impl Harness {
    async fn user(&self, cash: i64) -> UserId {
        let user = UserId::new();
        self.service.open_account(user, Some(Balance::from_units(cash))).await.unwrap();
        user
    }

    fn price(&self, ticker: &str, units: i64) {
        self.oracle.set_price(&Ticker::from(ticker), Price::from_units(units));
    }

    async fn available(&self, user: UserId) -> Balance {
        self.service.accounts().load(user).await.unwrap().available_balance
    }

    async fn reserved(&self, user: UserId) -> Balance {
        self.service.accounts().load(user).await.unwrap().reserved_balance
    }

    async fn shares(&self, user: UserId, ticker: &str) -> Option<(Quantity, Quantity, Price)> {
        self.stores.holdings
            .load(user, &Ticker::from(ticker))
            .await
            .unwrap()
            .map(|h| (h.quantity, h.reserved_quantity, h.average_buy_price))
    }
}

fn qty(n: i64) -> Quantity {
    Quantity::from_i64(n)
}

#[tokio::test]
async fn test_market_buy_debits_and_creates_holding() {
    let h = harness();
    let user = h.user(1_000_000).await;
    h.price("AAPL", 50_000);

    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(10), OrderType::Market, None)
        .await
        .unwrap();

    assert_eq!(view.status, OrderStatus::Filled);
    assert_eq!(view.executed_price, Some(Price::from_units(50_000)));
    assert_eq!(view.total_value, Some(Balance::from_units(500_000)));
    assert!(view.executed_at.is_some());
    assert_eq!(h.available(user).await, Balance::from_units(500_000));
    assert_eq!(h.shares(user, "AAPL").await, Some((qty(10), qty(0), Price::from_units(50_000))));
}

#[tokio::test]
async fn test_limit_buy_waits_then_fills_at_observed_price() {
    let h = harness();
    let user = h.user(1_000_000).await;
    h.price("AAPL", 120);

    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();
    assert_eq!(view.status, OrderStatus::Pending);
    assert_eq!(h.reserved(user).await, Balance::from_units(500));
    assert_eq!(h.available(user).await, Balance::from_units(999_500));

    let scheduler = h.service.scheduler(&SchedulerConfig::default());
    let report = scheduler.run_once().await;
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.not_triggered, 1);

    h.price("AAPL", 95);
    let report = scheduler.run_once().await;
    assert_eq!(report.filled, 1);

    assert_eq!(h.reserved(user).await, Balance::zero());
    assert_eq!(h.available(user).await, Balance::from_units(999_525));
    assert_eq!(h.shares(user, "AAPL").await, Some((qty(5), qty(0), Price::from_units(95))));

    let order = h.service.get_order(user, view.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.executed_price, Some(Price::from_units(95)));

    let entries: Vec<EntryType> = h.service.ledger_entries(user).await.unwrap()
        .iter()
        .map(|e| e.entry_type)
        .collect();
    assert_eq!(entries, vec![EntryType::Open, EntryType::Reserve, EntryType::Settle]);
}

#[tokio::test]
async fn test_limit_buy_already_triggered_fills_on_placement() {
    let h = harness();
    let user = h.user(10_000).await;
    h.price("AAPL", 90);

    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(10), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();

    assert_eq!(view.status, OrderStatus::Filled);
    assert_eq!(h.available(user).await, Balance::from_units(9_100));
    assert_eq!(h.reserved(user).await, Balance::zero());
}

#[tokio::test]
async fn test_oversized_sell_is_refused_without_side_effects() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 100);
    h.service.place_buy_order(user, "AAPL".into(), qty(2), OrderType::Market, None).await.unwrap();
    let cash = h.available(user).await;

    let err = h.service
        .place_sell_order(user, "AAPL".into(), qty(3), OrderType::Market, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientShares { requested, available, .. }
        if requested == qty(3) && available == qty(2)));
    assert_eq!(h.available(user).await, cash);
    assert_eq!(h.shares(user, "AAPL").await.map(|s| s.0), Some(qty(2)));
    assert_eq!(h.service.get_order_history(user).await.unwrap().len(), 1);
    assert!(h.service.get_pending_orders(user).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sells_of_one_holding() {
    let h = harness();
    let user = h.user(10_000).await;
    h.price("AAPL", 100);
    h.service.place_buy_order(user, "AAPL".into(), qty(10), OrderType::Market, None).await.unwrap();

    let sells: Vec<_> = (0..2).map(|_| {
        let service = h.service.clone();
        tokio::spawn(async move {
            service.place_sell_order(user, "AAPL".into(), qty(10), OrderType::Market, None).await
        })
    }).collect();

    let results: Vec<_> = futures::future::join_all(sells).await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let filled = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(filled, 1);
    assert!(results.iter().any(|r| matches!(r, Err(Error::InsufficientShares { .. }))));
    assert_eq!(h.shares(user, "AAPL").await, None);
    assert_eq!(h.available(user).await, Balance::from_units(10_000));
}

#[tokio::test]
async fn test_buy_then_sell_at_same_price_restores_cash() {
    let h = harness();
    let user = h.user(5_000).await;
    h.price("TSLA", 250);

    h.service.place_buy_order(user, "TSLA".into(), qty(7), OrderType::Market, None).await.unwrap();
    assert_eq!(h.available(user).await, Balance::from_units(3_250));
    h.service.place_sell_order(user, "TSLA".into(), qty(7), OrderType::Market, None).await.unwrap();

    assert_eq!(h.available(user).await, Balance::from_units(5_000));
    assert_eq!(h.shares(user, "TSLA").await, None);
}

#[tokio::test]
async fn test_cancel_releases_reservation_once() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 120);

    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();
    let cancelled = h.service.cancel_order(user, view.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.available(user).await, Balance::from_units(1_000));
    assert_eq!(h.reserved(user).await, Balance::zero());

    let err = h.service.cancel_order(user, view.id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyTerminal { status: OrderStatus::Cancelled, .. }));
    assert_eq!(h.available(user).await, Balance::from_units(1_000));
    assert_eq!(h.reserved(user).await, Balance::zero());
}

#[tokio::test]
async fn test_cancel_filled_order_is_already_terminal() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 100);

    let view = h.service.place_buy_order(user, "AAPL".into(), qty(1), OrderType::Market, None).await.unwrap();
    let cash = h.available(user).await;

    let err = h.service.cancel_order(user, view.id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyTerminal { status: OrderStatus::Filled, .. }));
    assert_eq!(h.available(user).await, cash);
    assert_eq!(h.shares(user, "AAPL").await.map(|s| s.0), Some(qty(1)));
}

#[tokio::test]
async fn test_cancel_of_foreign_order_is_not_found() {
    let h = harness();
    let owner = h.user(1_000).await;
    let other = h.user(1_000).await;
    h.price("AAPL", 120);

    let view = h.service
        .place_buy_order(owner, "AAPL".into(), qty(1), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();

    assert!(matches!(h.service.cancel_order(other, view.id).await, Err(Error::OrderNotFound(_))));
    assert_eq!(h.service.get_pending_orders(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_execution_after_cancel_is_a_conflict() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 120);

    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();
    h.service.cancel_order(user, view.id).await.unwrap();

    let err = h.service.engine()
        .execute(view.id, Price::from_units(90), ExecutionSource::Scheduled)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConcurrencyConflict {
        expected: OrderStatus::Pending,
        actual: OrderStatus::Cancelled,
        ..
    }));
    assert_eq!(h.available(user).await, Balance::from_units(1_000));
    assert_eq!(h.shares(user, "AAPL").await, None);
}

#[tokio::test]
async fn test_market_buy_without_funds_is_rejected() {
    let h = harness();
    let user = h.user(100).await;
    h.price("AAPL", 60);

    let err = h.service
        .place_buy_order(user, "AAPL".into(), qty(2), OrderType::Market, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));

    let history = h.service.get_order_history(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, OrderStatus::Rejected);
    assert!(history[0].rejection_reason.is_some());
    assert_eq!(h.available(user).await, Balance::from_units(100));
}

#[tokio::test]
async fn test_limit_buy_beyond_cash_creates_nothing() {
    let h = harness();
    let user = h.user(100).await;
    h.price("AAPL", 120);

    let err = h.service
        .place_buy_order(user, "AAPL".into(), qty(2), OrderType::Limit, Some(Price::from_units(60)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert!(h.service.get_pending_orders(user).await.unwrap().is_empty());
    assert!(h.service.get_order_history(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pending_limit_buys_cannot_overcommit() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 120);

    h.service
        .place_buy_order(user, "AAPL".into(), qty(6), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();
    let err = h.service
        .place_buy_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert_eq!(h.reserved(user).await, Balance::from_units(600));
}

#[tokio::test]
async fn test_market_order_without_quote_is_rejected() {
    let h = harness();
    let user = h.user(1_000).await;

    let err = h.service
        .place_buy_order(user, "TSLA".into(), qty(1), OrderType::Market, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PriceUnavailable(_)));
    let history = h.service.get_order_history(user).await.unwrap();
    assert_eq!(history[0].status, OrderStatus::Rejected);
    assert_eq!(h.available(user).await, Balance::from_units(1_000));
}

#[tokio::test]
async fn test_limit_sell_reserves_shares_until_filled() {
    let h = harness();
    let user = h.user(10_000).await;
    h.price("AAPL", 150);
    h.service.place_buy_order(user, "AAPL".into(), qty(10), OrderType::Market, None).await.unwrap();

    let view = h.service
        .place_sell_order(user, "AAPL".into(), qty(10), OrderType::Limit, Some(Price::from_units(200)))
        .await
        .unwrap();
    assert_eq!(view.status, OrderStatus::Pending);
    assert_eq!(h.shares(user, "AAPL").await.map(|s| s.1), Some(qty(10)));

    let err = h.service
        .place_sell_order(user, "AAPL".into(), qty(1), OrderType::Market, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientShares { available, .. } if available == qty(0)));

    h.price("AAPL", 210);
    let report = h.service.scheduler(&SchedulerConfig::default()).run_once().await;
    assert_eq!(report.filled, 1);
    assert_eq!(h.shares(user, "AAPL").await, None);
    assert_eq!(h.available(user).await, Balance::from_units(10_000 - 1_500 + 2_100));
}

#[tokio::test]
async fn test_cancelled_limit_sell_frees_shares() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 100);
    h.service.place_buy_order(user, "AAPL".into(), qty(4), OrderType::Market, None).await.unwrap();

    let view = h.service
        .place_sell_order(user, "AAPL".into(), qty(3), OrderType::Limit, Some(Price::from_units(150)))
        .await
        .unwrap();
    h.service.cancel_order(user, view.id).await.unwrap();

    assert_eq!(h.shares(user, "AAPL").await, Some((qty(4), qty(0), Price::from_units(100))));
}

#[tokio::test]
async fn test_scheduler_failure_leaves_order_pending() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 120);
    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();

    let scheduler = h.service.scheduler(&SchedulerConfig::default());
    h.oracle.set_price(&Ticker::from("AAPL"), Price::zero());
    let report = scheduler.run_once().await;
    assert_eq!(report.failed, 1);
    assert_eq!(h.service.get_order(user, view.id).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(h.reserved(user).await, Balance::from_units(500));

    h.price("AAPL", 100);
    let report = scheduler.run_once().await;
    assert_eq!(report.filled, 1);
    assert_eq!(h.reserved(user).await, Balance::zero());
    assert_eq!(h.available(user).await, Balance::from_units(500));
}

#[tokio::test]
async fn test_scheduler_skips_tickers_without_quote() {
    let h = harness();
    let user = h.user(1_000).await;
    let view = h.service
        .place_buy_order(user, "TSLA".into(), qty(1), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();
    assert_eq!(view.status, OrderStatus::Pending);

    let report = h.service.scheduler(&SchedulerConfig::default()).run_once().await;
    assert_eq!(report.no_price, 1);
    assert_eq!(report.filled, 0);
}

#[tokio::test]
async fn test_oracle_outage_through_mock() {
    let mut oracle = MockPriceOracle::new();
    oracle.expect_instrument().returning(|ticker| {
        Some(Instrument { ticker: ticker.clone(), name: "Mocked".to_string() })
    });
    oracle.expect_current_price().returning(|_| None);
    oracle.expect_current_prices().returning(|_| Default::default());

    let service = TradingService::new(
        in_memory_stores(),
        Arc::new(oracle),
        Arc::new(ManualClock::new(0)),
        TradingConfig::default(),
    );
    let user = UserId::new();
    service.open_account(user, Some(Balance::from_units(1_000))).await.unwrap();

    let err = service.place_buy_order(user, "ACME".into(), qty(1), OrderType::Market, None).await.unwrap_err();
    assert!(matches!(err, Error::PriceUnavailable(_)));

    let view = service
        .place_buy_order(user, "ACME".into(), qty(1), OrderType::Limit, Some(Price::from_units(10)))
        .await
        .unwrap();
    assert_eq!(view.status, OrderStatus::Pending);

    let report = service.scheduler(&SchedulerConfig::default()).run_once().await;
    assert_eq!(report.no_price, 1);
    assert_eq!(service.get_pending_orders(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_placement_validation_and_lookups() {
    let h = harness();
    let user = h.user(1_000).await;

    assert!(matches!(
        h.service.place_buy_order(user, "AAPL".into(), qty(1), OrderType::Limit, None).await,
        Err(Error::LimitOrderRequiresPrice)
    ));
    assert!(matches!(
        h.service.place_buy_order(user, "AAPL".into(), qty(0), OrderType::Market, None).await,
        Err(Error::InvalidQuantity(0))
    ));
    assert!(matches!(
        h.service.place_buy_order(user, "NOPE".into(), qty(1), OrderType::Market, None).await,
        Err(Error::TickerNotFound(_))
    ));
    assert!(matches!(
        h.service.place_buy_order(UserId::new(), "AAPL".into(), qty(1), OrderType::Market, None).await,
        Err(Error::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_portfolio_summary_values_holdings() {
    let h = harness();
    let user = h.user(10_000).await;
    h.price("AAPL", 100);
    h.price("TSLA", 200);
    h.service.place_buy_order(user, "AAPL".into(), qty(10), OrderType::Market, None).await.unwrap();
    h.service.place_buy_order(user, "TSLA".into(), qty(5), OrderType::Market, None).await.unwrap();
    h.service
        .place_buy_order(user, "AAPL".into(), qty(10), OrderType::Limit, Some(Price::from_units(50)))
        .await
        .unwrap();

    h.price("AAPL", 110);
    h.oracle.clear_prices(&Ticker::from("TSLA"));

    let summary = h.service.get_portfolio_summary(user).await.unwrap();
    assert_eq!(summary.cash_balance, Balance::from_units(7_500));
    assert_eq!(summary.reserved_balance, Balance::from_units(500));
    assert_eq!(summary.stock_value, Balance::from_units(1_100));
    assert_eq!(summary.total_value, Balance::from_units(9_100));
    assert_eq!(summary.total_gain_loss, Balance::from_units(-900));

    let aapl = &summary.holdings[0];
    assert_eq!(aapl.name, "Apple Inc.");
    assert_eq!(aapl.unrealized_pnl, Some(Balance::from_units(100)));
    assert_eq!(aapl.unrealized_pnl_pct, Some(10.0));

    let tsla = &summary.holdings[1];
    assert_eq!(tsla.total_invested, Balance::from_units(1_000));
    assert_eq!(tsla.market_value, None);
    assert_eq!(tsla.unrealized_pnl, None);
}

#[tokio::test]
async fn test_account_management() {
    let h = harness();
    let user = UserId::new();
    let account = h.service.open_account(user, None).await.unwrap();
    assert_eq!(account.available_balance, Balance::from_units(10_000_000));

    h.service.deposit(user, Balance::from_units(500)).await.unwrap();
    let err = h.service.withdraw(user, Balance::from_units(20_000_000)).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
    let account = h.service.withdraw(user, Balance::from_units(1_500)).await.unwrap();
    assert_eq!(account.available_balance, Balance::from_units(9_999_000));

    assert_eq!(h.service.ledger_entries(user).await.unwrap().len(), 3);
    assert!(matches!(
        h.service.open_account(user, None).await,
        Err(Error::AccountAlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let h = harness();
    let user = h.user(10_000).await;
    h.price("AAPL", 10);

    let first = h.service.place_buy_order(user, "AAPL".into(), qty(1), OrderType::Market, None).await.unwrap();
    let second = h.service.place_buy_order(user, "AAPL".into(), qty(2), OrderType::Market, None).await.unwrap();

    let ids: Vec<_> = h.service.get_order_history(user).await.unwrap().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_order_locks_are_dropped_once_idle() {
    let h = harness();
    let user = h.user(1_000_000).await;
    h.price("AAPL", 10);

    for _ in 0..20 {
        h.service.place_buy_order(user, "AAPL".into(), qty(1), OrderType::Market, None).await.unwrap();
    }
    let cancelled = h.service
        .place_buy_order(user, "AAPL".into(), qty(1), OrderType::Limit, Some(Price::from_units(5)))
        .await
        .unwrap();
    h.service.cancel_order(user, cancelled.id).await.unwrap();
    assert!(h.service.cancel_order(user, cancelled.id).await.is_err());

    let waiting = h.service
        .place_buy_order(user, "AAPL".into(), qty(2), OrderType::Limit, Some(Price::from_units(8)))
        .await
        .unwrap();
    h.price("AAPL", 7);
    let report = h.service.scheduler(&SchedulerConfig::default()).run_once().await;
    assert_eq!(report.filled, 1);
    assert_eq!(h.service.get_order(user, waiting.id).await.unwrap().status, OrderStatus::Filled);

    assert!(h.service
        .place_buy_order(user, "TSLA".into(), qty(1), OrderType::Market, None)
        .await
        .is_err());

    assert_eq!(h.service.orders().tracked_locks(), 0);
}

#[tokio::test]
async fn test_deposits_and_withdrawals_are_not_gains() {
    let h = harness();
    let user = h.user(1_000).await;

    h.service.deposit(user, Balance::from_units(500)).await.unwrap();
    let summary = h.service.get_portfolio_summary(user).await.unwrap();
    assert_eq!(summary.total_value, Balance::from_units(1_500));
    assert_eq!(summary.net_deposits, Balance::from_units(500));
    assert_eq!(summary.total_gain_loss, Balance::zero());
    assert_eq!(summary.total_gain_loss_pct, 0.0);

    h.price("AAPL", 100);
    h.service.place_buy_order(user, "AAPL".into(), qty(2), OrderType::Market, None).await.unwrap();
    h.price("AAPL", 130);
    h.service.withdraw(user, Balance::from_units(300)).await.unwrap();

    let summary = h.service.get_portfolio_summary(user).await.unwrap();
    assert_eq!(summary.total_value, Balance::from_units(1_260));
    assert_eq!(summary.net_deposits, Balance::from_units(200));
    assert_eq!(summary.total_gain_loss, Balance::from_units(60));
    assert!((summary.total_gain_loss_pct - 5.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_loop_fills_and_stops() {
    let h = harness();
    let user = h.user(1_000).await;
    h.price("AAPL", 120);
    let view = h.service
        .place_buy_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(100)))
        .await
        .unwrap();

    let scheduler = Arc::new(h.service.scheduler(&SchedulerConfig { interval_ms: 1_000 }));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut supervisor = TaskSupervisor::new();
    scheduler.spawn(&mut supervisor, shutdown_rx);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(h.service.get_order(user, view.id).await.unwrap().status, OrderStatus::Pending);
    assert!(scheduler.ticks() >= 2);

    h.price("AAPL", 99);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(h.service.get_order(user, view.id).await.unwrap().status, OrderStatus::Filled);
    assert!(supervisor.check_health().is_ok());

    shutdown_tx.send(true).unwrap();
    supervisor.wait_for_task(SCHEDULER_TASK).await.unwrap();
    assert_eq!(supervisor.active_task_count(), 0);
}

#[tokio::test]
async fn test_reservations_match_pending_orders() {
    use crate::interfaces::OrderStore;
    use crate::invariants::InvariantChecks;
    use crate::storage::{InMemoryAccountStore, InMemoryHoldingStore, InMemoryOrderStore};

    let accounts = Arc::new(InMemoryAccountStore::new());
    let holdings = Arc::new(InMemoryHoldingStore::new());
    let orders = Arc::new(InMemoryOrderStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let oracle = Arc::new(InMemoryPriceOracle::with_clock(clock.clone()));
    oracle.register(Ticker::from("AAPL"), "Apple Inc.");
    oracle.set_price(&Ticker::from("AAPL"), Price::from_units(100));

    let service = TradingService::new(
        Stores::new(accounts.clone(), holdings.clone(), orders.clone()),
        oracle.clone(),
        clock,
        TradingConfig::default(),
    );
    let user = UserId::new();
    service.open_account(user, Some(Balance::from_units(5_000))).await.unwrap();

    service.place_buy_order(user, "AAPL".into(), qty(20), OrderType::Market, None).await.unwrap();
    let keep = service
        .place_buy_order(user, "AAPL".into(), qty(3), OrderType::Limit, Some(Price::from_units(90)))
        .await
        .unwrap();
    let drop_me = service
        .place_buy_order(user, "AAPL".into(), qty(4), OrderType::Limit, Some(Price::from_units(80)))
        .await
        .unwrap();
    service
        .place_sell_order(user, "AAPL".into(), qty(6), OrderType::Limit, Some(Price::from_units(130)))
        .await
        .unwrap();
    service
        .place_sell_order(user, "AAPL".into(), qty(5), OrderType::Limit, Some(Price::from_units(140)))
        .await
        .unwrap();
    service.cancel_order(user, drop_me.id).await.unwrap();
    oracle.set_price(&Ticker::from("AAPL"), Price::from_units(135));
    service.scheduler(&SchedulerConfig::default()).run_once().await;

    for account in accounts.all() {
        InvariantChecks::check_account(&account).unwrap();
    }
    for holding in holdings.all() {
        InvariantChecks::check_holding(&holding).unwrap();
    }

    let all_orders = orders.list_by_user(user).await.unwrap();
    assert_eq!(orders.len(), all_orders.len());
    for order in &all_orders {
        InvariantChecks::check_order(order).unwrap();
    }

    let reserved_cash: Balance = all_orders.iter().filter(|o| o.is_pending()).map(|o| o.reserved_amount).sum();
    let reserved_shares: Quantity = all_orders.iter().filter(|o| o.is_pending()).map(|o| o.reserved_shares).sum();
    let account = service.accounts().load(user).await.unwrap();
    let holding = holdings.all().pop().unwrap();

    assert_eq!(account.reserved_balance, reserved_cash);
    assert_eq!(account.reserved_balance, Balance::from_units(270));
    assert_eq!(holding.reserved_quantity, reserved_shares);
    assert_eq!(holding.quantity, qty(14));
    assert_eq!(holding.reserved_quantity, qty(5));
    assert_eq!(service.get_order(user, keep.id).await.unwrap().status, OrderStatus::Pending);
}
