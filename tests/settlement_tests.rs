//! Settlement integration tests: payouts, fees, referral rewards and the
//! at-most-once guarantee.

mod harness;

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use harness::temp_db::TempDb;
use pitboss::application::DeadlinePass;
use pitboss::domain::{DomainError, RoomStatus, Side, TransactionKind, UserId};
use pitboss::port::outbound::{Event, SettleOutcome};
use pitboss::testkit::app::{fast_settings, memory_pool, TestApp};
use pitboss::testkit::domain::{after_settle, fixed_price_room, NewRoomExt};

#[tokio::test]
async fn deadline_settlement_pays_winners_host_and_referrer() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();

    let carol = t.funded_user("carol", Decimal::ZERO).await.unwrap();
    let host = t.funded_user("host", Decimal::ZERO).await.unwrap();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t
        .app
        .wallet
        .get_or_create_user("bob", None, Some(&carol.referral_code))
        .await
        .unwrap();
    t.app.wallet.deposit(&bob.id, dec!(10), None).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now).creator(&host.id), now)
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(1))
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&bob.id, &room.id, Side::No, dec!(1))
        .await
        .unwrap();

    t.oracle.set("SOL", dec!(150));
    let pass = t.app.deadline.run_pass(after_settle(now)).await;
    assert_eq!(
        pass,
        DeadlinePass {
            locked: 1,
            settled: 1,
            pending: 0
        }
    );

    let settled = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(settled.status, RoomStatus::Settled);
    assert_eq!(settled.winning_side, Some(Side::No));
    assert_eq!(settled.settle_price, Some(dec!(150)));
    assert_eq!(settled.protocol_fee, dec!(0.04));
    assert_eq!(settled.host_fee, dec!(0.02));

    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(9));
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), dec!(10.94));
    assert_eq!(t.app.wallet.balance(&host.id).await.unwrap(), dec!(0.02));
    assert_eq!(t.app.wallet.balance(&carol.id).await.unwrap(), dec!(0.00194));

    let bets = t.app.room_store.bets(&room.id).await.unwrap();
    let distributed: Decimal = bets.iter().map(|b| b.payout).sum();
    assert_eq!(
        distributed + settled.protocol_fee + settled.host_fee,
        settled.pools.total
    );
    assert!(bets.iter().all(|b| b.settled));

    let history = t.app.wallet.history(&bob.id, 0, 10).await.unwrap();
    let win = history
        .items
        .iter()
        .find(|e| e.kind == TransactionKind::Win)
        .expect("win entry");
    assert_eq!(win.amount, dec!(1.94));
    assert_eq!(win.room_id.as_ref(), Some(&room.id));

    let events = t.notifier.events();
    let settled_event = events
        .iter()
        .find_map(|e| match e {
            Event::RoomSettled(event) => Some(event),
            _ => None,
        })
        .expect("settlement event");
    assert_eq!(settled_event.winning_side, Side::No);
    assert_eq!(settled_event.winners(), 1);
    assert_eq!(
        t.notifier
            .count(|e| matches!(e, Event::RoomLocked { lock_price: Some(p), .. } if *p == dec!(150))),
        1
    );
}

#[tokio::test]
async fn pool_is_forfeited_when_nobody_backed_the_winner() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let host = t.funded_user("host", Decimal::ZERO).await.unwrap();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now).creator(&host.id), now)
        .await
        .unwrap();
    for (user, amount) in [(&alice, dec!(1)), (&bob, dec!(2))] {
        t.app
            .rooms
            .place_bet(&user.id, &room.id, Side::Yes, amount)
            .await
            .unwrap();
    }

    let outcome = t.app.rooms.force_settle(&room.id, Side::No).await.unwrap();
    let SettleOutcome::Settled(receipt) = outcome else {
        panic!("expected the first settlement to apply");
    };
    assert!(receipt.winnings.is_empty());
    assert!(receipt.host_fee.is_none());
    assert!(receipt.referral_rewards.is_empty());

    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(9));
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), dec!(8));
    assert_eq!(t.app.wallet.balance(&host.id).await.unwrap(), Decimal::ZERO);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Settled);
    assert_eq!(room.winning_side, Some(Side::No));
}

#[tokio::test]
async fn second_settlement_is_a_no_op() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(4))
        .await
        .unwrap();

    let first = t.app.rooms.force_settle(&room.id, Side::Yes).await.unwrap();
    assert!(matches!(first, SettleOutcome::Settled(_)));
    let second = t.app.rooms.admin_resolve(&room.id, Side::No).await.unwrap();
    assert_eq!(second, SettleOutcome::AlreadySettled);

    // 4 * 0.97
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(9.88));
    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.winning_side, Some(Side::Yes));
    assert_eq!(
        t.notifier.count(|e| matches!(e, Event::RoomSettled(_))),
        1
    );
}

#[tokio::test]
async fn resolving_an_open_room_requires_a_lock() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();

    let err = t
        .app
        .rooms
        .admin_resolve(&room.id, Side::Yes)
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::RoomNotLocked));

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Open);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_settlements_apply_at_most_once() {
    let db = TempDb::create();
    let t = db.app();
    let now = Utc::now();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(3))
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&bob.id, &room.id, Side::No, dec!(1))
        .await
        .unwrap();
    assert!(t.app.settler.lock(&room, None).await.unwrap());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let app = Arc::clone(&t.app);
        let room_id = room.id.clone();
        tasks.push(tokio::spawn(async move {
            app.rooms.admin_resolve(&room_id, Side::Yes).await
        }));
    }

    let mut applied = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            SettleOutcome::Settled(_) => applied += 1,
            SettleOutcome::AlreadySettled => {}
        }
    }
    assert_eq!(applied, 1);

    // Pool 4, payout pool 3.88, all of it to the only YES bet.
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(10.88));
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), dec!(9));
    let wins = t
        .app
        .wallet
        .history(&alice.id, 0, 50)
        .await
        .unwrap()
        .items
        .into_iter()
        .filter(|e| e.kind == TransactionKind::Win)
        .count();
    assert_eq!(wins, 1);
}

async fn win_rows(t: &TestApp, user_id: &UserId) -> usize {
    t.app
        .wallet
        .history(user_id, 0, 50)
        .await
        .unwrap()
        .items
        .into_iter()
        .filter(|e| e.kind == TransactionKind::Win)
        .count()
}

fn settled_events(t: &TestApp) -> usize {
    t.notifier
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::RoomSettled(_)))
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_concurrent_resolutions_settle_one_side() {
    let db = TempDb::create();
    let t = db.app();
    let now = Utc::now();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(3))
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&bob.id, &room.id, Side::No, dec!(1))
        .await
        .unwrap();
    assert!(t.app.settler.lock(&room, None).await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let app = Arc::clone(&t.app);
        let room_id = room.id.clone();
        let side = if i % 2 == 0 { Side::Yes } else { Side::No };
        tasks.push(tokio::spawn(async move {
            app.rooms.admin_resolve(&room_id, side).await
        }));
    }

    let mut applied = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            SettleOutcome::Settled(_) => applied += 1,
            SettleOutcome::AlreadySettled => {}
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(settled_events(&t), 1);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Settled);
    // Pool 4, payout pool 3.88, all of it to the winning side's only bet.
    let (alice_balance, bob_balance, alice_wins, bob_wins) = match room.winning_side {
        Some(Side::Yes) => (dec!(10.88), dec!(9), 1, 0),
        Some(Side::No) => (dec!(7), dec!(12.88), 0, 1),
        None => panic!("settled room without a winning side"),
    };
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), alice_balance);
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), bob_balance);
    assert_eq!(win_rows(&t, &alice.id).await, alice_wins);
    assert_eq!(win_rows(&t, &bob.id).await, bob_wins);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_and_instant_passes_race_to_one_settlement() {
    let db = TempDb::create();
    let t = db.app();
    let now = Utc::now();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(1))
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&bob.id, &room.id, Side::No, dec!(1))
        .await
        .unwrap();

    // Due for the deadline sweep and above target for the instant sweep.
    t.oracle.set("SOL", dec!(250));
    let (deadline, instant) = tokio::join!(
        t.app.deadline.run_pass(after_settle(now)),
        t.app.instant.run_pass()
    );
    assert_eq!(deadline.settled + instant, 1, "{deadline:?} / {instant}");
    assert_eq!(settled_events(&t), 1);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Settled);
    assert_eq!(room.winning_side, Some(Side::Yes));
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(10.94));
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), dec!(9));
    assert_eq!(win_rows(&t, &alice.id).await, 1);
    assert_eq!(win_rows(&t, &bob.id).await, 0);

    // Both sweeps find nothing left to do.
    assert_eq!(t.app.instant.run_pass().await, 0);
    assert_eq!(
        t.app.deadline.run_pass(after_settle(now)).await,
        DeadlinePass::default()
    );
}

#[tokio::test]
async fn inconsistent_pools_leave_the_room_locked_and_alert() {
    let pool = memory_pool().unwrap();
    let t = TestApp::with_pool(pool.clone(), &fast_settings());
    let now = Utc::now();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    t.app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(2))
        .await
        .unwrap();

    {
        let mut conn = pool.get().unwrap();
        // Pools stay internally consistent but no longer match the bets.
        diesel::sql_query(
            "UPDATE rooms SET yes_pool = yes_pool + 1000000000, \
             total_pool = total_pool + 1000000000 WHERE id = ?",
        )
        .bind::<diesel::sql_types::Text, _>(room.id.as_str())
        .execute(&mut conn)
        .unwrap();
    }

    let err = t
        .app
        .rooms
        .force_settle(&room.id, Side::Yes)
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::PoolMismatch { .. })
    ));

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Locked);
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(8));
    assert_eq!(
        t.notifier
            .count(|e| matches!(e, Event::InvariantViolation { .. })),
        1
    );
}
