//! Deadline and instant-target loop integration tests.

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use pitboss::application::DeadlinePass;
use pitboss::domain::{AccessPolicy, Room, RoomId, RoomStatus, Side, User};
use pitboss::port::outbound::{Event, SettleOutcome, SettleTrigger};
use pitboss::testkit::app::TestApp;
use pitboss::testkit::domain::{
    after_lock, after_settle, custom_room, fixed_price_room, market_cap_room,
};

async fn two_players(t: &TestApp) -> (User, User) {
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();
    (alice, bob)
}

async fn stake_both_sides(t: &TestApp, room: &Room, alice: &User, bob: &User) {
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
}

async fn status(t: &TestApp, room_id: &RoomId) -> RoomStatus {
    t.app.room_store.room(room_id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn lock_deadline_closes_betting_and_opens_the_chat() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let chats = t.provision_chats(1).await.unwrap();
    let (alice, bob) = two_players(&t).await;
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    stake_both_sides(&t, &room, &alice, &bob).await;
    t.oracle.set("SOL", dec!(180));

    let pass = t.app.deadline.run_pass(after_lock(now)).await;
    assert_eq!(
        pass,
        DeadlinePass {
            locked: 1,
            settled: 0,
            pending: 0
        }
    );

    let locked = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(locked.status, RoomStatus::Locked);
    assert_eq!(locked.lock_price, Some(dec!(180)));
    assert_eq!(
        t.channel.policies(&chats[0]),
        vec![AccessPolicy::ReadOnly, AccessPolicy::Open]
    );

    let carol = t.funded_user("carol", dec!(10)).await.unwrap();
    let err = t
        .app
        .rooms
        .place_bet(&carol.id, &room.id, Side::Yes, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_domain(),
        Some(&pitboss::domain::DomainError::RoomNotOpen)
    );
}

#[tokio::test]
async fn target_reached_at_deadline_settles_yes() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let (alice, bob) = two_players(&t).await;
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    stake_both_sides(&t, &room, &alice, &bob).await;

    // Equal to the target counts as reached.
    t.oracle.set("SOL", dec!(200));
    let pass = t.app.deadline.run_pass(after_settle(now)).await;
    assert_eq!(pass.settled, 1);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.winning_side, Some(Side::Yes));
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(10.94));
}

#[tokio::test]
async fn custom_room_waits_for_an_operator_and_alerts_once() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let (alice, bob) = two_players(&t).await;
    let room = t
        .app
        .rooms
        .create_room(custom_room(now), now)
        .await
        .unwrap();
    stake_both_sides(&t, &room, &alice, &bob).await;

    let due = after_settle(now);
    let first = t.app.deadline.run_pass(due).await;
    assert_eq!(
        first,
        DeadlinePass {
            locked: 1,
            settled: 0,
            pending: 1
        }
    );
    let second = t.app.deadline.run_pass(due).await;
    assert_eq!(
        second,
        DeadlinePass {
            locked: 0,
            settled: 0,
            pending: 1
        }
    );

    assert_eq!(status(&t, &room.id).await, RoomStatus::Locked);
    assert_eq!(
        t.notifier
            .count(|e| matches!(e, Event::ManualResolutionRequired { .. })),
        1
    );
    assert_eq!(t.oracle.calls(), 0);

    let queue = t.app.rooms.manual_queue(due).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, room.id);

    let outcome = t.app.rooms.admin_resolve(&room.id, Side::No).await.unwrap();
    assert!(matches!(outcome, SettleOutcome::Settled(_)));
    assert!(t.app.rooms.manual_queue(due).await.unwrap().is_empty());
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), dec!(10.94));
}

#[tokio::test]
async fn oracle_outage_defers_settlement_to_a_later_pass() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let (alice, bob) = two_players(&t).await;
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    stake_both_sides(&t, &room, &alice, &bob).await;

    t.oracle.set_failing(true);
    let due = after_settle(now);
    let pass = t.app.deadline.run_pass(due).await;
    assert_eq!(pass.pending, 1);
    assert_eq!(status(&t, &room.id).await, RoomStatus::Locked);
    assert_eq!(
        t.notifier
            .count(|e| matches!(e, Event::ManualResolutionRequired { .. })),
        1
    );

    t.oracle.set_failing(false);
    t.oracle.set("SOL", dec!(150));
    let pass = t.app.deadline.run_pass(due).await;
    assert_eq!(pass.settled, 1);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Settled);
    assert_eq!(room.winning_side, Some(Side::No));
}

#[tokio::test]
async fn instant_target_settles_yes_at_the_observed_value() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let (alice, bob) = two_players(&t).await;
    let room = t
        .app
        .rooms
        .create_room(market_cap_room("So1Token", dec!(3000000), now), now)
        .await
        .unwrap();
    stake_both_sides(&t, &room, &alice, &bob).await;

    t.oracle.set("So1Token", dec!(3050000));
    assert_eq!(t.app.instant.run_pass().await, 1);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Settled);
    assert_eq!(room.winning_side, Some(Side::Yes));
    assert_eq!(room.lock_price, Some(dec!(3050000)));
    assert_eq!(room.settle_price, room.lock_price);
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(10.94));

    let trigger = t.notifier.events().into_iter().find_map(|e| match e {
        Event::RoomSettled(event) => Some(event.trigger),
        _ => None,
    });
    assert_eq!(trigger, Some(SettleTrigger::InstantTarget));

    // Nothing left to check on the next pass.
    assert_eq!(t.app.instant.run_pass().await, 0);
}

#[tokio::test]
async fn instant_loop_never_settles_below_target_or_custom_rooms() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let threshold = t
        .app
        .rooms
        .create_room(market_cap_room("So1Token", dec!(3000000), now), now)
        .await
        .unwrap();
    let custom = t
        .app
        .rooms
        .create_room(custom_room(now), now)
        .await
        .unwrap();

    t.oracle.set("So1Token", dec!(2999999.99));
    assert_eq!(t.app.instant.run_pass().await, 0);
    assert_eq!(status(&t, &threshold.id).await, RoomStatus::Open);
    assert_eq!(status(&t, &custom.id).await, RoomStatus::Open);
    // One observation for the threshold room; custom rooms are never polled.
    assert_eq!(t.oracle.calls(), 1);

    t.oracle.set_failing(true);
    assert_eq!(t.app.instant.run_pass().await, 0);
    assert_eq!(status(&t, &threshold.id).await, RoomStatus::Open);
}

#[tokio::test]
async fn scheduler_runs_passes_until_shutdown() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let room = t
        .app
        .rooms
        .create_room(market_cap_room("So1Token", dec!(3000000), now), now)
        .await
        .unwrap();
    t.oracle.set("So1Token", dec!(4000000));

    let handle = t.app.scheduler().start();
    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if status(&t, &room.id).await == RoomStatus::Settled {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    handle.shutdown().await;

    assert!(settled.is_ok(), "first instant pass should settle the room");
    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.winning_side, Some(Side::Yes));
    assert_eq!(room.pools.total, Decimal::ZERO);
}
