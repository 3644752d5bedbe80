//! Room lifecycle integration tests: creation, admission, queues and the
//! chat pool.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use pitboss::domain::{
    AccessPolicy, BetStatus, ChatSlotStatus, DomainError, RoomStatus, Side, UserId,
};
use pitboss::error::Error;
use pitboss::port::outbound::Event;
use pitboss::testkit::app::TestApp;
use pitboss::testkit::domain::{custom_room, fixed_price_room, NewRoomExt};
use pitboss::testkit::fakes::ChannelCall;

fn domain(err: &Error) -> &DomainError {
    err.as_domain()
        .unwrap_or_else(|| panic!("expected a domain error, got {err}"))
}

#[tokio::test]
async fn invalid_rooms_are_rejected_before_insert() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();

    let mut past = fixed_price_room("SOL", dec!(200), now);
    past.settle_at = now - Duration::minutes(1);
    let mut inverted = fixed_price_room("SOL", dec!(200), now);
    inverted.lock_at = inverted.settle_at + Duration::minutes(1);
    let drafts = [
        past,
        inverted,
        fixed_price_room("SOL", Decimal::ZERO, now),
        fixed_price_room("SOL", dec!(200), now).capacity(1),
        fixed_price_room("SOL", dec!(200), now).limits(dec!(5), Some(dec!(2))),
        fixed_price_room("SOL", dec!(200), now).limits(Decimal::ZERO, None),
    ];
    for draft in drafts {
        let err = t.app.rooms.create_room(draft, now).await.unwrap_err();
        assert!(
            matches!(domain(&err), DomainError::InvalidRoom(_)),
            "unexpected error {err}"
        );
    }

    let unknown_creator = custom_room(now).creator(&UserId::from("nobody"));
    let err = t
        .app
        .rooms
        .create_room(unknown_creator, now)
        .await
        .unwrap_err();
    assert_eq!(domain(&err), &DomainError::UserNotFound);

    let page = t.app.rooms.list_rooms(None, 0, 10).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn admission_rules_are_checked_without_side_effects() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();
    let carol = t.funded_user("carol", dec!(10)).await.unwrap();
    let poor = t.funded_user("poor", dec!(0.5)).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(
            fixed_price_room("SOL", dec!(200), now)
                .capacity(3)
                .limits(dec!(0.5), Some(dec!(5))),
            now,
        )
        .await
        .unwrap();

    let place = |user: &UserId, amount: Decimal| {
        let app = t.app.clone();
        let user = user.clone();
        let room_id = room.id.clone();
        async move { app.rooms.place_bet(&user, &room_id, Side::Yes, amount).await }
    };

    let err = place(&alice.id, dec!(0.1)).await.unwrap_err();
    assert_eq!(domain(&err), &DomainError::BetTooSmall { min: dec!(0.5) });
    let err = place(&alice.id, dec!(6)).await.unwrap_err();
    assert_eq!(domain(&err), &DomainError::BetTooLarge { max: dec!(5) });
    let err = place(&alice.id, dec!(-1)).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::InvalidAmount { .. }));
    let err = place(&poor.id, dec!(1)).await.unwrap_err();
    assert_eq!(domain(&err), &DomainError::InsufficientBalance);

    let bet = place(&alice.id, dec!(2)).await.unwrap();
    assert_eq!(bet.status, BetStatus::Active);
    let err = place(&alice.id, dec!(1)).await.unwrap_err();
    assert_eq!(domain(&err), &DomainError::DuplicateBet);

    place(&bob.id, dec!(1)).await.unwrap();
    place(&poor.id, dec!(0.5)).await.unwrap();
    let err = place(&carol.id, dec!(1)).await.unwrap_err();
    assert_eq!(domain(&err), &DomainError::RoomFull);

    let room = t.app.room_store.room(&room.id).await.unwrap().unwrap();
    assert_eq!(room.current_players, 3);
    assert_eq!(room.pools.total, dec!(3.5));
    assert_eq!(room.pools.yes, dec!(3.5));
    assert_eq!(room.pools.no, Decimal::ZERO);

    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(8));
    assert_eq!(t.app.wallet.balance(&carol.id).await.unwrap(), dec!(10));
    assert_eq!(t.app.wallet.balance(&poor.id).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn queued_room_activates_bets_on_launch() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let chats = t.provision_chats(1).await.unwrap();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let bob = t.funded_user("bob", dec!(10)).await.unwrap();

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now).queued(), now)
        .await
        .unwrap();
    assert_eq!(room.status, RoomStatus::Queuing);
    assert!(room.chat.is_none());

    let err = t
        .app
        .rooms
        .place_bet(&alice.id, &room.id, Side::Yes, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(domain(&err), &DomainError::RoomNotOpen);

    let queued = t
        .app
        .rooms
        .join_queue(&alice.id, &room.id, Side::Yes, dec!(2))
        .await
        .unwrap();
    assert_eq!(queued.status, BetStatus::Queued);
    // The stake is debited when the seat is reserved.
    assert_eq!(t.app.wallet.balance(&alice.id).await.unwrap(), dec!(8));

    let launched = t.app.rooms.launch_room(&room.id).await.unwrap();
    assert_eq!(launched.status, RoomStatus::Open);
    assert_eq!(launched.chat.as_ref(), Some(&chats[0]));
    assert_eq!(
        launched.invite_link.as_deref(),
        Some("https://t.me/+invite-chat-0")
    );

    let details = t.app.rooms.room_details(&room.id).await.unwrap();
    assert!(details.bets.iter().all(|b| b.status == BetStatus::Active));

    let err = t.app.rooms.launch_room(&room.id).await.unwrap_err();
    assert!(matches!(
        domain(&err),
        DomainError::InvalidTransition { .. } | DomainError::RoomNotQueuing
    ));
    let err = t
        .app
        .rooms
        .join_queue(&bob.id, &room.id, Side::No, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(domain(&err), &DomainError::RoomNotQueuing);
    t.app
        .rooms
        .place_bet(&bob.id, &room.id, Side::No, dec!(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn chats_are_assigned_exhausted_and_reclaimed() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let chats = t.provision_chats(1).await.unwrap();
    let chat = &chats[0];

    let first = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    assert_eq!(first.chat.as_ref(), Some(chat));
    assert!(t.channel.calls().iter().any(|call| matches!(
        call,
        ChannelCall::Rename { title, .. } if title.starts_with(&format!("ROOM #{}", first.short_id()))
    )));
    assert!(t
        .channel
        .calls()
        .contains(&ChannelCall::CreateInvite {
            chat: chat.clone(),
            member_limit: 10
        }));

    // A second room opens without a chat and the operator is told.
    let second = t
        .app
        .rooms
        .create_room(fixed_price_room("ETH", dec!(4000), now), now)
        .await
        .unwrap();
    assert_eq!(second.status, RoomStatus::Open);
    assert!(second.chat.is_none());
    assert_eq!(
        t.notifier
            .count(|e| matches!(e, Event::ChatPoolExhausted { .. })),
        1
    );

    let slots = t.app.chats.slots().await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].status, ChatSlotStatus::Assigned);
    assert_eq!(slots[0].room_id.as_ref(), Some(&first.id));

    t.app.rooms.force_settle(&first.id, Side::Yes).await.unwrap();

    let slots = t.app.chats.slots().await.unwrap();
    assert_eq!(slots[0].status, ChatSlotStatus::Free);
    assert!(slots[0].room_id.is_none());
    assert_eq!(
        t.channel.policies(chat),
        vec![
            AccessPolicy::ReadOnly,
            AccessPolicy::Open,
            AccessPolicy::ReadOnly
        ]
    );
    assert!(t
        .channel
        .calls()
        .contains(&ChannelCall::RevokeInvite {
            chat: chat.clone(),
            invite_link: "https://t.me/+invite-chat-0".to_string()
        }));

    let settled = t.app.room_store.room(&first.id).await.unwrap().unwrap();
    assert!(settled.chat.is_none());
    assert!(t.app.room_store.room_by_chat(chat).await.unwrap().is_none());

    // The freed chat serves the next room.
    let third = t
        .app
        .rooms
        .create_room(custom_room(now), now)
        .await
        .unwrap();
    assert_eq!(third.chat.as_ref(), Some(chat));
}

#[tokio::test]
async fn platform_failures_do_not_block_assignment() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let chats = t.provision_chats(1).await.unwrap();
    t.channel.set_failing(true);

    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    assert_eq!(room.chat.as_ref(), Some(&chats[0]));
    assert!(room.invite_link.is_none());
    assert_eq!(
        t.app
            .room_store
            .room_by_chat(&chats[0])
            .await
            .unwrap()
            .map(|r| r.id),
        Some(room.id)
    );
}

#[tokio::test]
async fn provisioning_the_same_chat_twice_keeps_one_slot() {
    let t = TestApp::new().unwrap();
    t.provision_chats(2).await.unwrap();
    t.provision_chats(2).await.unwrap();
    assert_eq!(t.app.chats.slots().await.unwrap().len(), 2);
}

#[tokio::test]
async fn rooms_list_newest_first_with_paging() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let mut ids = Vec::new();
    for i in 0..5 {
        let created = now + Duration::milliseconds(i * 10);
        let room = t
            .app
            .rooms
            .create_room(custom_room(now), created)
            .await
            .unwrap();
        ids.push(room.id);
    }
    t.app
        .rooms
        .create_room(custom_room(now).queued(), now + Duration::seconds(1))
        .await
        .unwrap();

    let page = t
        .app
        .rooms
        .list_rooms(Some(RoomStatus::Open), 0, 2)
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages(), 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, ids[4]);
    assert_eq!(page.items[1].id, ids[3]);

    let last = t
        .app
        .rooms
        .list_rooms(Some(RoomStatus::Open), 2, 2)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].id, ids[0]);

    let all = t.app.rooms.list_rooms(None, 0, 50).await.unwrap();
    assert_eq!(all.total, 6);
}
