//! Bot command handling: the private betting flow and gated room chats.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;

use pitboss::adapter::inbound::telegram::{CommandHandler, IncomingMessage};
use pitboss::application::chat::{Gate, PLEASE_WAIT_MESSAGE, REFUSAL_MESSAGE};
use pitboss::domain::{ChatRef, Room, Side};
use pitboss::testkit::app::TestApp;
use pitboss::testkit::domain::{fixed_price_room, NewRoomExt};

fn handler(t: &TestApp) -> CommandHandler {
    CommandHandler::new(
        Arc::clone(&t.app.rooms),
        Arc::clone(&t.app.wallet),
        Arc::clone(&t.app.chats),
        Arc::clone(&t.app.resolver),
        Arc::clone(&t.app.sessions),
        t.app.settler.fees(),
    )
}

fn private(user_ref: &str, text: &str, now: DateTime<Utc>) -> IncomingMessage {
    IncomingMessage {
        chat: ChatRef::new(user_ref),
        private: true,
        user_ref: user_ref.to_string(),
        username: None,
        text: text.to_string(),
        now,
    }
}

fn in_room(chat: &ChatRef, user_ref: &str, text: &str, now: DateTime<Utc>) -> IncomingMessage {
    IncomingMessage {
        chat: chat.clone(),
        private: false,
        user_ref: user_ref.to_string(),
        username: None,
        text: text.to_string(),
        now,
    }
}

/// An open room with a chat, where `alice` holds a YES bet.
async fn room_with_player(t: &TestApp, now: DateTime<Utc>) -> (Room, ChatRef) {
    let chat = t.provision_chats(1).await.unwrap().remove(0);
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
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
    (room, chat)
}

#[tokio::test]
async fn private_join_then_bet_places_a_wager() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();
    t.provision_chats(1).await.unwrap();
    let bob = t.funded_user("bob", dec!(5)).await.unwrap();
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now).limits(dec!(1), Some(dec!(3))), now)
        .await
        .unwrap();

    let listing = handler.handle(&private("bob", "/rooms", now)).await.unwrap();
    assert!(listing.contains(room.short_id()), "{listing}");

    let early = handler
        .handle(&private("bob", "/bet 2 YES", now))
        .await
        .unwrap();
    assert_eq!(early, "Select a room first with /join <room>.");

    let selected = handler
        .handle(&private("bob", &format!("/join #{}", room.short_id()), now))
        .await
        .unwrap();
    assert!(selected.starts_with(&format!("Selected #{}", room.short_id())));
    assert!(selected.contains("max bet 3"), "{selected}");

    let placed = handler
        .handle(&private("bob", "/bet 2 no", now))
        .await
        .unwrap();
    assert!(placed.starts_with("✅ Bet placed: 2 on NO"), "{placed}");
    assert!(placed.contains("https://t.me/+invite-chat-0"));
    assert_eq!(t.app.wallet.balance(&bob.id).await.unwrap(), dec!(3));

    // The selection is consumed by the bet.
    let again = handler
        .handle(&private("bob", "/bet 1 NO", now))
        .await
        .unwrap();
    assert_eq!(again, "Select a room first with /join <room>.");

    let balance = handler
        .handle(&private("bob", "/balance", now))
        .await
        .unwrap();
    assert_eq!(balance, "💰 Balance: 3");
}

#[tokio::test]
async fn admission_errors_are_shown_to_the_player() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();

    handler
        .handle(&private("newcomer", &format!("/join {}", room.id), now))
        .await
        .unwrap();
    let reply = handler
        .handle(&private("newcomer", "/bet 1 YES", now))
        .await
        .unwrap();
    assert_eq!(reply, "❌ insufficient balance");
}

#[tokio::test]
async fn malformed_commands_get_help_only_in_private() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();

    let reply = handler
        .handle(&private("bob", "/bet 1 MAYBE", now))
        .await
        .unwrap();
    assert!(reply.starts_with("invalid side `MAYBE`"), "{reply}");
    assert!(reply.contains("/rooms"));

    assert!(handler
        .handle(&private("bob", "hello there", now))
        .await
        .is_none());
    assert!(handler
        .handle(&in_room(&ChatRef::new("-100"), "bob", "/bogus", now))
        .await
        .is_none());
    assert_eq!(
        handler
            .handle(&in_room(&ChatRef::new("-100"), "bob", "/rooms", now))
            .await
            .as_deref(),
        Some("Use this command in a private chat with the bot.")
    );
}

#[tokio::test]
async fn room_chat_commands_are_limited_to_participants() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();
    let (room, chat) = room_with_player(&t, now).await;

    let refused = handler
        .handle(&in_room(&chat, "mallory", "/watch", now))
        .await
        .unwrap();
    assert_eq!(refused, REFUSAL_MESSAGE);

    let watch = handler
        .handle(&in_room(&chat, "alice", "/watch", now))
        .await
        .unwrap();
    assert!(watch.contains(&room.title));
    assert!(watch.contains("Status: OPEN"));

    let players = handler
        .handle(&in_room(&chat, "alice", "/players", now))
        .await
        .unwrap();
    assert!(players.starts_with("👥 1/10 players"), "{players}");

    // Chats not linked to a room are ignored.
    assert!(handler
        .handle(&in_room(&ChatRef::new("-999"), "alice", "/watch", now))
        .await
        .is_none());
}

#[tokio::test]
async fn repeated_room_commands_are_throttled() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();
    let (_room, chat) = room_with_player(&t, now).await;

    assert!(handler
        .handle(&in_room(&chat, "alice", "/watch", now))
        .await
        .is_some());
    assert!(handler
        .handle(&in_room(&chat, "alice", "/watch", now + Duration::seconds(1)))
        .await
        .is_none());
    // Other commands have their own window.
    assert!(handler
        .handle(&in_room(&chat, "alice", "/stats", now + Duration::seconds(1)))
        .await
        .is_some());
    assert!(handler
        .handle(&in_room(&chat, "alice", "/watch", now + Duration::seconds(6)))
        .await
        .is_some());

    let duplicate = handler
        .handle(&in_room(&chat, "alice", "/bet 1 NO", now))
        .await
        .unwrap();
    assert_eq!(duplicate, "❌ you already have an active bet in this room");
    let wait = handler
        .handle(&in_room(&chat, "alice", "/bet 1 NO", now + Duration::seconds(1)))
        .await
        .unwrap();
    assert_eq!(wait, PLEASE_WAIT_MESSAGE);
}

#[tokio::test]
async fn oracle_command_reports_the_observed_value() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();
    let (_room, chat) = room_with_player(&t, now).await;

    t.oracle.set("SOL", dec!(210.5));
    let reply = handler
        .handle(&in_room(&chat, "alice", "/oracle", now))
        .await
        .unwrap();
    assert!(reply.contains("Current: 210.5"), "{reply}");
    assert!(reply.contains("Target reached"));

    t.oracle.set_failing(true);
    let reply = handler
        .handle(&in_room(&chat, "alice", "/oracle", now + Duration::seconds(10)))
        .await
        .unwrap();
    assert!(reply.starts_with("Oracle unavailable"), "{reply}");
}

#[tokio::test]
async fn queued_seats_do_not_pass_the_room_gate() {
    let t = TestApp::new().unwrap();
    let now = Utc::now();
    let chat = ChatRef::new("-100555");
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();
    let room = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now).queued(), now)
        .await
        .unwrap();
    t.app
        .rooms
        .join_queue(&alice.id, &room.id, Side::Yes, dec!(1))
        .await
        .unwrap();
    // Link the chat while the seat is still queued.
    t.app
        .room_store
        .set_room_chat(&room.id, Some(&chat), None)
        .await
        .unwrap();

    let gate = t.app.chats.authorize(&chat, "alice", "watch", now).await.unwrap();
    assert_eq!(gate, Gate::Refused);

    t.app.room_store.launch_room(&room.id).await.unwrap();
    let gate = t.app.chats.authorize(&chat, "alice", "watch", now).await.unwrap();
    assert!(matches!(gate, Gate::Allowed { .. }), "{gate:?}");
}

#[tokio::test]
async fn private_views_of_bets_wins_and_referrals() {
    let t = TestApp::new().unwrap();
    let handler = handler(&t);
    let now = Utc::now();
    t.provision_chats(2).await.unwrap();
    let carol = t.funded_user("carol", dec!(0)).await.unwrap();
    let bob = t
        .app
        .wallet
        .get_or_create_user("bob", None, Some(&carol.referral_code))
        .await
        .unwrap();
    t.app.wallet.deposit(&bob.id, dec!(10), None).await.unwrap();
    let alice = t.funded_user("alice", dec!(10)).await.unwrap();

    let empty = handler.handle(&private("bob", "/won", now)).await.unwrap();
    assert!(empty.starts_with("🏆 No wins yet"), "{empty}");

    let settled = t
        .app
        .rooms
        .create_room(fixed_price_room("SOL", dec!(200), now), now)
        .await
        .unwrap();
    let open = t
        .app
        .rooms
        .create_room(fixed_price_room("ETH", dec!(5000), now), now)
        .await
        .unwrap();
    for (room, user, side) in [
        (&settled, &bob, Side::Yes),
        (&settled, &alice, Side::No),
        (&open, &bob, Side::No),
    ] {
        t.app
            .rooms
            .place_bet(&user.id, &room.id, side, dec!(1))
            .await
            .unwrap();
    }
    t.app.rooms.force_settle(&settled.id, Side::Yes).await.unwrap();

    let mine = handler.handle(&private("bob", "/mybets", now)).await.unwrap();
    assert!(mine.contains("Open: 1\nTotal placed: 2"), "{mine}");
    assert!(mine.contains(&format!("1. {} 1 on NO", open.title)), "{mine}");

    let history = handler.handle(&private("bob", "/history", now)).await.unwrap();
    assert!(history.starts_with("📜 Bet history (page 1/1)"), "{history}");
    assert!(history.contains("paid 1.94 (+0.94)"), "{history}");
    let beyond = handler
        .handle(&private("bob", "/history 2", now))
        .await
        .unwrap();
    assert_eq!(beyond, "📜 Bet history ends at page 1.");

    let won = handler.handle(&private("bob", "/won", now)).await.unwrap();
    assert!(won.contains("Staked: 1 | Profit: +0.94"), "{won}");
    assert!(won.contains("Total winnings: 1.94"), "{won}");
    let lost = handler.handle(&private("alice", "/history", now)).await.unwrap();
    assert!(lost.contains(", lost"), "{lost}");

    let referrals = handler
        .handle(&private("carol", "/referrals", now))
        .await
        .unwrap();
    assert_eq!(
        referrals,
        format!(
            "🤝 Referral code: {}\nReferred: 1\nRewards: 0.00194",
            carol.referral_code
        )
    );

    let bad_page = handler.handle(&private("bob", "/won 0", now)).await.unwrap();
    assert!(bad_page.starts_with("invalid page `0`"), "{bad_page}");
}
