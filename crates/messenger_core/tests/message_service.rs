use messenger_core::repo::message_repo::{MessageRepository, SqliteMessageRepository};
use messenger_core::{
    ConstraintViolation, MessageService, NewMessage, NewUser, RepoError, ServiceError,
    SessionMode, Store, User, UserService, ValidationError,
};
use std::sync::Arc;

struct Fixture {
    store: Arc<Store>,
    users: UserService,
    messages: MessageService,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(Store::open_in_memory().unwrap());
        Self {
            users: UserService::new(Arc::clone(&store)),
            messages: MessageService::new(Arc::clone(&store)),
            store,
        }
    }

    fn user(&self, username: &str) -> User {
        self.users
            .create(&NewUser::new(username, format!("{username}@example.com")))
            .unwrap()
    }

    fn post(&self, user: &User, text: &str) {
        self.messages
            .create(&NewMessage::new(user.id, text))
            .unwrap();
    }

    fn set_created_at(&self, message_text: &str, created_at: i64) {
        self.store
            .open_session(SessionMode::Write, |tx| {
                tx.execute(
                    "UPDATE messages SET created_at = ?1 WHERE message_text = ?2;",
                    rusqlite::params![created_at, message_text],
                )
                .map_err(RepoError::from)
            })
            .unwrap();
    }
}

#[test]
fn scenario_from_first_user_to_stats() {
    let fx = Fixture::new();

    let alice = fx
        .users
        .create(&NewUser::new("alice123", "alice@example.com"))
        .unwrap();
    assert_eq!(alice.id, 1);

    let err = fx
        .users
        .create(&NewUser::new("alice123", "x@y.com"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateUser(_)));

    let message = fx.messages.create(&NewMessage::new(1, "hi")).unwrap();
    assert_eq!(message.id, 1);
    assert_eq!(message.message_text, "hi");
    assert_eq!(message.user.username, "alice123");

    let stats = fx.messages.get_conversation_stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].username, "alice123");
    assert_eq!(stats[0].message_count, 1);
    assert_eq!(stats[0].last_message_at, Some(message.created_at));
}

#[test]
fn create_keeps_text_unchanged_and_joins_author() {
    let fx = Fixture::new();
    let bob = fx.user("bob456");

    let text = "  Я за пиццу! 🍕\n";
    let message = fx.messages.create(&NewMessage::new(bob.id, text)).unwrap();

    assert_eq!(message.message_text, text);
    assert_eq!(message.user_id, bob.id);
    assert_eq!(message.user, bob);
}

#[test]
fn create_for_unknown_user_fails_and_writes_nothing() {
    let fx = Fixture::new();
    fx.user("alice123");

    let err = fx
        .messages
        .create(&NewMessage::new(99, "hello?"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownUser(99)));
    assert!(fx.messages.get_all().unwrap().is_empty());
}

#[test]
fn empty_text_fails_validation() {
    let fx = Fixture::new();
    let alice = fx.user("alice123");

    let err = fx
        .messages
        .create(&NewMessage::new(alice.id, ""))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptyMessageText)
    ));
}

#[test]
fn get_all_orders_by_creation_time_then_id() {
    let fx = Fixture::new();
    let alice = fx.user("alice123");
    let bob = fx.user("bob456");
    fx.post(&alice, "first");
    fx.post(&bob, "second");
    fx.post(&alice, "third");
    fx.set_created_at("first", 3_000);
    fx.set_created_at("second", 1_000);
    fx.set_created_at("third", 1_000);

    let texts: Vec<_> = fx
        .messages
        .get_all()
        .unwrap()
        .into_iter()
        .map(|m| (m.message_text, m.user.username))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("second".to_string(), "bob456".to_string()),
            ("third".to_string(), "alice123".to_string()),
            ("first".to_string(), "alice123".to_string()),
        ]
    );
}

#[test]
fn get_by_user_filters_and_tolerates_missing_users() {
    let fx = Fixture::new();
    let alice = fx.user("alice123");
    let bob = fx.user("bob456");
    let silent = fx.user("silent");
    fx.post(&alice, "a1");
    fx.post(&bob, "b1");
    fx.post(&alice, "a2");

    let alice_texts: Vec<_> = fx
        .messages
        .get_by_user(alice.id)
        .unwrap()
        .into_iter()
        .map(|m| m.message_text)
        .collect();
    assert_eq!(alice_texts, vec!["a1", "a2"]);

    assert!(fx.messages.get_by_user(silent.id).unwrap().is_empty());
    assert!(fx.messages.get_by_user(12345).unwrap().is_empty());
}

#[test]
fn stats_cover_every_user_and_sum_to_total() {
    let fx = Fixture::new();
    let alice = fx.user("alice123");
    let bob = fx.user("bob456");
    let carol = fx.user("carol");
    let dave = fx.user("dave");
    for text in ["a1", "a2", "a3"] {
        fx.post(&alice, text);
    }
    fx.post(&bob, "b1");
    fx.post(&carol, "c1");

    let stats = fx.messages.get_conversation_stats().unwrap();
    assert_eq!(stats.len(), fx.users.get_all().unwrap().len());

    let total: u64 = stats.iter().map(|s| s.message_count).sum();
    assert_eq!(total, fx.messages.get_all().unwrap().len() as u64);

    let order: Vec<_> = stats
        .iter()
        .map(|s| (s.username.as_str(), s.message_count))
        .collect();
    assert_eq!(
        order,
        vec![
            (alice.username.as_str(), 3),
            (bob.username.as_str(), 1),
            (carol.username.as_str(), 1),
            (dave.username.as_str(), 0),
        ]
    );
    assert!(stats[3].last_message_at.is_none());
    assert!(stats[0].last_message_at.is_some());
}

#[test]
fn latest_per_user_breaks_timestamp_ties_by_id() {
    let fx = Fixture::new();
    let alice = fx.user("alice123");
    let bob = fx.user("bob456");
    fx.user("silent");
    fx.post(&alice, "older");
    fx.post(&alice, "tie-low");
    fx.post(&alice, "tie-high");
    fx.post(&bob, "only");
    fx.set_created_at("older", 1_000);
    fx.set_created_at("tie-low", 2_000);
    fx.set_created_at("tie-high", 2_000);

    let latest = fx.messages.get_latest_per_user().unwrap();
    let rows: Vec<_> = latest
        .iter()
        .map(|l| (l.username.as_str(), l.message_text.as_str()))
        .collect();
    assert_eq!(rows, vec![("alice123", "tie-high"), ("bob456", "only")]);
}

#[test]
fn foreign_key_backstops_the_existence_check() {
    let fx = Fixture::new();

    let err = fx
        .store
        .open_session(SessionMode::Write, |tx| {
            SqliteMessageRepository::new(tx).insert_message(&NewMessage::new(7, "orphan"))
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Constraint(ConstraintViolation::ForeignKey)
    ));
    assert!(fx.messages.get_all().unwrap().is_empty());
}
