//! Integration tests for optimistic-send reconciliation.

use std::sync::Arc;

use duet_chat_core::{
    ChatEvent, InMemoryMessageStore, MessageRef, MessageReconciler, MessageStatus,
};
use duet_transport::mock::MockTransport;
use duet_transport::{
    ClientCommand, ConversationId, DeliveryState, MessageId, TempId, UserId, WireMessage,
};
use tokio::sync::broadcast::error::TryRecvError;

fn reconciler() -> (MessageReconciler, Arc<MockTransport>, Arc<InMemoryMessageStore>) {
    let transport = Arc::new(MockTransport::new());
    let store = Arc::new(InMemoryMessageStore::new());
    let reconciler = MessageReconciler::new(
        transport.clone(),
        store.clone(),
        UserId::from("u1"),
    );
    (reconciler, transport, store)
}

fn server_echo(real_id: &str, temp_id: &TempId, content: &str) -> WireMessage {
    WireMessage {
        id: MessageId::from(real_id),
        conversation_id: ConversationId::from("conv1"),
        sender_id: UserId::from("u1"),
        content: content.to_string(),
        kind: "text".to_string(),
        temp_id: Some(temp_id.clone()),
        metadata: None,
        created_at: chrono::Utc::now(),
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) => return events,
            Err(other) => panic!("event stream broken: {other:?}"),
        }
    }
}

#[tokio::test]
async fn send_emits_frame_and_caches_pending() {
    let (reconciler, transport, _) = reconciler();
    let mut rx = reconciler.subscribe();

    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();

    assert_eq!(pending.status, MessageStatus::Sending);
    assert_eq!(
        reconciler.correlation().resolve(&pending.temp_id),
        pending.temp_id.0
    );

    let emitted = transport.emitted();
    assert_eq!(emitted.len(), 1);
    match &emitted[0] {
        ClientCommand::SendMessage(outbound) => {
            assert_eq!(outbound.temp_id, pending.temp_id);
            assert_eq!(outbound.content, "hi");
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let events = drain(&mut rx);
    assert!(matches!(events.as_slice(), [ChatEvent::MessagePending(_)]));
}

#[tokio::test]
async fn confirmation_reconciles_once() {
    let (reconciler, _, store) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();
    let mut rx = reconciler.subscribe();

    let echo = server_echo("m1", &pending.temp_id, "hi");
    reconciler
        .handle_confirmation(pending.temp_id.clone(), echo.clone())
        .await;
    // Retransmission of the same confirmation.
    reconciler
        .handle_confirmation(pending.temp_id.clone(), echo)
        .await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "duplicate confirmation must not re-emit");
    match &events[0] {
        ChatEvent::MessageReconciled { temp_id, message } => {
            assert_eq!(temp_id, &pending.temp_id);
            assert_eq!(message.id, MessageId::from("m1"));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(reconciler.correlation().resolve(&pending.temp_id), "m1");
    assert!(reconciler.pending(&pending.temp_id).is_none());
    assert_eq!(store.message_count(&ConversationId::from("conv1")), 1);
}

#[tokio::test]
async fn server_echo_content_is_authoritative() {
    let (reconciler, _, _) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "rude words", None)
        .await
        .unwrap();
    let mut rx = reconciler.subscribe();

    // Server-applied moderation altered the content.
    reconciler
        .handle_confirmation(
            pending.temp_id.clone(),
            server_echo("m1", &pending.temp_id, "***"),
        )
        .await;

    match drain(&mut rx).as_slice() {
        [ChatEvent::MessageReconciled { message, .. }] => assert_eq!(message.content, "***"),
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn socket_delivery_races_confirmation_idempotently() {
    let (reconciler, _, _) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();
    let mut rx = reconciler.subscribe();

    let echo = server_echo("m1", &pending.temp_id, "hi");
    // The room broadcast and the confirmation path both deliver our message.
    reconciler.handle_incoming(echo.clone()).await;
    reconciler
        .handle_confirmation(pending.temp_id.clone(), echo)
        .await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChatEvent::MessageReconciled { .. }));
}

#[tokio::test]
async fn plain_inbound_message_passes_through() {
    let (reconciler, _, store) = reconciler();
    let mut rx = reconciler.subscribe();

    let remote = WireMessage {
        id: MessageId::from("m7"),
        conversation_id: ConversationId::from("conv1"),
        sender_id: UserId::from("u2"),
        content: "hello there".to_string(),
        kind: "text".to_string(),
        temp_id: None,
        metadata: None,
        created_at: chrono::Utc::now(),
    };
    reconciler.handle_incoming(remote.clone()).await;

    match drain(&mut rx).as_slice() {
        [ChatEvent::MessageReceived(message)] => assert_eq!(message, &remote),
        other => panic!("unexpected events: {other:?}"),
    }
    assert_eq!(store.message_count(&ConversationId::from("conv1")), 1);
}

#[tokio::test]
async fn failure_marks_failed_and_retains_for_retry() {
    let (reconciler, _, _) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();
    let mut rx = reconciler.subscribe();

    reconciler
        .handle_failure(pending.temp_id.clone(), "network".to_string())
        .await;

    let cached = reconciler.pending(&pending.temp_id).expect("retained");
    assert_eq!(cached.status, MessageStatus::Failed);
    assert_eq!(
        reconciler.pending_messages(&ConversationId::from("conv1")).len(),
        1
    );

    match drain(&mut rx).as_slice() {
        [ChatEvent::MessageFailed { temp_id, error }] => {
            assert_eq!(temp_id, &pending.temp_id);
            assert_eq!(error, "network");
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_failure_emits_once() {
    let (reconciler, _, _) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();
    let mut rx = reconciler.subscribe();

    reconciler
        .handle_failure(pending.temp_id.clone(), "network".to_string())
        .await;
    // Retransmission of the same failure.
    reconciler
        .handle_failure(pending.temp_id.clone(), "network".to_string())
        .await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "duplicate failure must not re-emit");
    assert_eq!(
        reconciler.pending(&pending.temp_id).unwrap().status,
        MessageStatus::Failed
    );
}

#[tokio::test]
async fn delivery_by_server_id_retargets_to_temp_id() {
    let (reconciler, _, _) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();
    reconciler
        .handle_confirmation(
            pending.temp_id.clone(),
            server_echo("real1", &pending.temp_id, "hi"),
        )
        .await;
    let mut rx = reconciler.subscribe();

    reconciler
        .handle_delivery("real1".to_string(), DeliveryState::Read, None)
        .await;

    match drain(&mut rx).as_slice() {
        [ChatEvent::DeliveryUpdated {
            message_ref,
            status,
            ..
        }] => {
            assert_eq!(message_ref, &MessageRef::Temp(pending.temp_id.clone()));
            assert_eq!(*status, DeliveryState::Read);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn delivery_by_temp_id_updates_pending_status() {
    let (reconciler, _, _) = reconciler();
    let pending = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await
        .unwrap();
    let mut rx = reconciler.subscribe();

    reconciler
        .handle_delivery(pending.temp_id.0.clone(), DeliveryState::Delivered, None)
        .await;

    assert_eq!(
        reconciler.pending(&pending.temp_id).unwrap().status,
        MessageStatus::Delivered
    );
    match drain(&mut rx).as_slice() {
        [ChatEvent::DeliveryUpdated { message_ref, .. }] => {
            assert_eq!(message_ref, &MessageRef::Temp(pending.temp_id.clone()));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn delivery_for_unknown_id_is_emitted_by_server_ref() {
    let (reconciler, _, _) = reconciler();
    let mut rx = reconciler.subscribe();

    reconciler
        .handle_delivery("m42".to_string(), DeliveryState::Delivered, None)
        .await;

    // Never silently dropped, even when neither ID space matches.
    match drain(&mut rx).as_slice() {
        [ChatEvent::DeliveryUpdated { message_ref, .. }] => {
            assert_eq!(message_ref, &MessageRef::Server(MessageId::from("m42")));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn failed_emit_caches_nothing() {
    let (reconciler, transport, _) = reconciler();
    transport.fail_sends(true);

    let result = reconciler
        .send_message(ConversationId::from("conv1"), "text", "hi", None)
        .await;

    assert!(result.is_err());
    assert!(reconciler
        .pending_messages(&ConversationId::from("conv1"))
        .is_empty());
    assert!(reconciler.correlation().is_empty());
}

#[tokio::test]
async fn typing_and_rooms_reach_the_transport() {
    let (reconciler, transport, _) = reconciler();
    let conv = ConversationId::from("conv1");

    reconciler.join_conversation(&conv).await.unwrap();
    reconciler.send_typing(conv.clone(), true).await.unwrap();
    reconciler.send_typing(conv.clone(), false).await.unwrap();
    reconciler.leave_conversation(&conv).await.unwrap();

    assert_eq!(transport.joined_rooms(), vec![conv.clone()]);
    assert_eq!(transport.left_rooms(), vec![conv.clone()]);
    let emitted = transport.emitted();
    assert!(matches!(emitted[0], ClientCommand::TypingStart { .. }));
    assert!(matches!(emitted[1], ClientCommand::TypingStop { .. }));
}
