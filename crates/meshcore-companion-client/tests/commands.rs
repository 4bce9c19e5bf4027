//! Command round trips against a scripted device.

mod common;

use std::time::Duration;

use common::*;
use meshcore_companion_protocol::*;
use serde_json::json;

fn key_hex() -> String {
    "ab".repeat(32)
}

#[tokio::test]
async fn test_send_msg_then_wait_for_ack() {
    let ack = [0xde, 0xad, 0xbe, 0xef];
    let client = connected_client(move |p| match p.first() {
        Some(&CMD_SEND_TXT_MSG) => vec![msg_sent_payload(ack)],
        _ => app_start_reply(p).unwrap_or_default(),
    })
    .await;

    let hex = key_hex();
    let event = client.commands().send_msg(&hex, "hello", Some(0x6553_f100)).await;
    let EventPayload::MsgSent(sent) = &event.payload else {
        panic!("expected MSG_SENT, got {:?}", event.payload);
    };
    assert_eq!(sent.expected_ack, ack);
    assert_eq!(event.attribute("expected_ack"), Some(&"deadbeef".into()));

    let payload = client.transport().sent().pop().unwrap();
    assert_eq!(&payload[..3], &[CMD_SEND_TXT_MSG, TXT_TYPE_PLAIN, 0]);
    assert_eq!(&payload[3..7], &0x6553_f100u32.to_le_bytes());
    assert_eq!(&payload[7..13], &[0xab; 6]);
    assert_eq!(&payload[13..], b"hello");

    let (result, _) = tokio::join!(
        client.commands().wait_for_ack(sent.expected_ack, Some(Duration::from_secs(1))),
        async {
            tokio::task::yield_now().await;
            client.transport().inject(&ack_payload([1, 2, 3, 4]));
            client.transport().inject(&ack_payload(ack));
        }
    );
    let EventPayload::Ack(received) = result.payload else {
        panic!("expected ACK");
    };
    assert_eq!(received.code, Some(ack));
    assert_eq!(received.trip_time_ms, Some(420));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_ack_times_out() {
    let client = connected_client(|p| app_start_reply(p).unwrap_or_default()).await;
    let event = client.commands().wait_for_ack([9, 9, 9, 9], Some(SHORT)).await;
    assert_eq!(event.payload, EventPayload::Error(ErrorDetail::Timeout));
}

#[tokio::test]
async fn test_reboot_is_send_only() {
    let client = connected_client(|p| app_start_reply(p).unwrap_or_default()).await;
    let event = client.commands().reboot().await;
    assert_eq!(event.payload, EventPayload::Ok(None));
    assert_eq!(client.transport().sent().pop().unwrap(), b"\x13reboot".to_vec());
    assert_eq!(client.dispatcher().waiter_count(), 0);
}

#[tokio::test]
async fn test_invalid_destination_is_an_error_event() {
    let client = connected_client(|p| app_start_reply(p).unwrap_or_default()).await;
    let before = client.transport().sent().len();

    let event = client.commands().send_msg("not hex", "hi", None).await;
    assert!(event.is_error());
    assert_eq!(event.attribute("reason"), Some(&"invalid_destination".into()));

    let event = client.commands().send_login("abcd", "pw").await;
    assert_eq!(event.attribute("reason"), Some(&"invalid_destination".into()));

    let record = json!({ "adv_name": "no key" });
    let event = client.commands().remove_contact(&record).await;
    assert_eq!(event.attribute("reason"), Some(&"invalid_destination".into()));

    assert_eq!(client.transport().sent().len(), before);
}

#[tokio::test]
async fn test_invalid_trace_path_is_an_error_event() {
    let client = connected_client(|p| app_start_reply(p).unwrap_or_default()).await;
    let path = TracePath::Hex("12,zz".into());
    let event = client.commands().send_trace(None, Some(1), 0, Some(&path)).await;
    assert_eq!(event.attribute("reason"), Some(&"invalid_path_format".into()));
    assert_eq!(client.transport().sent_with_code(CMD_SEND_TRACE_PATH), 0);
}

#[tokio::test]
async fn test_trace_uses_random_nonzero_tag() {
    let client = connected_client(|p| match p.first() {
        Some(&CMD_SEND_TRACE_PATH) => vec![msg_sent_payload([0; 4])],
        _ => app_start_reply(p).unwrap_or_default(),
    })
    .await;

    let path = TracePath::Hex("23,5f".into());
    let event = client.commands().send_trace(Some(7), None, 1, Some(&path)).await;
    assert_eq!(event.kind(), EventKind::MsgSent);

    let payload = client.transport().sent().pop().unwrap();
    let tag = u32::from_le_bytes(payload[1..5].try_into().unwrap());
    assert_ne!(tag, 0);
    assert_eq!(u32::from_le_bytes(payload[5..9].try_into().unwrap()), 7);
    assert_eq!(&payload[9..], &[1, 0x23, 0x5f]);
}

#[tokio::test]
async fn test_login_with_json_record() {
    let client = connected_client(|p| match p.first() {
        Some(&CMD_SEND_LOGIN) => vec![msg_sent_payload([1, 1, 1, 1])],
        _ => app_start_reply(p).unwrap_or_default(),
    })
    .await;

    let record = json!({ "public_key": key_hex(), "adv_name": "repeater" });
    let event = client.commands().send_login(&record, "secret").await;
    assert_eq!(event.kind(), EventKind::MsgSent);

    let payload = client.transport().sent().pop().unwrap();
    assert_eq!(payload[0], CMD_SEND_LOGIN);
    assert_eq!(&payload[1..33], &[0xab; 32]);
    assert_eq!(&payload[33..], b"secret");
}

#[tokio::test]
async fn test_device_error_wins_the_race() {
    let client = connected_client(|p| match p.first() {
        Some(&CMD_REMOVE_CONTACT) => vec![vec![RESP_CODE_ERR, ERR_CODE_NOT_FOUND]],
        _ => app_start_reply(p).unwrap_or_default(),
    })
    .await;

    let key = PublicKey::new([0x42; 32]);
    let event = client.commands().remove_contact(&key).await;
    assert_eq!(
        event.payload,
        EventPayload::Error(ErrorDetail::Device(Some(FirmwareErrorCode::NotFound)))
    );
    assert_eq!(event.attribute("reason"), None);
    assert_eq!(client.dispatcher().waiter_count(), 0);
}

#[tokio::test]
async fn test_get_msg_ignores_unrelated_pushes() {
    let client = connected_client(|p| match p.first() {
        Some(&CMD_SYNC_NEXT_MESSAGE) => vec![
            vec![PUSH_CODE_ADVERT],
            vec![RESP_CODE_BATTERY, 0x10, 0x0e],
            channel_msg_payload(3, "ping"),
        ],
        _ => app_start_reply(p).unwrap_or_default(),
    })
    .await;

    let event = client.commands().get_msg().await;
    let EventPayload::ChannelMsgRecv(msg) = event.payload else {
        panic!("expected channel message");
    };
    assert_eq!(msg.channel_idx, 3);
    assert_eq!(msg.text, "ping");
    assert_eq!(client.dispatcher().waiter_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_per_call_timeout_override() {
    let client = connected_client(|p| app_start_reply(p).unwrap_or_default()).await;
    let started = tokio::time::Instant::now();
    let event = client
        .commands()
        .with_timeout(Duration::from_millis(5))
        .get_bat()
        .await;
    assert_eq!(event.payload, EventPayload::Error(ErrorDetail::Timeout));
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn test_settings_commands_await_ok() {
    let client = connected_client(|p| match p.first() {
        Some(&CMD_APP_START) => vec![self_info_payload("node")],
        Some(_) => vec![vec![RESP_CODE_OK]],
        None => Vec::new(),
    })
    .await;
    let commands = client.commands();

    assert_eq!(commands.set_name("base").await.kind(), EventKind::Ok);
    assert_eq!(commands.set_coords(45.5, -73.6).await.kind(), EventKind::Ok);
    assert_eq!(commands.set_tx_power(20).await.kind(), EventKind::Ok);
    assert_eq!(commands.set_radio(869.525, 250.0, 11, 5).await.kind(), EventKind::Ok);
    assert_eq!(commands.set_tuning(10, 20).await.kind(), EventKind::Ok);
    assert_eq!(commands.send_advert(true).await.kind(), EventKind::Ok);
    assert_eq!(commands.send_chan_msg(0, "hi all", Some(1_700_000_123)).await.kind(), EventKind::Ok);

    let tuning = client
        .transport()
        .sent()
        .into_iter()
        .find(|p| p[0] == CMD_SET_TUNING_PARAMS)
        .unwrap();
    assert_eq!(u32::from_le_bytes(tuning[1..5].try_into().unwrap()), 10);
    assert_eq!(u32::from_le_bytes(tuning[5..9].try_into().unwrap()), 20);

    let chan = client
        .transport()
        .sent()
        .into_iter()
        .find(|p| p[0] == CMD_SEND_CHANNEL_TXT_MSG)
        .unwrap();
    assert_eq!(&chan[3..7], &1_700_000_123u32.to_le_bytes());
    assert_eq!(&chan[7..], b"hi all");
}

#[tokio::test]
async fn test_export_self_returns_uri() {
    let client = connected_client(|p| match p.first() {
        Some(&CMD_EXPORT_CONTACT) => vec![vec![RESP_CODE_EXPORT_CONTACT, 0x11, 0x22]],
        _ => app_start_reply(p).unwrap_or_default(),
    })
    .await;

    let event = client.commands().export_contact(None).await;
    assert_eq!(event.payload, EventPayload::ContactShare("meshcore://1122".into()));
    assert_eq!(client.transport().sent().pop().unwrap(), vec![CMD_EXPORT_CONTACT]);
}
