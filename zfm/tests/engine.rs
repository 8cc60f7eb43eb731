//! Engine integration tests against a scripted sensor
//!
//! The sensor double implements the serial traits directly: command
//! frames written by the engine are decoded and answered according to a
//! per-test script, and the scripted replies flow back through the real
//! reader and correlator tasks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio::time::timeout;

use zfm::{
    Command, Engine, EnrollError, Event, EventKind, Packet, PacketKind, SearchMatch, StatusCode,
    VerifyError, COMMAND_QUEUE_CAPACITY, DEFAULT_ADDRESS,
};
use zfm_core::scan_frames;
use zfm_transport::{SerialRx, SerialTx};

type Responder = Box<dyn FnMut(u8, &[u8]) -> Vec<Packet> + Send>;

struct SensorState {
    responder: Responder,
    seen: Vec<u8>,
}

struct SensorTx {
    state: Arc<Mutex<SensorState>>,
    out: mpsc::UnboundedSender<BytesMut>,
}

#[async_trait]
impl SerialTx for SensorTx {
    async fn write_all(&mut self, data: &[u8]) -> zfm_transport::Result<()> {
        let mut state = self.state.lock().unwrap();
        for packet in scan_frames(data) {
            state.seen.push(packet.code);
            for reply in (state.responder)(packet.code, &packet.params) {
                let _ = self.out.send(reply.encode());
            }
        }
        Ok(())
    }
}

struct SensorRx {
    out: mpsc::UnboundedReceiver<BytesMut>,
}

#[async_trait]
impl SerialRx for SensorRx {
    async fn read(&mut self, limit: Duration) -> zfm_transport::Result<BytesMut> {
        match timeout(limit, self.out.recv()).await {
            Ok(Some(buf)) => Ok(buf),
            Ok(None) => Err(zfm_transport::Error::Closed),
            Err(_) => Err(zfm_transport::Error::ReadTimeout),
        }
    }
}

fn scripted_sensor(
    responder: impl FnMut(u8, &[u8]) -> Vec<Packet> + Send + 'static,
) -> (SensorTx, SensorRx, Arc<Mutex<SensorState>>) {
    let state = Arc::new(Mutex::new(SensorState {
        responder: Box::new(responder),
        seen: Vec::new(),
    }));
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    (
        SensorTx {
            state: Arc::clone(&state),
            out: out_tx,
        },
        SensorRx { out: out_rx },
        state,
    )
}

fn ack(status: u8) -> Packet {
    ack_with(status, &[])
}

fn ack_with(status: u8, params: &[u8]) -> Packet {
    Packet::new(DEFAULT_ADDRESS, PacketKind::Ack, status, params.to_vec()).unwrap()
}

fn event_recorder(engine: &Engine) -> mpsc::UnboundedReceiver<EventKind> {
    let (tx, rx) = mpsc::unbounded_channel();
    engine.register_handler(move |event: &Event| {
        let _ = tx.send(event.kind);
    });
    rx
}

#[tokio::test(start_paused = true)]
async fn correlation_pairs_responses_in_send_order() {
    let (tx, rx, _) = scripted_sensor(|code, _| match code {
        0x01 => vec![ack(0x00)],
        0x04 => vec![ack_with(0x00, &[0x00, 0x01, 0x00, 0x64])],
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);
    let mut events = event_recorder(&engine);

    // GenImg and a second GenImg share a code; the Search in between
    // must still pair with its own response
    engine.send(Command::GenImg, &[]).await.unwrap();
    engine
        .send(Command::Search, &[0x01, 0x00, 0x00, 0x00, 0xC8])
        .await
        .unwrap();
    engine.send(Command::GenImg, &[]).await.unwrap();

    let mut kinds = Vec::new();
    for _ in 0..3 {
        kinds.push(
            timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap(),
        );
    }

    assert_eq!(
        kinds,
        vec![
            EventKind::FingerDetected,
            EventKind::SearchSuccess,
            EventKind::FingerDetected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn enroll_happy_path() {
    let mut genimg_calls = 0u32;
    let (tx, rx, _) = scripted_sensor(move |code, _| match code {
        0x1F => vec![ack_with(0x00, &[0u8; 32])], // page empty
        0x01 => {
            genimg_calls += 1;
            // second poll is the removal check
            if genimg_calls == 2 {
                vec![ack(0x02)]
            } else {
                vec![ack(0x00)]
            }
        }
        0x02 | 0x05 | 0x06 => vec![ack(0x00)],
        0x04 => vec![ack(0x09)], // no duplicate in the library
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);
    let mut events = event_recorder(&engine);

    engine.enroll(9).await.unwrap();

    let mut saw_stored = false;
    while let Ok(Some(kind)) = timeout(Duration::from_millis(100), events.recv()).await {
        if kind == EventKind::TemplateStored {
            saw_stored = true;
        }
    }
    assert!(saw_stored);
}

#[tokio::test(start_paused = true)]
async fn enroll_rejects_occupied_location() {
    let (tx, rx, state) = scripted_sensor(|code, _| match code {
        0x1F => {
            // slot 9: byte 1, bit 1
            let mut bitmap = [0u8; 32];
            bitmap[1] = 0b0000_0010;
            vec![ack_with(0x00, &bitmap)]
        }
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    let result = engine.enroll(9).await;
    assert!(matches!(result, Err(EnrollError::LocationOccupied(9))));

    // Fail-fast: nothing was sent beyond the index-table read
    assert_eq!(state.lock().unwrap().seen, vec![0x1F]);
}

#[tokio::test(start_paused = true)]
async fn enroll_duplicate_exhausts_attempts() {
    let mut genimg_calls = 0u32;
    let (tx, rx, _) = scripted_sensor(move |code, _| match code {
        0x1F => vec![ack_with(0x00, &[0u8; 32])],
        0x01 => {
            let call = genimg_calls;
            genimg_calls += 1;
            // finger present, removed, present again, each pass
            if call % 3 == 1 {
                vec![ack(0x02)]
            } else {
                vec![ack(0x00)]
            }
        }
        0x02 | 0x05 => vec![ack(0x00)],
        // every duplicate search finds a match
        0x04 => vec![ack_with(0x00, &[0x00, 0x07, 0x01, 0x2C])],
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    let result = engine.enroll(20).await;
    assert!(matches!(result, Err(EnrollError::Failed(3))));
}

#[tokio::test(start_paused = true)]
async fn verify_happy_path() {
    let (tx, rx, _) = scripted_sensor(|code, _| match code {
        0x01 | 0x02 => vec![ack(0x00)],
        0x04 => vec![ack_with(0x00, &[0x00, 0x2A, 0x01, 0x90])],
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    let found = engine.verify().await.unwrap();
    assert_eq!(
        found,
        SearchMatch {
            page_id: 42,
            score: 400
        }
    );
}

#[tokio::test(start_paused = true)]
async fn verify_timeout_never_sends_capture() {
    let (tx, rx, state) = scripted_sensor(|code, _| match code {
        0x01 => vec![ack(0x02)], // never a finger
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    let result = engine.verify().await;
    assert!(matches!(result, Err(VerifyError::Failed(3))));

    let seen = state.lock().unwrap().seen.clone();
    assert!(!seen.is_empty());
    assert!(
        seen.iter().all(|code| *code == 0x01),
        "only GenImg polls expected, saw {seen:02X?}"
    );
}

#[tokio::test(start_paused = true)]
async fn excess_sends_fail_with_queue_full() {
    // Silent device: records are never consumed
    let (tx, rx, _) = scripted_sensor(|_, _| vec![]);
    let engine = Engine::new(tx, rx);

    for _ in 0..COMMAND_QUEUE_CAPACITY {
        engine.send(Command::GenImg, &[]).await.unwrap();
    }

    let result = engine.send(Command::GenImg, &[]).await;
    assert!(matches!(result, Err(zfm::Error::QueueFull)));
}

#[tokio::test(start_paused = true)]
async fn delete_and_clear_surface_device_status() {
    let (tx, rx, _) = scripted_sensor(|code, _| match code {
        0x0C => vec![ack(0x00)],
        0x0D => vec![ack(0x11)], // library clear failed
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    engine.delete(3).await.unwrap();

    let result = engine.clear_database().await;
    match result {
        Err(zfm::FlowError::Rejected(status)) => {
            assert_eq!(status, StatusCode::DbClearFail);
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn read_system_parameters_parses_payload() {
    let (tx, rx, _) = scripted_sensor(|code, _| match code {
        0x0F => {
            let payload = [
                0x00, 0x00, 0x00, 0x09, 0x00, 0xC8, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
                0x02, 0x00, 0x06,
            ];
            vec![ack_with(0x00, &payload)]
        }
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    let params = engine.read_system_parameters().await.unwrap();
    assert_eq!(params.library_size, 200);
    assert_eq!(params.baud_rate(), 57_600);
}

#[tokio::test(start_paused = true)]
async fn template_count_round_trip() {
    let (tx, rx, _) = scripted_sensor(|code, _| match code {
        0x1D => vec![ack_with(0x00, &[0x00, 0x2A])],
        _ => vec![],
    });
    let engine = Engine::new(tx, rx);

    assert_eq!(engine.template_count().await.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn finger_hint_is_single_slot() {
    let (tx, rx, _) = scripted_sensor(|_, _| vec![]);
    let engine = Engine::new(tx, rx);

    let hint = engine.finger_hint();
    let mut hints = engine.take_finger_hints().unwrap();
    assert!(engine.take_finger_hints().is_none());

    assert!(hint.notify());
    // Slot already holds an undelivered hint
    assert!(!hint.notify());

    assert!(hints.recv().await.is_some());
    assert!(hint.notify());
}
