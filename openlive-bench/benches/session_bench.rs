//! Session receive-loop benchmarks over an in-memory transport.

use async_trait::async_trait;
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use openlive_client::{CloseReason, FrameSink, FrameSource, Session, SessionConfig, TransportError};
use openlive_protocol::{ApplicationMessage, Encoder, Operation};
use std::collections::VecDeque;
use tokio::runtime::Runtime;

struct NullSink;

#[async_trait]
impl FrameSink for NullSink {
    async fn send(&mut self, _frame: Bytes) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Replays a fixed list of frames, then reports the peer as closed.
struct ReplaySource {
    frames: VecDeque<Bytes>,
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.frames.pop_front())
    }
}

fn create_stream(count: usize) -> VecDeque<Bytes> {
    let mut frames = VecDeque::with_capacity(count + 1);
    frames.push_back(Encoder::encode(Operation::AuthReply, br#"{"code":0}"#).freeze());

    let body = serde_json::to_vec(&serde_json::json!({
        "cmd": "LIVE_OPEN_PLATFORM_SEND_GIFT",
        "data": {"uname": "viewer", "gift_name": "flower", "gift_num": 1},
    }))
    .unwrap();
    let frame = Encoder::encode(Operation::Message, &body).freeze();
    for _ in 0..count {
        frames.push_back(frame.clone());
    }
    frames
}

fn bench_session_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("session_dispatch");

    for count in [100, 1000, 10000] {
        let frames = create_stream(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &frames, |b, frames| {
            b.to_async(&rt).iter(|| async {
                let session = Session::new(
                    NullSink,
                    ReplaySource {
                        frames: frames.clone(),
                    },
                    SessionConfig::default(),
                );

                let mut dispatched = 0usize;
                let reason = session
                    .run(b"{}", |_message: ApplicationMessage| dispatched += 1)
                    .await
                    .unwrap();

                assert_eq!(reason, CloseReason::RemoteClosed);
                black_box(dispatched)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_session_dispatch);
criterion_main!(benches);
