mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{interlaced_format, Capture, HEIGHT, WIDTH};
use vipp::buffer::{Flags, State};
use vipp::format::{mbus::code, FieldOrder, MbusFormat};
use vipp::{Buffer, Config, Error};

const FRAME: u64 = 0x20_0000;

fn buffer(index: u32) -> Buffer {
    Buffer::new(index, 0x1000_0000 + FRAME * index as u64)
}

#[test]
fn buffers_complete_in_submission_order() {
    const COUNT: u32 = 64;

    let capture = Arc::new(Capture::new(Config::default()));
    let port = &capture.port;
    port.endpoint.queue_buffer(buffer(0)).unwrap();
    port.endpoint.start_streaming().unwrap();

    let producer = {
        let capture = capture.clone();
        thread::spawn(move || {
            for index in 1..COUNT {
                capture.port.endpoint.queue_buffer(buffer(index)).unwrap();
                thread::yield_now();
            }
        })
    };
    let completer = {
        let capture = capture.clone();
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(10);
            let mut done = 0;
            while done < COUNT && Instant::now() < deadline {
                if capture.port.channel.finish_next(None) {
                    done += 1;
                } else {
                    thread::yield_now();
                }
            }
            done
        })
    };

    producer.join().unwrap();
    assert_eq!(completer.join().unwrap(), COUNT);

    for expected in 0..COUNT {
        let (buf, state) = port
            .queue
            .dequeue_timeout(Duration::from_secs(1))
            .unwrap();
        assert_eq!(state, State::Done);
        assert_eq!(buf.index, expected);
        assert_eq!(buf.meta.sequence, expected);
        assert_eq!(buf.meta.field, FieldOrder::Progressive);
        assert_eq!(buf.meta.bytesused[0], WIDTH * 2 * HEIGHT);
        assert!(buf.meta.flags.contains(Flags::DONE));
    }
    assert_eq!(port.endpoint.inflight(), 0);
}

fn interlaced_capture() -> Capture {
    let capture = Capture::new(Config::default());

    let mut fmt = MbusFormat::new(code::UYVY8_1X16, WIDTH, HEIGHT);
    fmt.field = FieldOrder::Alternate;
    capture.rx.set_format(0, fmt).unwrap();
    capture
        .port
        .endpoint
        .set_format(&interlaced_format())
        .unwrap();

    capture
}

fn run_fields(capture: &Capture, fids: &[u32]) -> Vec<(u32, FieldOrder)> {
    let port = &capture.port;
    for index in 0..fids.len() as u32 {
        port.endpoint.queue_buffer(buffer(index)).unwrap();
    }
    port.endpoint.start_streaming().unwrap();

    for fid in fids {
        assert!(port.channel.finish_next(Some(*fid)));
    }

    (0..fids.len())
        .map(|_| {
            let (buf, _) = port.queue.dequeue().unwrap();
            (buf.meta.sequence, buf.meta.field)
        })
        .collect()
}

#[test]
fn alternating_fields_share_frame_numbers() {
    let capture = interlaced_capture();

    let seq = run_fields(&capture, &[1, 0, 1, 0]);
    assert_eq!(
        seq,
        vec![
            (0, FieldOrder::Top),
            (0, FieldOrder::Bottom),
            (1, FieldOrder::Top),
            (1, FieldOrder::Bottom)
        ]
    );
}

#[test]
fn repeated_field_skips_a_frame_number() {
    let capture = interlaced_capture();

    let seq = run_fields(&capture, &[1, 1, 0]);
    assert_eq!(
        seq,
        vec![
            (0, FieldOrder::Top),
            (1, FieldOrder::Top),
            (1, FieldOrder::Bottom)
        ]
    );
}

#[test]
fn sequence_restarts_with_the_stream() {
    let capture = Capture::new(Config::default());
    let port = &capture.port;

    for _ in 0..2 {
        port.endpoint.queue_buffer(buffer(0)).unwrap();
        port.endpoint.start_streaming().unwrap();
        assert!(port.channel.finish_next(None));
        let (buf, _) = port.queue.dequeue().unwrap();
        assert_eq!(buf.meta.sequence, 0);
        port.endpoint.stop_streaming();
    }
}

#[test]
fn stop_returns_pending_buffers_with_errors() {
    let capture = Capture::new(Config::default());
    let port = &capture.port;
    for index in 0..3 {
        port.endpoint.queue_buffer(buffer(index)).unwrap();
    }
    port.endpoint.start_streaming().unwrap();
    assert!(port.channel.finish_next(None));

    port.endpoint.stop_streaming();
    assert!(!port.channel.is_running());
    assert!(!capture.rx.is_streaming());
    assert_eq!(port.endpoint.inflight(), 0);

    let returned: Vec<_> = std::iter::from_fn(|| port.queue.dequeue())
        .map(|(buf, state)| (buf.index, state))
        .collect();
    assert_eq!(
        returned,
        vec![(0, State::Done), (1, State::Error), (2, State::Error)]
    );

    // stopping twice is harmless
    port.endpoint.stop_streaming();
}

#[test]
fn restart_while_streaming_is_busy() {
    let capture = Capture::new(Config::default());
    let ep = &capture.port.endpoint;

    ep.start_streaming().unwrap();
    assert_eq!(ep.start_streaming(), Err(Error::Busy));
    assert_eq!(ep.pipeline().unwrap().use_count(), 1);
    ep.stop_streaming();
}

#[test]
fn rejected_buffer_fails_alone() {
    let capture = Capture::new(Config::default());
    let port = &capture.port;
    port.endpoint.start_streaming().unwrap();

    port.channel.reject(true);
    assert_eq!(
        port.endpoint.queue_buffer(buffer(0)),
        Err(Error::ChannelRejected)
    );
    port.channel.reject(false);
    port.endpoint.queue_buffer(buffer(1)).unwrap();

    let (buf, state) = port.queue.dequeue().unwrap();
    assert_eq!((buf.index, state), (0, State::Error));
    assert_eq!(port.endpoint.inflight(), 1);

    assert!(port.channel.finish_next(None));
    let (buf, state) = port.queue.dequeue().unwrap();
    assert_eq!((buf.index, state, buf.meta.sequence), (1, State::Done, 0));
}

#[test]
fn descriptor_covers_the_compose_rectangle() {
    let capture = Capture::new(Config::default());
    let port = &capture.port;
    port.endpoint
        .set_crop(vipp::Rect::new(641, 480))
        .unwrap();

    port.endpoint.queue_buffer(buffer(0)).unwrap();
    let xt = port.channel.descriptor(0).unwrap();
    assert_eq!(xt.chunks[0].size, 640 * 2);
    assert_eq!(xt.chunks[0].icg, (WIDTH - 640) * 2);
    assert_eq!(xt.numf(), 480);

    // the stage still produces the full frame
    assert_eq!(
        port.endpoint.start_streaming(),
        Err(Error::FormatMismatch("frame size"))
    );
}

#[test]
fn mismatched_stage_format_refuses_to_start() {
    let capture = Capture::new(Config::default());
    let port = &capture.port;
    capture
        .rx
        .set_format(0, MbusFormat::new(code::VUY8_1X24, WIDTH, HEIGHT))
        .unwrap();
    port.endpoint.queue_buffer(buffer(0)).unwrap();

    assert_eq!(
        port.endpoint.start_streaming(),
        Err(Error::FormatMismatch("media bus code"))
    );
    assert!(!port.endpoint.is_streaming());
    assert!(capture
        .dev
        .graph()
        .pipeline(port.endpoint.entity())
        .is_none());

    let (buf, state) = port.queue.dequeue().unwrap();
    assert_eq!((buf.index, state), (0, State::Queued));
    assert!(buf.meta.flags.contains(Flags::QUEUED));
}

#[test]
fn unlinked_endpoint_is_not_connected() {
    let capture = Capture::new(Config::default());
    let graph = capture.dev.graph();
    graph
        .set_link_enabled(
            vipp::graph::PadRef::new(capture.rx_id, 0),
            vipp::graph::PadRef::new(capture.port.endpoint.entity(), 0),
            false,
        )
        .unwrap();

    assert_eq!(
        capture.port.endpoint.start_streaming(),
        Err(Error::NotConnected)
    );
}

#[test]
fn links_are_frozen_while_streaming() {
    let capture = Capture::new(Config::default());
    let graph = capture.dev.graph();
    let source = vipp::graph::PadRef::new(capture.rx_id, 0);
    let sink = vipp::graph::PadRef::new(capture.port.endpoint.entity(), 0);

    capture.port.endpoint.start_streaming().unwrap();
    assert_eq!(graph.set_link_enabled(source, sink, false), Err(Error::Busy));

    capture.port.endpoint.stop_streaming();
    assert_eq!(graph.set_link_enabled(source, sink, false), Ok(()));
}

#[test]
fn accepted_buffer_stays_with_the_channel() {
    let capture = Capture::new(Config::default());
    let port = &capture.port;
    port.endpoint.start_streaming().unwrap();

    port.channel.fail_start(true);
    assert_eq!(port.endpoint.queue_buffer(buffer(0)), Ok(()));
    assert_eq!(port.endpoint.inflight(), 1);
    assert!(port.queue.dequeue().is_none());

    port.channel.fail_start(false);
    port.endpoint.stop_streaming();
    let returned: Vec<_> = std::iter::from_fn(|| port.queue.dequeue())
        .map(|(buf, state)| (buf.index, state))
        .collect();
    assert_eq!(returned, vec![(0, State::Error)]);
}
