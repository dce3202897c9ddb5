use super::*;

fn analyser() -> Analyser {
    Analyser::new(&AnalysisSettings::default())
}

fn feed_sine(writer: &mut TapWriter, bin: usize, n: usize) {
    for i in 0..n {
        let phase = 2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32;
        writer.push(phase.sin());
    }
    writer.flush();
}

#[test]
fn silence_reads_as_zero() {
    let a = analyser();
    let mut out = vec![7u8; a.bin_count()];
    a.byte_frequency_data(&mut out).unwrap();
    assert!(out.iter().all(|&v| v == 0));
}

#[test]
fn connected_sine_peaks_at_its_bin() {
    let a = analyser();
    let id = StreamId::from_raw(1).unwrap();
    a.connect(id);
    let mut w = a.writer(id);
    feed_sine(&mut w, 10, 512);

    let mut out = vec![0u8; a.bin_count()];
    a.byte_frequency_data(&mut out).unwrap();
    assert_eq!(out[10], 255);
    assert!(out[100] < 50, "far bin too loud: {}", out[100]);
}

#[test]
fn writes_from_unconnected_stream_are_ignored() {
    let a = analyser();
    let old = StreamId::from_raw(1).unwrap();
    let new = StreamId::from_raw(2).unwrap();
    a.connect(new);

    let mut stale = a.writer(old);
    feed_sine(&mut stale, 10, 512);

    let mut out = vec![0u8; a.bin_count()];
    a.byte_frequency_data(&mut out).unwrap();
    assert!(out.iter().all(|&v| v == 0));
}

#[test]
fn reconnect_discards_previous_history() {
    let a = analyser();
    let first = StreamId::from_raw(1).unwrap();
    a.connect(first);
    let mut w = a.writer(first);
    feed_sine(&mut w, 20, 512);

    a.connect(StreamId::from_raw(2).unwrap());
    let mut out = vec![0u8; a.bin_count()];
    a.byte_frequency_data(&mut out).unwrap();
    assert!(out.iter().all(|&v| v == 0));
}

#[test]
fn detach_is_tolerant_and_clears_connection() {
    let a = analyser();
    a.detach();
    assert_eq!(a.connected(), None);

    let id = StreamId::from_raw(3).unwrap();
    a.connect(id);
    assert_eq!(a.connected(), Some(id));
    a.detach();
    a.detach();
    assert_eq!(a.connected(), None);
}

#[test]
fn shared_slot_creates_exactly_one_node() {
    let slot = SharedAnalyser::default();
    let settings = AnalysisSettings::default();
    let a = Analyser::shared(&slot, &settings);
    let b = Analyser::shared(&slot, &settings);
    assert!(Arc::ptr_eq(&a.inner, &b.inner));
}

#[test]
fn oversized_output_is_zero_padded() {
    let a = analyser();
    let mut out = vec![9u8; a.bin_count() + 4];
    a.byte_frequency_data(&mut out).unwrap();
    assert!(out[a.bin_count()..].iter().all(|&v| v == 0));
}

#[test]
fn spectrum_decays_when_writes_stop() {
    let a = analyser();
    let id = StreamId::from_raw(1).unwrap();
    a.connect(id);
    let mut w = a.writer(id);
    feed_sine(&mut w, 4, 512);

    let mut out = vec![0u8; a.bin_count()];
    a.byte_frequency_data(&mut out).unwrap();
    assert!(out[4] > 0);

    for _ in 0..200 {
        a.byte_frequency_data(&mut out).unwrap();
    }
    assert!(out.iter().all(|&v| v == 0), "bin 4 stuck at {}", out[4]);

    // Fresh samples bring it back.
    feed_sine(&mut w, 4, 512);
    a.byte_frequency_data(&mut out).unwrap();
    assert!(out[4] > 0);
}
