mod common;
use common::{hypnogram, sines, source};
use sleepbands::{
    epoch, epoch_events, epoch_length, events_from_annotations, sleep_edf_label_map, Annotation,
    AnnotationSet, Event,
};

#[test]
fn epoch_length_includes_end_point() {
    assert_eq!(epoch_length(30.0, 100.0), 3001);
    assert_eq!(epoch_length(5.0, 256.0), 1281);
    // Half-sample durations round to even: 1.5 → 2, 2.5 → 2.
    assert_eq!(epoch_length(0.5, 3.0), 3);
    assert_eq!(epoch_length(0.5, 5.0), 3);
}

#[test]
fn every_epoch_has_the_same_length() {
    let sig = source(sines(&[vec![(5.0, 1.0)], vec![(9.0, 1.0)]], 100.0, 100 * 200), 100.0);
    let anns = hypnogram(&["Sleep stage W", "Sleep stage 1", "Sleep stage 2", "Sleep stage R"]);
    let ep = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    assert_eq!(ep.len(), 4);
    assert_eq!(ep.data().dim(), (4, 2, 3001));
    assert!(ep.iter().all(|e| e.data.dim() == (2, 3001)));
    assert_eq!(ep.starts(), &[0, 3000, 6000, 9000]);
    assert_eq!(ep.codes(), &[1, 2, 3, 5]);
}

#[test]
fn epoch_samples_match_signal() {
    let data = sines(&[vec![(1.0, 1.0)]], 100.0, 10_000);
    let sig = source(data.clone(), 100.0);
    let anns: AnnotationSet = vec![Annotation::new(12.34, 30.0, "Sleep stage 2")].into_iter().collect();
    let ep = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    let first = ep.get(0).unwrap();
    assert_eq!(first.start_sample, 1234);
    assert_eq!(first.data[[0, 0]], data[[0, 1234]]);
    assert_eq!(first.data[[0, 3000]], data[[0, 4234]]);
}

#[test]
fn windows_past_the_end_are_dropped() {
    // 90 s of signal: the 60 s window needs sample 9000, the 90 s onset is past the end.
    let sig = source(sines(&[vec![(5.0, 1.0)]], 100.0, 9000), 100.0);
    let anns = hypnogram(&["Sleep stage W", "Sleep stage 2", "Sleep stage 2", "Sleep stage 3"]);
    let ep = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    assert_eq!(ep.len(), 2);
    assert_eq!(ep.epoch_len(), 3001);
}

#[test]
fn unknown_labels_give_empty_epochs() {
    let sig = source(sines(&[vec![(5.0, 1.0)]], 100.0, 10_000), 100.0);
    let anns = hypnogram(&["Sleep stage ?", "Movement time"]);
    let ep = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    assert!(ep.is_empty());
    assert_eq!(ep.data().dim(), (0, 1, 3001));
}

#[test]
fn deep_sleep_labels_merge_into_one_code() {
    let sig = source(sines(&[vec![(1.0, 1.0)]], 100.0, 100 * 200), 100.0);
    let anns = hypnogram(&["Sleep stage 3", "Sleep stage 4", "Sleep stage 4", "Sleep stage W"]);
    let ep = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    let counts = ep.counts_by_code();
    assert_eq!(counts[&4], 3);
    assert_eq!(counts[&1], 1);
}

#[test]
fn epoching_is_deterministic() {
    let sig = source(sines(&[vec![(3.0, 1.0)], vec![(7.0, 0.5)]], 100.0, 100 * 150), 100.0);
    let anns = hypnogram(&["Sleep stage W", "Sleep stage 2", "Sleep stage R"]);
    let a = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    let b = epoch(&sig, &anns, &sleep_edf_label_map(), 30.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn onsets_beyond_signal_are_skipped() {
    let anns: AnnotationSet = vec![
        Annotation::new(0.0, 30.0, "Sleep stage W"),
        Annotation::new(500.0, 30.0, "Sleep stage 2"),
    ]
    .into_iter()
    .collect();
    let events = events_from_annotations(&anns, 100.0, 10_000, &sleep_edf_label_map(), None);
    assert_eq!(events, vec![Event { sample: 0, code: 1 }]);
}

#[test]
fn chunked_annotations_yield_consecutive_epochs() {
    // One 90 s wake annotation becomes three 30 s events.
    let anns: AnnotationSet = vec![Annotation::new(0.0, 90.0, "Sleep stage W")].into_iter().collect();
    let events = events_from_annotations(&anns, 100.0, 20_000, &sleep_edf_label_map(), Some(30.0));
    let starts: Vec<usize> = events.iter().map(|e| e.sample).collect();
    assert_eq!(starts, vec![0, 3000, 6000]);

    let sig = source(sines(&[vec![(2.0, 1.0)]], 100.0, 20_000), 100.0);
    let ep = epoch_events(&sig, &events, 30.0).unwrap();
    assert_eq!(ep.len(), 3);
}
