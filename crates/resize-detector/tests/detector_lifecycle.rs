#![forbid(unsafe_code)]

//! Lifecycle tests for `ResizeDetector` driven by the headless host.
//!
//! Each test builds a container with a probe child, mounts a detector and
//! then steps the host by hand: deliver sizes, move the clock, flush frames.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use resize_detector::{
    Child, DetectorConfig, DetectorProps, ElementNode, FnComponent, HeadlessElement, HeadlessHost,
    Key, Node, ObservedSize, PROBE_KEY, PropValue, RENDER_KEY, RefreshMode, ResizeDetector,
    ResizeEntry, with_resize_detector,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type Calls = Rc<RefCell<Vec<(f64, f64)>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

struct Fixture {
    sim: HeadlessHost,
    container: HeadlessElement,
    probe: HeadlessElement,
    calls: Calls,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        let sim = HeadlessHost::new();
        let container = sim.create_element(None);
        let probe = sim.create_element(Some(container));
        Self {
            sim,
            container,
            probe,
            calls: Rc::default(),
        }
    }

    fn props(&self, config: DetectorConfig) -> DetectorProps {
        let calls = Rc::clone(&self.calls);
        DetectorProps::new(config).with_on_resize(move |w, h| calls.borrow_mut().push((w, h)))
    }

    fn mount(&self, props: DetectorProps) -> ResizeDetector<HeadlessElement> {
        let mut detector = ResizeDetector::new(Rc::new(props), self.sim.host());
        detector.attach_probe(Some(self.probe));
        detector.mount();
        detector
    }

    fn mount_with(&self, config: DetectorConfig) -> ResizeDetector<HeadlessElement> {
        self.mount(self.props(config))
    }

    fn resize(&self, width: f64, height: f64) {
        self.sim.resize(self.container, width, height);
    }

    fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.borrow().clone()
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn children(node: &Node) -> &[Node] {
    &node.as_element().expect("container element").children
}

// ---------------------------------------------------------------------------
// Notification semantics
// ---------------------------------------------------------------------------

#[test]
fn reports_first_size_after_frame() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());

    fx.resize(100.0, 50.0);
    assert!(fx.calls().is_empty());
    assert_eq!(detector.size(), ObservedSize::UNKNOWN);
    assert_eq!(fx.sim.pending_frames(), 1);

    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(100.0, 50.0)]);
    assert_eq!(detector.size(), ObservedSize::new(100.0, 50.0));
    assert_eq!(detector.version(), 1);
}

#[test]
fn identical_size_is_not_reported_again() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());

    fx.resize(100.0, 50.0);
    fx.sim.flush_frames();
    fx.resize(100.0, 50.0);

    assert_eq!(fx.sim.pending_frames(), 0);
    assert_eq!(fx.sim.flush_frames(), 0);
    assert_eq!(fx.calls().len(), 1);
    assert_eq!(detector.version(), 1);
}

#[test]
fn width_only_ignores_height_changes() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::default().with_handle_width(true));

    fx.resize(100.0, 50.0);
    fx.sim.flush_frames();
    fx.resize(100.0, 80.0);
    fx.sim.flush_frames();

    assert_eq!(fx.calls(), vec![(100.0, 50.0)]);
    assert_eq!(detector.size(), ObservedSize::new(100.0, 50.0));

    fx.resize(120.0, 80.0);
    fx.sim.flush_frames();
    assert_eq!(
        fx.calls(),
        vec![(100.0, 50.0), (120.0, 80.0)]
    );
}

#[test]
fn nothing_watched_never_reports() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::default());

    fx.resize(100.0, 50.0);
    fx.sim.flush_frames();

    assert!(fx.calls().is_empty());
    assert_eq!(detector.size(), ObservedSize::UNKNOWN);
}

#[test]
fn skip_on_mount_suppresses_first_notification() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both().with_skip_on_mount(true));
    assert!(detector.skips_next_notification());

    fx.resize(100.0, 50.0);
    assert_eq!(fx.sim.pending_frames(), 0);
    assert!(!detector.skips_next_notification());

    // The skipped size was never applied, so the same size now reports.
    fx.resize(100.0, 50.0);
    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(100.0, 50.0)]);
}

#[test]
fn skip_on_mount_skips_only_the_first_entry_of_the_first_batch() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both().with_skip_on_mount(true));

    fx.sim.deliver(&[
        ResizeEntry::new(fx.container, 10.0, 10.0),
        ResizeEntry::new(fx.container, 20.0, 20.0),
    ]);
    assert_eq!(fx.sim.pending_frames(), 1);
    assert!(!detector.skips_next_notification());

    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(20.0, 20.0)]);
    assert_eq!(detector.size(), ObservedSize::new(20.0, 20.0));
}

#[test]
fn unrepresentable_refresh_rate_waits_forever() {
    let fx = Fixture::new();
    fx.sim.advance(ms(5));
    let detector = fx.mount_with(
        DetectorConfig::both()
            .with_refresh_rate(Duration::MAX)
            .with_refresh_mode(Some(RefreshMode::Debounce)),
    );

    fx.resize(10.0, 10.0);
    assert_eq!(fx.sim.pending_timers(), 1);
    fx.sim.advance(ms(60_000));
    fx.sim.flush_frames();

    assert!(fx.calls().is_empty());
    assert!(detector.is_mounted());
}

#[test]
fn each_entry_of_a_batch_schedules_its_own_frame() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());

    fx.sim.deliver(&[
        ResizeEntry::new(fx.container, 10.0, 10.0),
        ResizeEntry::new(fx.container, 20.0, 20.0),
    ]);
    assert_eq!(fx.sim.pending_frames(), 2);

    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(10.0, 10.0), (20.0, 20.0)]);
    assert_eq!(detector.size(), ObservedSize::new(20.0, 20.0));
}

#[test]
fn subscribers_see_applied_sizes() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = detector.subscribe(move |size| sink.borrow_mut().push(*size));

    fx.resize(3.0, 4.0);
    fx.sim.flush_frames();

    assert_eq!(*seen.borrow(), vec![ObservedSize::new(3.0, 4.0)]);
}

#[test]
fn without_frame_scheduler_changes_are_dropped() {
    let fx = Fixture::new();
    let props = Rc::new(fx.props(DetectorConfig::both()));
    let mut detector = ResizeDetector::new(props, fx.sim.host().without_frames());
    detector.attach_probe(Some(fx.probe));
    detector.mount();

    fx.resize(100.0, 50.0);

    assert!(fx.sim.is_observed(fx.container));
    assert_eq!(fx.sim.pending_frames(), 0);
    assert!(fx.calls().is_empty());
    assert_eq!(detector.size(), ObservedSize::UNKNOWN);
    assert_eq!(detector.pending_frame(), None);
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[test]
fn debounce_collapses_a_burst_into_the_last_size() {
    let fx = Fixture::new();
    let detector = fx.mount_with(
        DetectorConfig::both()
            .with_refresh_mode(Some(RefreshMode::Debounce))
            .with_refresh_rate(ms(200)),
    );
    assert_eq!(detector.handler().mode(), Some(RefreshMode::Debounce));

    fx.resize(100.0, 50.0);
    fx.sim.advance(ms(50));
    fx.resize(110.0, 50.0);
    fx.sim.advance(ms(50));
    fx.resize(120.0, 60.0);

    fx.sim.advance(ms(199));
    assert_eq!(fx.sim.pending_frames(), 0);

    fx.sim.advance(ms(1));
    assert_eq!(fx.sim.flush_frames(), 1);
    assert_eq!(fx.calls(), vec![(120.0, 60.0)]);
}

#[test]
fn throttle_reports_leading_and_trailing_edges() {
    let fx = Fixture::new();
    let _detector = fx.mount_with(
        DetectorConfig::both()
            .with_refresh_mode(Some(RefreshMode::Throttle))
            .with_refresh_rate(ms(100)),
    );

    fx.resize(10.0, 10.0);
    fx.sim.flush_frames();
    fx.resize(20.0, 20.0);
    fx.resize(30.0, 30.0);
    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(10.0, 10.0)]);

    fx.sim.advance(ms(100));
    fx.sim.flush_frames();
    assert_eq!(
        fx.calls(),
        vec![(10.0, 10.0), (30.0, 30.0)]
    );
}

#[test]
fn refused_timer_delivers_immediately() {
    let fx = Fixture::new();
    fx.sim.refuse_timers(true);
    let _detector = fx.mount_with(
        DetectorConfig::both().with_refresh_mode(Some(RefreshMode::Debounce)),
    );

    fx.resize(7.0, 8.0);
    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(7.0, 8.0)]);
}

#[test]
fn refresh_mode_is_fixed_at_construction() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());
    detector.set_props(Rc::new(fx.props(
        DetectorConfig::both().with_refresh_mode(Some(RefreshMode::Throttle)),
    )));

    assert_eq!(detector.handler().mode(), None);
    fx.resize(1.0, 1.0);
    fx.resize(2.0, 2.0);
    fx.sim.flush_frames();
    assert_eq!(fx.calls().len(), 2);
}

// ---------------------------------------------------------------------------
// Target resolution
// ---------------------------------------------------------------------------

#[test]
fn observes_probe_parent_by_default() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());

    assert_eq!(detector.resolve_target(), Some(fx.container));
    assert!(fx.sim.is_observed(fx.container));
    assert!(!fx.sim.is_observed(fx.probe));
}

#[test]
fn observes_element_by_id() {
    let fx = Fixture::new();
    let panel = fx.sim.create_element_with_id(None, "panel");
    let _detector = fx.mount_with(DetectorConfig::both().with_resizable_element_id("panel"));

    assert!(fx.sim.is_observed(panel));
    assert!(!fx.sim.is_observed(fx.container));

    fx.resize(1.0, 1.0);
    fx.sim.resize(panel, 300.0, 200.0);
    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(300.0, 200.0)]);
}

#[test]
fn unresolved_id_falls_back_to_probe_parent() {
    let fx = Fixture::new();
    let _detector = fx.mount_with(DetectorConfig::both().with_resizable_element_id("missing"));
    assert!(fx.sim.is_observed(fx.container));
}

#[test]
fn mount_without_target_is_tolerated() {
    let fx = Fixture::new();
    let mut detector =
        ResizeDetector::new(Rc::new(fx.props(DetectorConfig::both())), fx.sim.host());
    detector.mount();

    assert!(detector.is_mounted());
    assert_eq!(fx.sim.observe_calls(), 0);
    detector.unmount();
    assert!(!detector.is_mounted());
}

#[test]
fn detached_probe_has_no_target() {
    let fx = Fixture::new();
    fx.sim.detach(fx.probe);
    let detector = fx.mount_with(DetectorConfig::both());
    assert_eq!(detector.resolve_target(), None);
    assert_eq!(fx.sim.observe_calls(), 0);
}

#[test]
fn mount_is_idempotent() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());
    detector.mount();
    assert_eq!(fx.sim.observe_calls(), 1);
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn unmount_before_frame_discards_change() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());

    fx.resize(100.0, 50.0);
    assert!(detector.pending_frame().is_some());
    detector.unmount();

    assert_eq!(fx.sim.flush_frames(), 0);
    assert!(fx.calls().is_empty());
    assert_eq!(detector.size(), ObservedSize::UNKNOWN);
    assert!(!fx.sim.is_observed(fx.container));
    assert_eq!(detector.pending_frame(), None);
}

#[test]
fn unmount_cancels_only_the_latest_frame() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());

    fx.resize(10.0, 10.0);
    fx.resize(20.0, 20.0);
    detector.unmount();

    fx.sim.flush_frames();
    assert_eq!(fx.calls(), vec![(10.0, 10.0)]);
}

#[test]
fn unmount_cancels_pending_debounce() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(
        DetectorConfig::both()
            .with_refresh_mode(Some(RefreshMode::Debounce))
            .with_refresh_rate(ms(200)),
    );

    fx.resize(100.0, 50.0);
    assert!(detector.handler().is_pending());
    detector.unmount();

    assert!(!detector.handler().is_pending());
    assert_eq!(fx.sim.pending_timers(), 0);
    fx.sim.advance(ms(1_000));
    assert_eq!(fx.sim.flush_frames(), 0);
    assert!(fx.calls().is_empty());
}

#[test]
fn drop_tears_down_like_unmount() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());

    fx.resize(100.0, 50.0);
    drop(detector);

    assert!(!fx.sim.is_observed(fx.container));
    assert_eq!(fx.sim.flush_frames(), 0);
    assert!(fx.calls().is_empty());
}

#[test]
fn frame_after_drop_is_a_no_op() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());

    // The older frame survives unmount; dropping the detector must still
    // keep it from reaching the consumer.
    fx.resize(10.0, 10.0);
    fx.resize(20.0, 20.0);
    detector.unmount();
    drop(detector);

    assert_eq!(fx.sim.flush_frames(), 1);
    assert!(fx.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn render_places_probe_first() {
    let fx = Fixture::new();
    let detector = fx.mount_with(DetectorConfig::both());

    let tree = detector.render();
    let nodes = children(&tree);
    let probe = nodes[0].as_element().expect("probe element");
    assert_eq!(probe.key, Some(Key::from(PROBE_KEY)));
    assert_eq!(
        probe.style_text(),
        "position: absolute; width: 0; height: 0; visibility: hidden; display: none;"
    );
    assert_eq!(nodes.len(), 1);
}

#[test]
fn render_function_and_children_share_the_size() {
    let fx = Fixture::new();
    let props = fx
        .props(DetectorConfig::both())
        .with_render(|size| {
            ElementNode::new("span")
                .with_prop("width", size.width)
                .into()
        })
        .with_child(Child::render(|w, h| {
            Node::text(format!("{}x{}", w.unwrap_or(0.0), h.unwrap_or(0.0)))
        }))
        .with_child(ElementNode::new("chart"));
    let detector = fx.mount(props);

    fx.resize(100.0, 50.0);
    fx.sim.flush_frames();
    let tree = detector.render();
    let nodes = children(&tree);

    assert_eq!(nodes.len(), 4);
    let rendered = nodes[1].as_element().expect("render output");
    assert_eq!(rendered.key, Some(Key::from(RENDER_KEY)));
    assert_eq!(rendered.prop("width"), Some(&PropValue::Number(100.0)));
    assert_eq!(nodes[2], Node::text("100x50"));
    let chart = nodes[3].as_element().expect("element child");
    assert_eq!(chart.key, Some(Key::Index(1)));
    assert_eq!(chart.prop("width"), Some(&PropValue::Number(100.0)));
    assert_eq!(chart.prop("height"), Some(&PropValue::Number(50.0)));
}

#[test]
fn render_before_measurement_passes_unknown() {
    let fx = Fixture::new();
    let detector = fx.mount(fx.props(DetectorConfig::both()).with_child(ElementNode::new("chart")));

    let tree = detector.render();
    let chart = children(&tree)[1].as_element().expect("element child");
    assert_eq!(chart.prop("width"), Some(&PropValue::Undefined));
    assert_eq!(chart.prop("height"), Some(&PropValue::Undefined));
}

#[test]
fn should_update_tracks_props_identity_and_size() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());
    let current = detector.props();

    // Never rendered.
    assert!(detector.should_update(&current));
    detector.render();
    assert!(!detector.should_update(&current));

    // Equal value, different allocation.
    let copy = Rc::new((*current).clone());
    assert!(detector.should_update(&copy));

    fx.resize(5.0, 5.0);
    fx.sim.flush_frames();
    assert!(detector.should_update(&current));
    detector.render();
    assert!(!detector.should_update(&current));

    detector.set_props(Rc::clone(&copy));
    assert!(!detector.should_update(&copy));
}

#[test]
fn set_props_swaps_the_callback() {
    let fx = Fixture::new();
    let mut detector = fx.mount_with(DetectorConfig::both());
    let replaced = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&replaced);
    detector.set_props(Rc::new(
        DetectorProps::new(DetectorConfig::both()).with_on_resize(move |w, _| {
            sink.borrow_mut().push(w);
        }),
    ));

    fx.resize(9.0, 9.0);
    fx.sim.flush_frames();
    assert!(fx.calls().is_empty());
    assert_eq!(*replaced.borrow(), vec![9.0]);
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

#[test]
fn wrapped_component_receives_size_props() {
    let fx = Fixture::new();
    let wrapped = with_resize_detector(
        FnComponent::new(|title: &String| {
            ElementNode::new("panel").with_prop("title", title.as_str())
        }),
        None,
    );
    let mut detector = wrapped.instantiate(&"cpu".to_string(), fx.sim.host());
    detector.attach_probe(Some(fx.probe));
    detector.mount();

    fx.resize(640.0, 480.0);
    fx.sim.flush_frames();
    let tree = detector.render();
    let panel = children(&tree)[1].as_element().expect("wrapped element");

    assert_eq!(panel.prop("title"), Some(&PropValue::from("cpu")));
    assert_eq!(panel.prop("width"), Some(&PropValue::Number(640.0)));
    assert_eq!(panel.prop("height"), Some(&PropValue::Number(480.0)));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn width_only_reports_exactly_width_changes(
        sizes in proptest::collection::vec((0u8..4, 0u8..4), 1..40)
    ) {
        let fx = Fixture::new();
        let detector = fx.mount_with(DetectorConfig::default().with_handle_width(true));

        let mut last_width = None;
        let mut expected = Vec::new();
        for &(w, h) in &sizes {
            let (w, h) = (f64::from(w), f64::from(h));
            if last_width != Some(w) {
                expected.push((w, h));
                last_width = Some(w);
            }
            fx.resize(w, h);
            fx.sim.flush_frames();
        }

        prop_assert_eq!(fx.calls(), expected);
        prop_assert_eq!(detector.size().width, last_width);
    }

    #[test]
    fn unmounted_detector_never_reports(
        sizes in proptest::collection::vec((1u16..500, 1u16..500), 1..20)
    ) {
        let fx = Fixture::new();
        let mut detector = fx.mount_with(DetectorConfig::both());
        for &(w, h) in &sizes {
            fx.resize(f64::from(w), f64::from(h));
        }
        detector.unmount();
        let before = fx.sim.pending_frames();
        fx.sim.flush_frames();
        prop_assert!(fx.calls().len() <= before);
        for &(w, h) in &sizes {
            fx.resize(f64::from(w), f64::from(h));
        }
        prop_assert_eq!(fx.sim.pending_frames(), 0);
    }
}
