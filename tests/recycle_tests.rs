mod common;

use common::{recycle_outlets, stream, ScriptedEngine, ScriptedUnits};

use flowsheet_env::rl::action_encoding::OperatingParams;
use flowsheet_env::rl::{Flowsheet, RewardWeights, UnitDispatcher, UnitRecord};
use flowsheet_env::{Action, FlowsheetConfig, FlowsheetEnv, FlowsheetError, Stage, Stream, UnitKind};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn recycle_loop_wires_into_the_mixer_and_resets_the_segment() {
    let mut env = FlowsheetEnv::new(
        FlowsheetConfig::default(),
        ScriptedEngine::default(),
        ScriptedUnits::new(recycle_outlets()),
    )
    .unwrap();
    let (_, feed) = env.reset().unwrap();

    let mut inlet = feed;
    for kind in [UnitKind::Mixer, UnitKind::Heater, UnitKind::Reactor, UnitKind::Cooler] {
        env.legal_action_mask(&inlet, false);
        inlet = env.step(&Action::midpoint(kind), &inlet).unwrap().outlet;
    }
    assert!(env.topology().mixer_in_segment);
    assert_eq!(env.topology().active_mixer.as_deref(), Some("M1"));

    // With a mixer upstream the flash must close the hydrogen loop.
    let mask = env.legal_action_mask(&inlet, false);
    assert_eq!(env.stage(), Stage::Flash);
    assert!(mask.allows(UnitKind::FlashRecycle));
    assert!(!mask.allows(UnitKind::Flash));
    let r = env.step(&Action::midpoint(UnitKind::FlashRecycle), &inlet).unwrap();
    assert_eq!(r.info.tag.as_deref(), Some("FR1"));
    // 108.5 recycled + 250 fed >= 3 * 100.
    assert!(approx(r.info.reward_components.unwrap().ratio_bonus, 0.5));

    // Purge column draws the methane overhead plus the midpoint offset.
    let mask = env.legal_action_mask(&r.outlet, false);
    assert!(mask.allows(UnitKind::PurgeColumn));
    let r = env.step(&Action::midpoint(UnitKind::PurgeColumn), &r.outlet).unwrap();
    match env.info_log().get("PDC1") {
        Some(UnitRecord::PurgeColumn { distillate_rate, .. }) => {
            assert!(approx(*distillate_rate, 15.0 + 2.5));
        }
        other => panic!("unexpected PDC1 record: {other:?}"),
    }
    assert!(env.metan_pure());

    // Main column in the mixer segment: only the recycle column remains.
    let mask = env.legal_action_mask(&r.outlet, false);
    assert_eq!(env.stage(), Stage::Distill);
    assert_eq!(mask.enabled().collect::<Vec<_>>(), vec![UnitKind::RecycleColumn]);
    let r = env.step(&Action::midpoint(UnitKind::RecycleColumn), &r.outlet).unwrap();
    assert_eq!(r.info.tag.as_deref(), Some("DCR2"));
    assert_eq!(r.outlet.name(), "DCR2_D");

    let connections = &env.engine().connections;
    assert_eq!(connections.len(), 2);
    assert_eq!(
        connections[0],
        ("M1".to_string(), "SF1_REC".to_string(), "F(IN)".to_string())
    );
    assert_eq!(connections[1].1, "S2_REC");

    // Loop closed: downstream segment starts without the mixer.
    assert!(!env.topology().mixer_in_segment);
    assert!(!env.topology().main_column_in_segment);
    assert!(env.topology().mixer_placed);
    assert!(env.topology().history.is_empty());

    // 86 / 92.5 is short of 0.95 purity.
    assert!(!env.bzn_pure());
    let mask = env.legal_action_mask(&r.outlet, false);
    assert!(mask.allows(UnitKind::Column));
    assert!(mask.allows(UnitKind::TriColumn));
    assert!(!mask.allows(UnitKind::RecycleColumn));
}

#[test]
fn recycle_without_a_mixer_fails_before_placing_anything() {
    let mut dispatcher = UnitDispatcher::new(ScriptedEngine::default(), ScriptedUnits::new(vec![]));
    let mut sheet = Flowsheet::default();
    let params = OperatingParams::from_normalized(&[0.5; 21]).unwrap();
    let inlet = stream("IN", 30.0, 34.5, [10.0, 160.0, 95.0, 90.0]);

    let err = dispatcher
        .dispatch(
            UnitKind::FlashRecycle,
            &params,
            &inlet,
            &mut sheet,
            &RewardWeights::default(),
        )
        .unwrap_err();
    match err {
        FlowsheetError::MissingRecycleTarget { tag } => assert_eq!(tag, "FR1"),
        other => panic!("unexpected error {other}"),
    }

    assert_eq!(dispatcher.counters().flash, 0);
    assert_eq!(dispatcher.engine().runs, 0);
    assert!(sheet.topology.history.is_empty());
    assert!(sheet.info.is_empty());
}
